//! Domain layer for the state transition core.

pub mod account;
pub mod asset;
pub mod block;
pub mod constants;
pub mod errors;
pub mod globals;
pub mod hardfork;
pub mod invariants;
pub mod market;
pub mod operations;
pub mod transfers;
pub mod value_objects;
pub mod vesting;
pub mod witness;

pub use account::*;
pub use asset::*;
pub use block::*;
pub use errors::*;
pub use globals::*;
pub use market::*;
pub use operations::*;
pub use transfers::*;
pub use value_objects::*;
pub use vesting::*;
pub use witness::*;

#[cfg(test)]
pub(crate) mod test_support {
    use serde::de::DeserializeOwned;
    use serde::Serialize;
    use std::fmt::Debug;

    /// Asserts `value` survives both the binary and the JSON encoding.
    pub fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + Debug,
    {
        let bytes = bincode::serialize(value).unwrap();
        let decoded: T = bincode::deserialize(&bytes).unwrap();
        assert_eq!(&decoded, value, "bincode");

        let json = serde_json::to_string(value).unwrap();
        let decoded: T = serde_json::from_str(&json).unwrap();
        assert_eq!(&decoded, value, "json: {json}");
    }
}
