//! Object and index-key contracts for the store.

use crate::domain::{AccountName, BookRate, ObjectId, Timestamp};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cmp::Reverse;
use std::fmt::Debug;

/// One component of a composite index key.
///
/// Within a single index every key has the same shape, so the derived
/// ordering (variant first, then value) is the intended ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyPart {
    Bool(bool),
    U32(u32),
    U64(u64),
    I64Desc(Reverse<i64>),
    U128(u128),
    U128Desc(Reverse<u128>),
    Time(Timestamp),
    Name(AccountName),
    Text(String),
    /// Best rate first; equal rates in any representation compare equal.
    PriceDesc(Reverse<BookRate>),
    Id(ObjectId),
}

/// Composite, lexicographically ordered index key.
pub type IndexKey = Vec<KeyPart>;

impl From<&AccountName> for KeyPart {
    fn from(name: &AccountName) -> Self {
        KeyPart::Name(name.clone())
    }
}

impl From<Timestamp> for KeyPart {
    fn from(time: Timestamp) -> Self {
        KeyPart::Time(time)
    }
}

impl From<u32> for KeyPart {
    fn from(value: u32) -> Self {
        KeyPart::U32(value)
    }
}

impl From<bool> for KeyPart {
    fn from(value: bool) -> Self {
        KeyPart::Bool(value)
    }
}

/// Declaration of one secondary index.
#[derive(Debug, Clone, Copy)]
pub struct IndexSpec {
    pub name: &'static str,
    /// Unique indices reject a second object with the same key. Non-unique
    /// keys get the object id appended so they stay distinct.
    pub unique: bool,
}

impl IndexSpec {
    #[must_use]
    pub const fn unique(name: &'static str) -> Self {
        Self { name, unique: true }
    }

    #[must_use]
    pub const fn ordered(name: &'static str) -> Self {
        Self {
            name,
            unique: false,
        }
    }
}

/// A typed object living in the store.
pub trait ChainObject: Clone + Debug + PartialEq + Serialize + DeserializeOwned + 'static {
    /// Object kind, used in errors and logs.
    const KIND: &'static str;

    /// Secondary indices, addressed by position.
    const INDICES: &'static [IndexSpec];

    fn id(&self) -> ObjectId;

    fn set_id(&mut self, id: ObjectId);

    /// Key of this object in secondary index `index`.
    fn index_key(&self, index: usize) -> IndexKey;
}

/// Implements `id`/`set_id` for objects storing their id in an `id` field.
macro_rules! object_identity {
    () => {
        fn id(&self) -> $crate::domain::ObjectId {
            self.id
        }

        fn set_id(&mut self, id: $crate::domain::ObjectId) {
            self.id = id;
        }
    };
}
pub(crate) use object_identity;
