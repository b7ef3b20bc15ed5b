//! # Policies
//!
//! Stateful rules shared by evaluators and block maintenance. Each policy is
//! a capability trait implemented for [`ChainState`](crate::state::ChainState):
//!
//! | Trait | Concern |
//! |-------|---------|
//! | [`AccountPolicy`] | balances, interest, funds, savings, recovery sweeps |
//! | [`AssetPolicy`] | supply accounting, SBD printing, conversions, median feed |
//! | [`OrderPolicy`] | limit order matching, fills and cancellation |
//! | [`RewardPolicy`] | reward funds and liquidity rewards |
//! | [`WithdrawalPolicy`] | scheduled vesting power-downs |
//! | [`WitnessPolicy`] | vote propagation, vesting, scheduling |
//!
//! Policies call each other through the traits, never through a shared
//! base type.

pub mod account;
pub mod asset;
pub mod order;
pub mod reward;
pub mod withdrawal;
pub mod witness;

pub use account::AccountPolicy;
pub use asset::AssetPolicy;
pub use order::OrderPolicy;
pub use reward::RewardPolicy;
pub use withdrawal::WithdrawalPolicy;
pub use witness::WitnessPolicy;

use crate::domain::{Asset, AssetError};
use crate::store::{Database, Stored};

/// `*target += delta`, checked.
pub(crate) fn add_to(target: &mut Asset, delta: Asset) -> Result<(), AssetError> {
    *target = target.checked_add(&delta)?;
    Ok(())
}

/// `*target -= delta`, checked.
pub(crate) fn sub_from(target: &mut Asset, delta: Asset) -> Result<(), AssetError> {
    *target = target.checked_sub(&delta)?;
    Ok(())
}

/// Leading objects of `index` for which `is_due` holds, copied out so the
/// caller can mutate the store while processing them.
pub(crate) fn due<T, F>(db: &Database, index: usize, is_due: F) -> Vec<T>
where
    T: Stored,
    F: Fn(&T) -> bool,
{
    db.iter::<T>(index)
        .take_while(|object| is_due(object))
        .cloned()
        .collect()
}
