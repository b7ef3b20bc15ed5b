//! Fill computation for crossing limit orders.
//!
//! Execution always happens at the resting order's price. Exactly one side
//! is fully filled by a match; the other keeps its remainder.

use crate::domain::constants::{MIN_LIQUIDITY_REWARD_PERIOD_SEC, MIN_LIQUIDITY_REWARD_PERIOD_SEC_HF10};
use crate::domain::{Asset, AssetError, Price};

/// Amounts exchanged by one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fill {
    pub new_pays: Asset,
    pub new_receives: Asset,
    pub old_pays: Asset,
    pub old_receives: Asset,
}

/// Computes a match between a new order and a resting order.
///
/// `match_price` is the resting order's sell price: its base is what the
/// resting order sells, its quote what the new order sells.
pub fn compute_fill(
    new_for_sale: Asset,
    old_for_sale: Asset,
    match_price: &Price,
) -> Result<Fill, AssetError> {
    let old_in_new_terms = old_for_sale.mul_price(match_price)?;

    let (new_receives, old_receives) = if new_for_sale.amount <= old_in_new_terms.amount {
        (new_for_sale.mul_price(match_price)?, new_for_sale)
    } else {
        (old_for_sale, old_in_new_terms)
    };

    Ok(Fill {
        new_pays: old_receives,
        new_receives,
        old_pays: new_receives,
        old_receives,
    })
}

/// Whether a resting order is old enough to earn liquidity credit.
#[must_use]
pub fn liquidity_eligible(order_age: u32, longer_window: bool) -> bool {
    let required = if longer_window {
        MIN_LIQUIDITY_REWARD_PERIOD_SEC_HF10
    } else {
        MIN_LIQUIDITY_REWARD_PERIOD_SEC
    };
    order_age >= required
}
