//! Reward curves and inflation arithmetic.
//!
//! Claims are computed with 256-bit intermediates: `(r + s)^2` overflows
//! 128 bits for large reward shares. All division happens after all
//! multiplication.

use primitive_types::U256;

use crate::domain::constants::{
    BLOCKS_PER_YEAR, HOURS_PER_YEAR, INFLATION_NARROWING_PERIOD, INFLATION_RATE_START_PERCENT,
    INFLATION_RATE_STOP_PERCENT, MAX_WITNESSES, MIN_PAYOUT_SBD, PERCENT_100,
};
use crate::domain::{Asset, AssetError, ChainError, InternalError, Price, Symbol};

/// Inputs for one content payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardContext {
    pub rshares: i64,
    pub reward_weight: u16,
    pub max_sbd: Asset,
    pub total_reward_shares2: u128,
    pub total_reward_fund_steem: Asset,
    pub current_steem_price: Price,
    pub content_constant: u128,
}

/// `(rshares + s)^2 - s^2` for content constant `s`.
#[must_use]
pub fn calculate_claims(rshares: u128, content_constant: u128) -> U256 {
    let s = U256::from(content_constant);
    let r_plus_s = U256::from(rshares) + s;
    r_plus_s.saturating_mul(r_plus_s) - s * s
}

/// Vote weight on the claims curve: `(v << 64) / (2s + v)`, saturating at
/// `u64::MAX`.
#[must_use]
pub fn vote_weight(vote_rshares: u64, content_constant: u128) -> u64 {
    let numerator = U256::from(vote_rshares) << 64usize;
    let denominator = U256::from(content_constant) * U256::from(2u8) + U256::from(vote_rshares);
    if denominator.is_zero() {
        return 0;
    }
    let weight = numerator / denominator;
    if weight > U256::from(u64::MAX) {
        u64::MAX
    } else {
        weight.low_u64()
    }
}

/// STEEM value of an SBD amount at the feed price. Zero when no feed exists.
pub fn to_steem(price: &Price, sbd: Asset) -> Result<Asset, AssetError> {
    if price.is_null() {
        return Ok(Asset::zero(Symbol::Steem));
    }
    sbd.mul_price(price)
}

/// SBD value of a STEEM amount at the feed price. Zero when no feed exists.
pub fn to_sbd(price: &Price, steem: Asset) -> Result<Asset, AssetError> {
    if price.is_null() {
        return Ok(Asset::zero(Symbol::Sbd));
    }
    steem.mul_price(price)
}

/// Payouts worth less than the minimum SBD value are dropped.
pub fn is_payout_dust(price: &Price, steem_payout: i64) -> Result<bool, AssetError> {
    Ok(to_sbd(price, Asset::steem(steem_payout))?.amount < MIN_PAYOUT_SBD)
}

/// STEEM paid for `ctx.rshares` out of the reward fund.
pub fn get_rshare_reward(ctx: &RewardContext) -> Result<i64, ChainError> {
    if ctx.rshares <= 0 {
        return Err(InternalError::Invariant("reward requires positive rshares".into()).into());
    }
    if ctx.total_reward_shares2 == 0 {
        return Err(InternalError::Invariant("reward requires outstanding claims".into()).into());
    }

    let fund = U256::from(ctx.total_reward_fund_steem.amount.max(0) as u64);
    let claims = calculate_claims(ctx.rshares as u128, ctx.content_constant);
    let weighted = claims
        .checked_mul(U256::from(ctx.reward_weight))
        .ok_or(InternalError::Asset(AssetError::Overflow("weighted claims")))?
        / U256::from(PERCENT_100);

    let payout = fund
        .checked_mul(weighted)
        .ok_or(InternalError::Asset(AssetError::Overflow("reward payout")))?
        / U256::from(ctx.total_reward_shares2);
    if payout > U256::from(i64::MAX as u64) {
        return Err(InternalError::Invariant(format!("reward payout {payout} exceeds i64")).into());
    }

    let mut payout = payout.low_u64() as i64;
    if is_payout_dust(&ctx.current_steem_price, payout)? {
        payout = 0;
    }
    let max_steem = to_steem(&ctx.current_steem_price, ctx.max_sbd)?;
    Ok(payout.min(max_steem.amount))
}

// =============================================================================
// INFLATION
// =============================================================================

fn scaled(supply: i64, percent: u64, periods: u64) -> i64 {
    let value = i128::from(supply.max(0)) * i128::from(percent)
        / (i128::from(PERCENT_100) * i128::from(periods));
    value as i64
}

/// Per-block share of an annual percentage of `supply`.
#[must_use]
pub fn percent_reward_per_block(supply: i64, apr: u16) -> i64 {
    scaled(supply, u64::from(apr), BLOCKS_PER_YEAR)
}

/// Per-round share of an annual percentage of `supply`.
#[must_use]
pub fn percent_reward_per_round(supply: i64, apr: u16) -> i64 {
    scaled(supply, u64::from(apr), BLOCKS_PER_YEAR / MAX_WITNESSES as u64)
}

/// Per-hour share of an annual percentage of `supply`.
#[must_use]
pub fn percent_reward_per_hour(supply: i64, apr: u16) -> i64 {
    scaled(supply, u64::from(apr), HOURS_PER_YEAR)
}

/// Annual inflation in basis points, narrowing with block height.
#[must_use]
pub fn inflation_rate(head_block_num: u32) -> i64 {
    let narrowing = i64::from(head_block_num / INFLATION_NARROWING_PERIOD);
    (INFLATION_RATE_START_PERCENT - narrowing).max(INFLATION_RATE_STOP_PERCENT)
}

/// New STEEM minted per block at `rate` basis points of `virtual_supply`.
#[must_use]
pub fn new_steem_per_block(virtual_supply: i64, rate: i64) -> i64 {
    scaled(virtual_supply, rate.max(0) as u64, BLOCKS_PER_YEAR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::constants::CONTENT_CONSTANT;
    use proptest::prelude::*;

    fn feed() -> Price {
        // 1 SBD buys 2 STEEM.
        Price::new(Asset::sbd(1), Asset::steem(2)).unwrap()
    }

    #[test]
    fn test_claims_small_values() {
        assert_eq!(calculate_claims(0, 10), U256::zero());
        assert_eq!(calculate_claims(1, 10), U256::from(21u64));
        assert_eq!(calculate_claims(3, 0), U256::from(9u64));
    }

    #[test]
    fn test_claims_do_not_wrap() {
        let huge = calculate_claims(u64::MAX as u128, CONTENT_CONSTANT);
        assert!(huge > U256::from(u128::MAX / 4));
    }

    #[test]
    fn test_vote_weight() {
        assert_eq!(vote_weight(0, CONTENT_CONSTANT), 0);
        // With s = 0 the weight is capped.
        assert_eq!(vote_weight(1, 0), u64::MAX);
        assert!(vote_weight(1_000, CONTENT_CONSTANT) < vote_weight(2_000, CONTENT_CONSTANT));
    }

    #[test]
    fn test_rshare_reward_proportional() {
        let claims = calculate_claims(1_000_000, 0).as_u128();
        let ctx = RewardContext {
            rshares: 1_000_000,
            reward_weight: PERCENT_100,
            max_sbd: Asset::sbd(1_000_000_000),
            total_reward_shares2: claims * 4,
            total_reward_fund_steem: Asset::steem(400_000),
            current_steem_price: feed(),
            content_constant: 0,
        };
        assert_eq!(get_rshare_reward(&ctx).unwrap(), 100_000);

        let capped = RewardContext {
            max_sbd: Asset::sbd(1_000),
            ..ctx
        };
        assert_eq!(get_rshare_reward(&capped).unwrap(), 2_000);
    }

    #[test]
    fn test_rshare_reward_dust_and_preconditions() {
        let ctx = RewardContext {
            rshares: 10,
            reward_weight: PERCENT_100,
            max_sbd: Asset::sbd(1_000_000),
            total_reward_shares2: 100,
            total_reward_fund_steem: Asset::steem(30),
            current_steem_price: feed(),
            content_constant: 0,
        };
        // 30 STEEM is worth 15 SBD, below the dust threshold.
        assert_eq!(get_rshare_reward(&ctx).unwrap(), 0);

        let no_shares = RewardContext { rshares: 0, ..ctx };
        assert!(get_rshare_reward(&no_shares).unwrap_err().is_fatal());
        let no_claims = RewardContext {
            total_reward_shares2: 0,
            ..ctx
        };
        assert!(get_rshare_reward(&no_claims).unwrap_err().is_fatal());
    }

    #[test]
    fn test_inflation_rate_narrows_to_floor() {
        assert_eq!(inflation_rate(0), 978);
        assert_eq!(inflation_rate(INFLATION_NARROWING_PERIOD), 977);
        assert_eq!(inflation_rate(u32::MAX), 95);
    }

    #[test]
    fn test_percent_rewards() {
        let supply = 1_000_000_000_000;
        assert_eq!(
            percent_reward_per_block(supply, 1000),
            supply / 10 / BLOCKS_PER_YEAR as i64
        );
        assert_eq!(percent_reward_per_hour(supply, PERCENT_100), supply / HOURS_PER_YEAR as i64);
        assert!(percent_reward_per_round(supply, 1000) > percent_reward_per_block(supply, 1000));
    }

    proptest! {
        #[test]
        fn prop_claims_are_convex(r in 0u128..(1u128 << 60), d in 1u128..(1u128 << 40)) {
            let s = CONTENT_CONSTANT;
            let a = calculate_claims(r, s);
            let b = calculate_claims(r + d, s);
            let c = calculate_claims(r + 2 * d, s);
            prop_assert!(b > a);
            prop_assert!(c - b >= b - a);
        }
    }
}
