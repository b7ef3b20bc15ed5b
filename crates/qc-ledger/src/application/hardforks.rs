//! One-off state migrations run when a hardfork activates.

use crate::domain::constants::FEED_HISTORY_WINDOW;
use crate::domain::hardfork::{self, Hardfork};
use crate::domain::{ChainError, ChainVersion, FeedHistory, InternalError};
use crate::policies::{RewardPolicy, WitnessPolicy};
use crate::state::ChainState;

/// Runs the migration attached to `hf`. The state must already report `hf`
/// as active.
pub fn apply_hardfork(state: &mut ChainState, hf: Hardfork) -> Result<(), ChainError> {
    match hf {
        hardfork::WITNESS_VOTE_LIMIT | hardfork::DIRECT_WITNESS_VOTE => {
            state.retally_witness_votes()?;
        }
        hardfork::SCHEDULE_TIME_CLAMP => state.reset_virtual_schedule_time()?,
        hardfork::CLEAR_VOTE_COUNT => state.retally_witness_vote_counts(false)?,
        hardfork::FORCE_VOTE_COUNT_RETALLY => state.retally_witness_vote_counts(true)?,
        hardfork::LIQUIDITY_MIN_VOLUME => state.retally_liquidity_weight()?,
        hardfork::SHORT_FEED_WINDOW => {
            state.db.modify_singleton::<FeedHistory, _>(|f| {
                let excess = f.price_history.len().saturating_sub(FEED_HISTORY_WINDOW);
                f.price_history.drain(..excess);
            })?;
        }
        hardfork::REWARD_FUNDS => state.create_reward_funds()?,
        _ => {}
    }
    tracing::info!(hardfork = hf, block_num = state.head_block_num()?, "hardfork applied");
    Ok(())
}

/// Moves the state to `target`, applying every hardfork in between in
/// order. The version never moves backwards.
pub fn advance_version(state: &mut ChainState, target: ChainVersion) -> Result<(), ChainError> {
    let current = state.version();
    if target < current {
        return Err(InternalError::VersionRegression {
            current,
            proposed: target,
        }
        .into());
    }

    for hf in current.hardfork.saturating_add(1)..=target.hardfork.min(hardfork::LATEST) {
        state.set_version(ChainVersion::hardfork(hf));
        apply_hardfork(state, hf)?;
    }
    state.set_version(target);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Asset, Price, RewardFund};
    use crate::policies::test_support::state;

    #[test]
    fn test_regression_is_fatal() {
        let mut state = state();
        state.set_version(ChainVersion::hardfork(5));
        let err = advance_version(&mut state, ChainVersion::hardfork(4)).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_reward_funds_created_once_at_activation() {
        let mut state = state();
        state
            .modify_props(|p| p.total_reward_fund_steem = Asset::steem(500))
            .unwrap();

        advance_version(&mut state, ChainVersion::hardfork(hardfork::REWARD_FUNDS)).unwrap();
        assert_eq!(state.db.count::<RewardFund>(), 2);
        assert_eq!(state.props().unwrap().total_reward_fund_steem, Asset::steem(0));

        advance_version(&mut state, ChainVersion::hardfork(hardfork::REWARD_FUNDS)).unwrap();
        assert_eq!(state.db.count::<RewardFund>(), 2);
    }

    #[test]
    fn test_feed_window_shrinks() {
        let mut state = state();
        let feed = Price::new(Asset::sbd(1), Asset::steem(1)).unwrap();
        state
            .db
            .modify_singleton::<FeedHistory, _>(|f| {
                f.price_history = std::iter::repeat(feed).take(FEED_HISTORY_WINDOW * 2).collect();
            })
            .unwrap();

        advance_version(&mut state, ChainVersion::hardfork(hardfork::SHORT_FEED_WINDOW)).unwrap();
        assert_eq!(
            state.feed_history().unwrap().price_history.len(),
            FEED_HISTORY_WINDOW
        );
        assert!(state.has_hardfork(hardfork::SHORT_FEED_WINDOW));
    }
}
