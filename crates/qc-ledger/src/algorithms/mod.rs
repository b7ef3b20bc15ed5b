//! Pure consensus arithmetic.
//!
//! Nothing in this module touches the object store. Every function is a
//! deterministic mapping from integers to integers so that all nodes
//! compute identical results.

pub mod interest;
pub mod matching;
pub mod reward;
pub mod schedule;

pub use interest::{accrue_balance_seconds, interest_due, interest_payable};
pub use matching::{compute_fill, liquidity_eligible, Fill};
pub use reward::{
    calculate_claims, get_rshare_reward, inflation_rate, is_payout_dust, new_steem_per_block,
    percent_reward_per_block, percent_reward_per_hour, percent_reward_per_round, to_sbd, to_steem,
    vote_weight, RewardContext,
};
