//! Protocol constants.
//!
//! These values are consensus-critical. Changing any of them forks the chain.

/// Largest amount any single asset may reach.
pub const MAX_SHARE_SUPPLY: i64 = 1_000_000_000_000_000;

/// Basis-point denominator.
pub const PERCENT_100: u16 = 10_000;
pub const PERCENT_1: u16 = PERCENT_100 / 100;

// =============================================================================
// TIME
// =============================================================================

pub const BLOCK_INTERVAL: u32 = 3;
pub const SECONDS_PER_DAY: u32 = 24 * 60 * 60;
pub const SECONDS_PER_YEAR: u64 = 365 * 24 * 60 * 60;
pub const BLOCKS_PER_DAY: u32 = SECONDS_PER_DAY / BLOCK_INTERVAL;
pub const BLOCKS_PER_YEAR: u64 = SECONDS_PER_YEAR / BLOCK_INTERVAL as u64;
pub const HOURS_PER_YEAR: u64 = 365 * 24;

/// Vesting fund boosts are disabled before this block.
pub const START_VESTING_BLOCK: u32 = BLOCKS_PER_DAY * 7;

// =============================================================================
// ACCOUNTS
// =============================================================================

/// Account that burns anything sent to it.
pub const NULL_ACCOUNT: &str = "null";

/// Default recovery account for new accounts.
pub const INIT_MINER_NAME: &str = "initminer";

/// Shared throwaway account; frozen from the first hardfork.
pub const TEMP_ACCOUNT: &str = "temp";

/// Multiple of the median creation fee paid when creating with STEEM alone.
pub const CREATE_ACCOUNT_WITH_STEEM_MODIFIER: i64 = 30;

pub const MIN_ACCOUNT_NAME_LENGTH: usize = 3;
pub const MAX_ACCOUNT_NAME_LENGTH: usize = 16;

/// Owner authority changes are remembered this long for recovery.
pub const OWNER_AUTH_RECOVERY_PERIOD: u32 = 30 * SECONDS_PER_DAY;
pub const ACCOUNT_RECOVERY_REQUEST_EXPIRATION_PERIOD: u32 = SECONDS_PER_DAY;
pub const OWNER_UPDATE_LIMIT: u32 = 60 * 60;
pub const OWNER_AUTH_HISTORY_TRACKING_START_BLOCK_NUM: u32 = 1;

pub const MAX_MEMO_SIZE: usize = 2048;
pub const MAX_CUSTOM_ID_LENGTH: usize = 32;
pub const MIN_BLOCK_SIZE_LIMIT: u32 = 65_536;

// =============================================================================
// SBD AND SAVINGS
// =============================================================================

pub const SBD_INTEREST_COMPOUND_INTERVAL_SEC: u32 = 30 * SECONDS_PER_DAY;
pub const SAVINGS_WITHDRAW_TIME: u32 = 3 * SECONDS_PER_DAY;
pub const SAVINGS_WITHDRAW_REQUEST_LIMIT: u8 = 100;

pub const CONVERSION_DELAY: u32 = SECONDS_PER_DAY * 7 / 2;
pub const CONVERSION_DELAY_PRE_HF16: u32 = 7 * SECONDS_PER_DAY;

/// Payouts worth less than this in SBD are dropped.
pub const MIN_PAYOUT_SBD: i64 = 20;

// =============================================================================
// VESTING
// =============================================================================

pub const VESTING_WITHDRAW_INTERVALS: i64 = 13;
pub const VESTING_WITHDRAW_INTERVALS_PRE_HF16: i64 = 104;
pub const VESTING_WITHDRAW_INTERVAL_SECONDS: u32 = 7 * SECONDS_PER_DAY;
pub const MAX_WITHDRAW_ROUTES: u16 = 10;

/// Delegated shares return to the delegator after this cooldown.
pub const CASHOUT_WINDOW_SECONDS: u32 = 7 * SECONDS_PER_DAY;

// =============================================================================
// WITNESSES
// =============================================================================

pub const MAX_WITNESSES: usize = 21;
pub const MAX_VOTED_WITNESSES: usize = 19;
pub const MAX_ACCOUNT_WITNESS_VOTES: u16 = 30;
pub const MAX_PROXY_RECURSION_DEPTH: usize = 4;
pub const MAX_WITNESS_URL_LENGTH: usize = 2048;

pub const FEED_INTERVAL_BLOCKS: u32 = 1200;
pub const FEED_HISTORY_WINDOW: usize = 84;
pub const FEED_HISTORY_WINDOW_PRE_HF16: usize = 168;
pub const MAX_FEED_AGE: u32 = 7 * SECONDS_PER_DAY;
pub const MIN_FEEDS: usize = MAX_WITNESSES / 3;

/// Voting rights are removed this long after a decline request.
pub const DECLINE_VOTING_RIGHTS_DELAY: u32 = OWNER_AUTH_RECOVERY_PERIOD;

pub const VIRTUAL_SCHEDULE_LAP_LENGTH: u128 = u64::MAX as u128;
pub const VIRTUAL_SCHEDULE_LAP_LENGTH2: u128 = u128::MAX;

// =============================================================================
// INFLATION AND REWARDS
// =============================================================================

pub const INFLATION_RATE_START_PERCENT: i64 = 978;
pub const INFLATION_RATE_STOP_PERCENT: i64 = 95;
pub const INFLATION_NARROWING_PERIOD: u32 = 250_000;
pub const CONTENT_REWARD_PERCENT: i64 = 75 * PERCENT_1 as i64;
pub const VESTING_FUND_PERCENT: i64 = 15 * PERCENT_1 as i64;

pub const CONTENT_APR_PERCENT: u16 = 3875;
pub const CURATE_APR_PERCENT: u16 = 968;
pub const PRODUCER_APR_PERCENT: u16 = 750;
pub const LIQUIDITY_APR_PERCENT: u16 = 750;

/// Flat per-block rewards paid while the vesting fund is bootstrapping.
pub const BOOTSTRAP_CONTENT_REWARD: i64 = 255;
pub const BOOTSTRAP_CURATE_REWARD: i64 = 85;

pub const MIN_CONTENT_REWARD: i64 = 1500;
pub const MIN_CURATE_REWARD: i64 = 500;
pub const MIN_PRODUCER_REWARD: i64 = 1000;

pub const LIQUIDITY_TIMEOUT_SEC: u32 = 7 * SECONDS_PER_DAY;
pub const MIN_LIQUIDITY_REWARD_PERIOD_SEC: u32 = 60;
pub const MIN_LIQUIDITY_REWARD_PERIOD_SEC_HF10: u32 = 30 * 60;
pub const LIQUIDITY_REWARD_BLOCKS: u32 = 1200;
pub const MIN_LIQUIDITY_REWARD: i64 = 1000 * LIQUIDITY_REWARD_BLOCKS as i64;

/// Content curve constant `s` for the default reward curve.
pub const CONTENT_CONSTANT: u128 = 2_000_000_000_000;

pub const POST_REWARD_FUND_NAME: &str = "post";
pub const COMMENT_REWARD_FUND_NAME: &str = "comment";
pub const POST_REWARD_FUND_PERCENT: u16 = 90 * PERCENT_1;
pub const COMMENT_REWARD_FUND_PERCENT: u16 = 10 * PERCENT_1;

/// SBD printing slows once SBD is this share of the virtual supply.
pub const SBD_START_PERCENT: u16 = 2 * PERCENT_1;
/// SBD printing stops at this share of the virtual supply.
pub const SBD_STOP_PERCENT: u16 = 5 * PERCENT_1;

/// Order ids were truncated to 16 bits before full ids were enabled.
pub const LEGACY_ORDER_ID_MASK: u32 = 0xFFFF;
