//! Hardfork identifiers that gate rule changes.
//!
//! Each name describes the rule that switches on at that hardfork. Several
//! rules may share one hardfork number.

/// Hardfork number on major line 0.
pub type Hardfork = u8;

pub const WITNESS_URL_LIMIT: Hardfork = 1;
pub const POWER_DOWN_MIN_VESTS: Hardfork = 1;
pub const ACCOUNT_CREATION_FEE: Hardfork = 1;
pub const FREEZE_TEMP_ACCOUNT: Hardfork = 1;
pub const WITNESS_VOTE_LIMIT: Hardfork = 2;
pub const SCHEDULE_LAP_V2: Hardfork = 2;
pub const DIRECT_WITNESS_VOTE: Hardfork = 3;
pub const SCHEDULE_TIME_CLAMP: Hardfork = 4;
pub const REJECT_NOOP_WITHDRAW: Hardfork = 5;
pub const FULL_ORDER_ID: Hardfork = 6;
pub const CLEAR_VOTE_COUNT: Hardfork = 6;
pub const FORCE_VOTE_COUNT_RETALLY: Hardfork = 8;
pub const LIQUIDITY_MIN_VOLUME_CREATE: Hardfork = 9;
pub const LIQUIDITY_MIN_VOLUME: Hardfork = 10;
pub const LIQUIDITY_PERIOD_HF10: Hardfork = 10;
pub const CREATOR_IS_RECOVERY_PARTNER: Hardfork = 11;
pub const OWNER_UPDATE_THROTTLE: Hardfork = 11;
pub const NO_LIQUIDITY_REWARD: Hardfork = 12;
pub const RECOVERY_THROTTLE: Hardfork = 12;
pub const BURN_NULL_ACCOUNT: Hardfork = 14;
pub const FEED_MARKET_CAP_FLOOR: Hardfork = 14;
pub const DECLINE_VOTING_RIGHTS: Hardfork = 14;
pub const CUSTOM_BINARY: Hardfork = 14;
pub const WITNESS_FEE_SYMBOL: Hardfork = 14;
pub const VERIFY_AUTHORITY_ACCOUNTS: Hardfork = 15;
pub const NARROWING_INFLATION: Hardfork = 16;
pub const SHORT_CONVERSION_DELAY: Hardfork = 16;
pub const SHORT_FEED_WINDOW: Hardfork = 16;
pub const SHORT_POWER_DOWN: Hardfork = 16;
pub const ZERO_POWER_DOWN_UNMINED: Hardfork = 16;
pub const VESTING_DELEGATION: Hardfork = 17;
pub const REWARD_FUNDS: Hardfork = 17;
pub const ACCOUNT_CREATION_FEE_MULTIPLIER: Hardfork = 17;

/// Most recent hardfork this implementation knows.
pub const LATEST: Hardfork = 17;
