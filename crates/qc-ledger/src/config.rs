//! Ledger configuration from environment variables.

use crate::state::StateFlags;
use serde::{Deserialize, Serialize};
use std::env;

/// Runtime configuration for the ledger service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Log level filter (trace, debug, info, warn, error)
    pub log_level: String,

    /// Whether to emit JSON formatted logs
    pub json_logs: bool,

    /// Blocks kept reversible before the oldest is committed
    pub max_undo_depth: usize,

    /// Run the supply invariant checks after every block
    pub check_invariants: bool,

    /// Disable the market-cap floor on the median feed (test networks)
    pub skip_price_feed_limit_check: bool,

    /// Pay liquidity rewards (test networks may turn them off)
    pub liquidity_rewards_enabled: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            max_undo_depth: 1000,
            check_invariants: true,
            skip_price_feed_limit_check: false,
            liquidity_rewards_enabled: true,
        }
    }
}

fn flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(default)
}

impl LedgerConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `QC_LEDGER_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `QC_LEDGER_JSON_LOGS`: JSON logs (default: false)
    /// - `QC_LEDGER_MAX_UNDO_DEPTH`: Reversible blocks (default: 1000)
    /// - `QC_LEDGER_CHECK_INVARIANTS`: Per-block invariant checks (default: true)
    /// - `QC_LEDGER_SKIP_PRICE_FEED_LIMIT_CHECK`: (default: false)
    /// - `QC_LEDGER_LIQUIDITY_REWARDS`: (default: true)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            log_level: env::var("QC_LEDGER_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or(defaults.log_level),

            json_logs: flag("QC_LEDGER_JSON_LOGS", defaults.json_logs),

            max_undo_depth: env::var("QC_LEDGER_MAX_UNDO_DEPTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_undo_depth),

            check_invariants: flag("QC_LEDGER_CHECK_INVARIANTS", defaults.check_invariants),

            skip_price_feed_limit_check: flag(
                "QC_LEDGER_SKIP_PRICE_FEED_LIMIT_CHECK",
                defaults.skip_price_feed_limit_check,
            ),

            liquidity_rewards_enabled: flag(
                "QC_LEDGER_LIQUIDITY_REWARDS",
                defaults.liquidity_rewards_enabled,
            ),
        }
    }

    /// Switches handed to the chain state.
    #[must_use]
    pub fn state_flags(&self) -> StateFlags {
        StateFlags {
            skip_price_feed_limit_check: self.skip_price_feed_limit_check,
            liquidity_rewards_enabled: self.liquidity_rewards_enabled,
        }
    }
}
