//! Error types for the state transition core.
//!
//! Three classes, matching how the caller must react:
//!
//! | Class | Type | Effect |
//! |-------|------|--------|
//! | Business rule | [`ValidationError`] | Transaction rolled back and rejected |
//! | Invariant | [`InternalError`] | Fatal, indicates a consensus bug |
//! | Plugin | [`ChainError::Interpreter`] | Fatal only while producing |

use super::asset::{Asset, AssetError};
use super::value_objects::{AccountName, ChainVersion, VersionRange};
use thiserror::Error;

/// Recoverable business-rule failure. Aborts only the current transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Account {account} has insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        account: AccountName,
        required: Asset,
        available: Asset,
    },

    #[error("Hardfork {required} is not active")]
    HardforkNotActive { required: u8 },

    #[error("Vote already exists for witness {witness}")]
    VoteAlreadyExists { witness: AccountName },

    #[error("Vote doesn't exist for witness {witness}")]
    VoteMissing { witness: AccountName },

    #[error("Account {account} has voted for too many witnesses ({limit})")]
    TooManyWitnessVotes { account: AccountName, limit: u16 },

    #[error("A proxy is currently set for {account}, clear it before voting")]
    ProxyIsSet { account: AccountName },

    #[error("This proxy would create a proxy loop through {account}")]
    ProxyLoop { account: AccountName },

    #[error("Proxy chain is too long: {length} > {max}")]
    ProxyChainTooLong { length: usize, max: usize },

    #[error("Account {account} has declined its voting rights")]
    VotingRightsDeclined { account: AccountName },

    #[error("Order {order_id} of {seller} was not filled")]
    OrderNotFilled { seller: AccountName, order_id: u32 },

    #[error("Invalid operation field {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },

    #[error("{0}")]
    Rule(String),
}

/// Fatal invariant violation. Must never be swallowed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternalError {
    #[error("Asset arithmetic failed: {0}")]
    Asset(#[from] AssetError),

    #[error("No evaluator registered for {operation} at version {version}")]
    NoEvaluator {
        operation: &'static str,
        version: ChainVersion,
    },

    #[error("Evaluator for {expected} received a different payload")]
    PayloadMismatch { expected: &'static str },

    #[error("Evaluator ranges for {operation} overlap: {first} and {second}")]
    OverlappingRanges {
        operation: &'static str,
        first: VersionRange,
        second: VersionRange,
    },

    #[error("Evaluator ranges for {operation} leave a gap between {before} and {after}")]
    RangeGap {
        operation: &'static str,
        before: VersionRange,
        after: VersionRange,
    },

    #[error("Evaluator ranges for {operation} leave versions uncovered {side} {range}")]
    UncoveredVersions {
        operation: &'static str,
        side: &'static str,
        range: VersionRange,
    },

    #[error("Proxy cycle reached while propagating votes through {account}")]
    ProxyCycle { account: AccountName },

    #[error("Index corruption in {kind}: {detail}")]
    IndexCorruption { kind: &'static str, detail: String },

    #[error("Invariant violated: {0}")]
    Invariant(String),

    #[error("No undo session is open")]
    NoUndoSession,

    #[error("Chain version went backwards from {current} to {proposed}")]
    VersionRegression {
        current: ChainVersion,
        proposed: ChainVersion,
    },
}

/// Top-level error returned by every fallible ledger call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    #[error("Uniqueness constraint {index} violated for {kind}")]
    UniqueViolation {
        kind: &'static str,
        index: &'static str,
    },

    #[error(transparent)]
    Internal(#[from] InternalError),

    #[error("Custom interpreter {id} failed: {message}")]
    Interpreter { id: String, message: String },
}

impl ChainError {
    /// Shorthand for a business-rule failure with a message.
    #[must_use]
    pub fn rule(message: impl Into<String>) -> Self {
        ChainError::Validation(ValidationError::Rule(message.into()))
    }

    #[must_use]
    pub fn not_found(kind: &'static str, key: impl ToString) -> Self {
        ChainError::NotFound {
            kind,
            key: key.to_string(),
        }
    }

    /// Internal errors indicate a bug; everything else is a rejected input.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, ChainError::Internal(_))
    }
}

impl From<AssetError> for ChainError {
    fn from(err: AssetError) -> Self {
        ChainError::Internal(InternalError::Asset(err))
    }
}

/// Returns a [`ValidationError::Rule`] failure unless `condition` holds.
pub fn ensure(condition: bool, message: impl Into<String>) -> Result<(), ChainError> {
    if condition {
        Ok(())
    } else {
        Err(ChainError::rule(message))
    }
}
