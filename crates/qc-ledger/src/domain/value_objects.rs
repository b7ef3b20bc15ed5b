//! Value objects shared by entities and operations.

use super::asset::Asset;
use super::constants::{MAX_ACCOUNT_NAME_LENGTH, MIN_ACCOUNT_NAME_LENGTH};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Stable small-integer object identity, unique within one object kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// TIME
// =============================================================================

/// Seconds since the Unix epoch, at block-time resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp(pub u32);

impl Timestamp {
    pub const MIN: Timestamp = Timestamp(0);
    pub const MAX: Timestamp = Timestamp(u32::MAX);

    #[must_use]
    pub const fn from_secs(secs: u32) -> Self {
        Self(secs)
    }

    #[must_use]
    pub const fn secs(self) -> u32 {
        self.0
    }

    /// Adds seconds, saturating at [`Timestamp::MAX`].
    #[must_use]
    pub const fn plus(self, secs: u32) -> Self {
        Self(self.0.saturating_add(secs))
    }

    /// Seconds elapsed since `earlier`, zero if `earlier` is later.
    #[must_use]
    pub const fn since(self, earlier: Timestamp) -> u32 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

// =============================================================================
// ACCOUNT NAMES
// =============================================================================

/// Human-readable unique account key. The empty name means "no account",
/// which is how a proxy-to-self is encoded.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct AccountName(pub String);

impl AccountName {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The proxy-to-self marker.
    #[must_use]
    pub const fn none() -> Self {
        Self(String::new())
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase dotted segments of letters, digits and dashes, each
    /// segment starting with a letter.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let len = self.0.len();
        if !(MIN_ACCOUNT_NAME_LENGTH..=MAX_ACCOUNT_NAME_LENGTH).contains(&len) {
            return false;
        }
        self.0.split('.').all(|segment| {
            let bytes = segment.as_bytes();
            bytes.len() >= MIN_ACCOUNT_NAME_LENGTH
                && bytes[0].is_ascii_lowercase()
                && bytes[bytes.len() - 1] != b'-'
                && bytes
                    .iter()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
        })
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// =============================================================================
// VERSIONS
// =============================================================================

/// `(major, hardfork, release)` triple identifying the active rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ChainVersion {
    pub major: u8,
    pub hardfork: u8,
    pub release: u16,
}

impl ChainVersion {
    pub const GENESIS: ChainVersion = ChainVersion::new(0, 0, 0);

    #[must_use]
    pub const fn new(major: u8, hardfork: u8, release: u16) -> Self {
        Self {
            major,
            hardfork,
            release,
        }
    }

    /// Version at which hardfork `hardfork` of major line 0 activates.
    #[must_use]
    pub const fn hardfork(hardfork: u8) -> Self {
        Self::new(0, hardfork, 0)
    }
}

impl fmt::Display for ChainVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.hardfork, self.release)
    }
}

/// Half-open version interval `[start, end)`; `end = None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRange {
    pub start: ChainVersion,
    pub end: Option<ChainVersion>,
}

impl VersionRange {
    #[must_use]
    pub const fn new(start: ChainVersion, end: Option<ChainVersion>) -> Self {
        Self { start, end }
    }

    /// Every version from genesis on.
    #[must_use]
    pub const fn always() -> Self {
        Self::new(ChainVersion::GENESIS, None)
    }

    #[must_use]
    pub const fn from(start: ChainVersion) -> Self {
        Self::new(start, None)
    }

    #[must_use]
    pub const fn until(end: ChainVersion) -> Self {
        Self::new(ChainVersion::GENESIS, Some(end))
    }

    #[must_use]
    pub fn contains(&self, version: ChainVersion) -> bool {
        version >= self.start && self.end.map_or(true, |end| version < end)
    }

    #[must_use]
    pub fn overlaps(&self, other: &VersionRange) -> bool {
        let self_before_other = self.end.map_or(false, |end| end <= other.start);
        let other_before_self = other.end.map_or(false, |end| end <= self.start);
        !self_before_other && !other_before_self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end.map_or(false, |end| end <= self.start)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "[{}, {})", self.start, end),
            None => write!(f, "[{}, ..)", self.start),
        }
    }
}

// =============================================================================
// AUTHORITIES AND WITNESS PROPERTIES
// =============================================================================

/// Weighted multi-signature authority. Signature checks happen outside the
/// core; the core only stores and compares authorities.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Authority {
    pub weight_threshold: u32,
    pub account_auths: BTreeMap<AccountName, u16>,
    pub key_auths: BTreeMap<String, u16>,
}

impl Authority {
    /// Single-key authority with threshold 1.
    #[must_use]
    pub fn from_key(key: impl Into<String>) -> Self {
        let mut key_auths = BTreeMap::new();
        key_auths.insert(key.into(), 1);
        Self {
            weight_threshold: 1,
            account_auths: BTreeMap::new(),
            key_auths,
        }
    }

    /// Sum of all weights, the best any signer set can reach.
    #[must_use]
    pub fn total_weight(&self) -> u64 {
        self.account_auths
            .values()
            .chain(self.key_auths.values())
            .map(|w| u64::from(*w))
            .sum()
    }

    /// An authority nobody can satisfy is rejected.
    #[must_use]
    pub fn is_impossible(&self) -> bool {
        self.total_weight() < u64::from(self.weight_threshold)
    }
}

/// Chain parameters each witness votes on; the schedule keeps the median.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainProperties {
    pub account_creation_fee: Asset,
    pub maximum_block_size: u32,
    pub sbd_interest_rate: u16,
}

impl Default for ChainProperties {
    fn default() -> Self {
        Self {
            account_creation_fee: Asset::steem(1),
            maximum_block_size: 131_072,
            sbd_interest_rate: 10 * super::constants::PERCENT_1,
        }
    }
}
