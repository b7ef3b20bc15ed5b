//! # Asset Amounts and Prices
//!
//! Integer amounts tagged with a symbol, and exchange rates between two
//! symbols. All cross-symbol arithmetic goes through [`Price`]; adding or
//! comparing amounts of different symbols is an error, never a silent
//! conversion.
//!
//! Products are computed in 128-bit space and checked against
//! [`MAX_SHARE_SUPPLY`] so that no intermediate can wrap.

use super::constants::MAX_SHARE_SUPPLY;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Errors raised by value-object arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetError {
    #[error("Symbol mismatch: {left} vs {right}")]
    SymbolMismatch { left: Symbol, right: Symbol },

    #[error("Arithmetic overflow: {0}")]
    Overflow(&'static str),

    #[error("Invalid price {base} / {quote}")]
    InvalidPrice { base: Asset, quote: Asset },
}

// =============================================================================
// SYMBOL
// =============================================================================

/// Currency symbol. Declaration order defines market ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Symbol {
    /// Liquid core currency.
    Steem,
    /// Stable-value debt currency.
    Sbd,
    /// Non-transferable stake.
    Vests,
}

impl Symbol {
    /// Number of implied decimal places.
    #[must_use]
    pub const fn precision(self) -> u8 {
        match self {
            Symbol::Steem | Symbol::Sbd => 3,
            Symbol::Vests => 6,
        }
    }

    #[must_use]
    pub const fn ticker(self) -> &'static str {
        match self {
            Symbol::Steem => "STEEM",
            Symbol::Sbd => "SBD",
            Symbol::Vests => "VESTS",
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ticker())
    }
}

// =============================================================================
// ASSET
// =============================================================================

/// An integer amount of a single symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    pub amount: i64,
    pub symbol: Symbol,
}

impl Asset {
    #[must_use]
    pub const fn new(amount: i64, symbol: Symbol) -> Self {
        Self { amount, symbol }
    }

    #[must_use]
    pub const fn steem(amount: i64) -> Self {
        Self::new(amount, Symbol::Steem)
    }

    #[must_use]
    pub const fn sbd(amount: i64) -> Self {
        Self::new(amount, Symbol::Sbd)
    }

    #[must_use]
    pub const fn vests(amount: i64) -> Self {
        Self::new(amount, Symbol::Vests)
    }

    #[must_use]
    pub const fn zero(symbol: Symbol) -> Self {
        Self::new(0, symbol)
    }

    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.amount == 0
    }

    fn same_symbol(&self, other: &Asset) -> Result<(), AssetError> {
        if self.symbol != other.symbol {
            return Err(AssetError::SymbolMismatch {
                left: self.symbol,
                right: other.symbol,
            });
        }
        Ok(())
    }

    /// Adds two amounts of the same symbol.
    pub fn checked_add(&self, other: &Asset) -> Result<Asset, AssetError> {
        self.same_symbol(other)?;
        let amount = add_amount(self.amount, other.amount)?;
        Ok(Asset::new(amount, self.symbol))
    }

    /// Subtracts two amounts of the same symbol.
    pub fn checked_sub(&self, other: &Asset) -> Result<Asset, AssetError> {
        self.same_symbol(other)?;
        let amount = sub_amount(self.amount, other.amount)?;
        Ok(Asset::new(amount, self.symbol))
    }

    /// Compares two amounts of the same symbol.
    pub fn checked_cmp(&self, other: &Asset) -> Result<Ordering, AssetError> {
        self.same_symbol(other)?;
        Ok(self.amount.cmp(&other.amount))
    }

    /// Converts this amount through `price`.
    ///
    /// If the amount is denominated in the price's base, the result is in
    /// its quote, and vice versa. The division happens after the
    /// multiplication and truncates toward zero.
    pub fn mul_price(&self, price: &Price) -> Result<Asset, AssetError> {
        let (numerator, denominator, symbol) = if self.symbol == price.base.symbol {
            (price.quote.amount, price.base.amount, price.quote.symbol)
        } else if self.symbol == price.quote.symbol {
            (price.base.amount, price.quote.amount, price.base.symbol)
        } else {
            return Err(AssetError::SymbolMismatch {
                left: self.symbol,
                right: price.base.symbol,
            });
        };

        if denominator == 0 {
            return Err(AssetError::InvalidPrice {
                base: price.base,
                quote: price.quote,
            });
        }

        let result = i128::from(self.amount) * i128::from(numerator) / i128::from(denominator);
        if result.unsigned_abs() > MAX_SHARE_SUPPLY as u128 {
            return Err(AssetError::Overflow("asset * price exceeds share supply"));
        }
        Ok(Asset::new(result as i64, symbol))
    }
}

impl std::ops::Neg for Asset {
    type Output = Asset;

    fn neg(self) -> Asset {
        Asset::new(-self.amount, self.symbol)
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.symbol)
    }
}

/// Overflow-checked share addition.
pub fn add_amount(a: i64, b: i64) -> Result<i64, AssetError> {
    a.checked_add(b)
        .ok_or(AssetError::Overflow("share addition"))
}

/// Overflow-checked share subtraction.
pub fn sub_amount(a: i64, b: i64) -> Result<i64, AssetError> {
    a.checked_sub(b)
        .ok_or(AssetError::Overflow("share subtraction"))
}

// =============================================================================
// PRICE
// =============================================================================

/// Exchange rate expressed as `base / quote`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Price {
    pub base: Asset,
    pub quote: Asset,
}

impl Price {
    /// Creates a price, rejecting same-symbol or non-positive legs.
    pub fn new(base: Asset, quote: Asset) -> Result<Self, AssetError> {
        let price = Self { base, quote };
        price.validate()?;
        Ok(price)
    }

    /// The unset feed price.
    #[must_use]
    pub const fn null() -> Self {
        Self {
            base: Asset::zero(Symbol::Sbd),
            quote: Asset::zero(Symbol::Steem),
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.base.amount == 0 || self.quote.amount == 0
    }

    pub fn validate(&self) -> Result<(), AssetError> {
        if self.base.symbol == self.quote.symbol || self.base.amount <= 0 || self.quote.amount <= 0
        {
            return Err(AssetError::InvalidPrice {
                base: self.base,
                quote: self.quote,
            });
        }
        Ok(())
    }

    /// Highest representable price for a market.
    #[must_use]
    pub const fn max(base: Symbol, quote: Symbol) -> Self {
        Self {
            base: Asset::new(MAX_SHARE_SUPPLY, base),
            quote: Asset::new(1, quote),
        }
    }

    /// Lowest representable price for a market.
    #[must_use]
    pub const fn min(base: Symbol, quote: Symbol) -> Self {
        Self {
            base: Asset::new(1, base),
            quote: Asset::new(MAX_SHARE_SUPPLY, quote),
        }
    }

    /// The same rate seen from the other side of the market.
    #[must_use]
    pub const fn invert(&self) -> Self {
        Self {
            base: self.quote,
            quote: self.base,
        }
    }

    /// Returns `(lower, higher)` symbols of this price's market.
    #[must_use]
    pub fn market(&self) -> (Symbol, Symbol) {
        if self.base.symbol <= self.quote.symbol {
            (self.base.symbol, self.quote.symbol)
        } else {
            (self.quote.symbol, self.base.symbol)
        }
    }

    fn ratio_cmp(&self, other: &Price) -> Ordering {
        let left = i128::from(self.base.amount) * i128::from(other.quote.amount);
        let right = i128::from(other.base.amount) * i128::from(self.quote.amount);
        left.cmp(&right)
    }
}

impl Default for Price {
    fn default() -> Self {
        Self::null()
    }
}

impl std::ops::Not for Price {
    type Output = Price;

    fn not(self) -> Price {
        self.invert()
    }
}

impl PartialOrd for Price {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Orders by market first, then by the `base / quote` ratio. Equal ratios
/// with different representations are tie-broken on the raw amounts so the
/// order stays total.
impl Ord for Price {
    fn cmp(&self, other: &Self) -> Ordering {
        self.base
            .symbol
            .cmp(&other.base.symbol)
            .then(self.quote.symbol.cmp(&other.quote.symbol))
            .then_with(|| self.ratio_cmp(other))
            .then(self.base.amount.cmp(&other.base.amount))
            .then(self.quote.amount.cmp(&other.quote.amount))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.base, self.quote)
    }
}

/// Returns true when `a` and `b` denote the same rate.
#[must_use]
pub fn same_rate(a: &Price, b: &Price) -> bool {
    a.base.symbol == b.base.symbol && a.quote.symbol == b.quote.symbol && a.ratio_cmp(b).is_eq()
}

/// A price compared by market and rate only, so `2 / 1` and `100 / 50`
/// are equal. Book keys use it to leave same-rate ties to the object id.
#[derive(Debug, Clone, Copy)]
pub struct BookRate(pub Price);

impl PartialEq for BookRate {
    fn eq(&self, other: &Self) -> bool {
        same_rate(&self.0, &other.0)
    }
}

impl Eq for BookRate {}

impl PartialOrd for BookRate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BookRate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .base
            .symbol
            .cmp(&other.0.base.symbol)
            .then(self.0.quote.symbol.cmp(&other.0.quote.symbol))
            .then_with(|| self.0.ratio_cmp(&other.0))
    }
}

impl std::hash::Hash for BookRate {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.base.symbol.hash(state);
        self.0.quote.symbol.hash(state);
    }
}
