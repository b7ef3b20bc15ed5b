//! SBD interest accrual.
//!
//! Interest accrues on balance-seconds: every second an SBD unit is held
//! adds one to the holder's accumulator. Interest is paid at most once per
//! compounding interval, multiplying before dividing so the result is the
//! exact floor of `balance_seconds * rate / (100% * seconds_per_year)`.

use crate::domain::constants::{PERCENT_100, SBD_INTEREST_COMPOUND_INTERVAL_SEC, SECONDS_PER_YEAR};
use crate::domain::{AssetError, Timestamp};

/// Adds `balance * elapsed` to a balance-seconds accumulator.
pub fn accrue_balance_seconds(
    balance_seconds: u128,
    balance: i64,
    elapsed: u32,
) -> Result<u128, AssetError> {
    let balance = balance.max(0) as u128;
    balance
        .checked_mul(u128::from(elapsed))
        .and_then(|added| balance_seconds.checked_add(added))
        .ok_or(AssetError::Overflow("sbd balance seconds"))
}

/// True once a full compounding interval has passed since the last payment.
#[must_use]
pub fn interest_payable(balance_seconds: u128, last_update: Timestamp, last_payment: Timestamp) -> bool {
    balance_seconds > 0 && last_update.since(last_payment) > SBD_INTEREST_COMPOUND_INTERVAL_SEC
}

/// Interest owed on an accumulator at an annual rate in basis points.
pub fn interest_due(balance_seconds: u128, rate: u16) -> Result<i64, AssetError> {
    let denominator = u128::from(PERCENT_100) * u128::from(SECONDS_PER_YEAR);
    let interest = balance_seconds
        .checked_mul(u128::from(rate))
        .ok_or(AssetError::Overflow("sbd interest"))?
        / denominator;
    i64::try_from(interest).map_err(|_| AssetError::Overflow("sbd interest"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_one_year_at_ten_percent() {
        let seconds = accrue_balance_seconds(0, 1_000_000, SECONDS_PER_YEAR as u32).unwrap();
        assert_eq!(interest_due(seconds, 1000).unwrap(), 100_000);
    }

    #[test]
    fn test_payable_requires_strictly_more_than_interval() {
        let paid = Timestamp::from_secs(1_000);
        let exact = paid.plus(SBD_INTEREST_COMPOUND_INTERVAL_SEC);
        assert!(!interest_payable(10, exact, paid));
        assert!(interest_payable(10, exact.plus(1), paid));
        assert!(!interest_payable(0, exact.plus(1), paid));
    }

    #[test]
    fn test_negative_balance_accrues_nothing() {
        assert_eq!(accrue_balance_seconds(7, -5, 100).unwrap(), 7);
    }

    #[test]
    fn test_overflow_is_reported() {
        assert!(accrue_balance_seconds(u128::MAX, 1, 1).is_err());
        assert!(interest_due(u128::MAX, 2).is_err());
    }

    proptest! {
        #[test]
        fn prop_interest_is_monotonic_in_time(
            balance in 0i64..1_000_000_000_000,
            first in 0u32..100_000_000,
            extra in 0u32..100_000_000,
            rate in 0u16..10_000,
        ) {
            let short = accrue_balance_seconds(0, balance, first).unwrap();
            let long = accrue_balance_seconds(0, balance, first + extra).unwrap();
            prop_assert!(interest_due(short, rate).unwrap() <= interest_due(long, rate).unwrap());
        }
    }
}
