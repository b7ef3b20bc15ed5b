//! Power-down routes and vesting delegations.

use super::asset::Asset;
use super::value_objects::{AccountName, ObjectId, Timestamp};
use crate::store::{object_identity, ChainObject, IndexKey, IndexSpec, KeyPart};
use serde::{Deserialize, Serialize};

/// Sends a share of each power-down payment to another account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawVestingRoute {
    pub id: ObjectId,
    pub from_account: AccountName,
    pub to_account: AccountName,
    pub percent: u16,
    /// Deposit as vesting shares instead of liquid STEEM.
    pub auto_vest: bool,
}

impl WithdrawVestingRoute {
    pub const BY_WITHDRAW_ROUTE: usize = 0;
    pub const BY_DESTINATION: usize = 1;

    #[must_use]
    pub fn route_key(from: &AccountName, to: &AccountName) -> IndexKey {
        vec![KeyPart::from(from), KeyPart::from(to)]
    }
}

impl ChainObject for WithdrawVestingRoute {
    const KIND: &'static str = "withdraw_vesting_route";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::unique("by_withdraw_route"),
        IndexSpec::ordered("by_destination"),
    ];

    object_identity!();

    fn index_key(&self, index: usize) -> IndexKey {
        match index {
            Self::BY_WITHDRAW_ROUTE => Self::route_key(&self.from_account, &self.to_account),
            _ => vec![KeyPart::from(&self.to_account)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingDelegation {
    pub id: ObjectId,
    pub delegator: AccountName,
    pub delegatee: AccountName,
    pub vesting_shares: Asset,
    /// The delegation cannot shrink before this time.
    pub min_delegation_time: Timestamp,
}

impl VestingDelegation {
    pub const BY_DELEGATION: usize = 0;

    #[must_use]
    pub fn delegation_key(delegator: &AccountName, delegatee: &AccountName) -> IndexKey {
        vec![KeyPart::from(delegator), KeyPart::from(delegatee)]
    }
}

impl ChainObject for VestingDelegation {
    const KIND: &'static str = "vesting_delegation";
    const INDICES: &'static [IndexSpec] = &[IndexSpec::unique("by_delegation")];

    object_identity!();

    fn index_key(&self, _index: usize) -> IndexKey {
        Self::delegation_key(&self.delegator, &self.delegatee)
    }
}

/// Shares removed from a delegation, returned to the delegator at
/// `expiration`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingDelegationExpiration {
    pub id: ObjectId,
    pub delegator: AccountName,
    pub vesting_shares: Asset,
    pub expiration: Timestamp,
}

impl VestingDelegationExpiration {
    pub const BY_EXPIRATION: usize = 0;
    pub const BY_ACCOUNT_EXPIRATION: usize = 1;
}

impl ChainObject for VestingDelegationExpiration {
    const KIND: &'static str = "vesting_delegation_expiration";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::ordered("by_expiration"),
        IndexSpec::ordered("by_account_expiration"),
    ];

    object_identity!();

    fn index_key(&self, index: usize) -> IndexKey {
        match index {
            Self::BY_EXPIRATION => vec![KeyPart::from(self.expiration)],
            _ => vec![KeyPart::from(&self.delegator), KeyPart::from(self.expiration)],
        }
    }
}
