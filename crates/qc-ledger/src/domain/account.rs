//! Account objects and the records that hang off them: authorities, owner
//! history and recovery requests.

use super::asset::Asset;
use super::constants::MAX_PROXY_RECURSION_DEPTH;
use super::value_objects::{AccountName, Authority, ObjectId, Timestamp};
use crate::store::{object_identity, ChainObject, IndexKey, IndexSpec, KeyPart};
use serde::{Deserialize, Serialize};

// =============================================================================
// ACCOUNT
// =============================================================================

/// Balances, stake and voting state of one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: ObjectId,
    pub name: AccountName,
    pub memo_key: String,
    pub json_metadata: String,
    pub created: Timestamp,
    pub mined: bool,

    pub recovery_account: AccountName,
    pub last_account_recovery: Timestamp,
    pub owner_challenged: bool,
    pub active_challenged: bool,
    pub last_owner_update: Timestamp,
    pub last_account_update: Timestamp,

    pub balance: Asset,
    pub savings_balance: Asset,

    pub sbd_balance: Asset,
    /// Balance-seconds accumulated since the last interest payment.
    pub sbd_seconds: u128,
    pub sbd_seconds_last_update: Timestamp,
    pub sbd_last_interest_payment: Timestamp,

    pub savings_sbd_balance: Asset,
    pub savings_sbd_seconds: u128,
    pub savings_sbd_seconds_last_update: Timestamp,
    pub savings_sbd_last_interest_payment: Timestamp,
    pub savings_withdraw_requests: u8,

    pub vesting_shares: Asset,
    pub delegated_vesting_shares: Asset,
    pub received_vesting_shares: Asset,

    pub vesting_withdraw_rate: Asset,
    pub next_vesting_withdrawal: Timestamp,
    pub withdrawn: i64,
    pub to_withdraw: i64,
    pub withdraw_routes: u16,

    /// Vote weight received through proxies, indexed by hop count minus one.
    pub proxied_vsf_votes: [i64; MAX_PROXY_RECURSION_DEPTH],
    pub witnesses_voted_for: u16,
    /// Empty when the account votes for itself.
    pub proxy: AccountName,
    pub can_vote: bool,
}

impl Account {
    pub const BY_NAME: usize = 0;
    pub const BY_PROXY: usize = 1;
    pub const BY_NEXT_VESTING_WITHDRAWAL: usize = 2;

    /// A fresh account with zero balances, voting for itself.
    #[must_use]
    pub fn new(name: AccountName, created: Timestamp) -> Self {
        Self {
            id: ObjectId::default(),
            name,
            memo_key: String::new(),
            json_metadata: String::new(),
            created,
            mined: true,
            recovery_account: AccountName::none(),
            last_account_recovery: Timestamp::MIN,
            owner_challenged: false,
            active_challenged: false,
            last_owner_update: Timestamp::MIN,
            last_account_update: Timestamp::MIN,
            balance: Asset::steem(0),
            savings_balance: Asset::steem(0),
            sbd_balance: Asset::sbd(0),
            sbd_seconds: 0,
            sbd_seconds_last_update: created,
            sbd_last_interest_payment: created,
            savings_sbd_balance: Asset::sbd(0),
            savings_sbd_seconds: 0,
            savings_sbd_seconds_last_update: created,
            savings_sbd_last_interest_payment: created,
            savings_withdraw_requests: 0,
            vesting_shares: Asset::vests(0),
            delegated_vesting_shares: Asset::vests(0),
            received_vesting_shares: Asset::vests(0),
            vesting_withdraw_rate: Asset::vests(0),
            next_vesting_withdrawal: Timestamp::MAX,
            withdrawn: 0,
            to_withdraw: 0,
            withdraw_routes: 0,
            proxied_vsf_votes: [0; MAX_PROXY_RECURSION_DEPTH],
            witnesses_voted_for: 0,
            proxy: AccountName::none(),
            can_vote: true,
        }
    }

    #[must_use]
    pub fn proxied_vsf_votes_total(&self) -> i64 {
        self.proxied_vsf_votes.iter().sum()
    }

    /// Weight this account pushes into the witnesses it votes for.
    #[must_use]
    pub fn witness_vote_weight(&self) -> i64 {
        self.vesting_shares.amount + self.proxied_vsf_votes_total()
    }

    /// Shares this account may still delegate or power down.
    #[must_use]
    pub fn available_vesting_shares(&self) -> i64 {
        self.vesting_shares.amount
            - self.delegated_vesting_shares.amount
            - (self.to_withdraw - self.withdrawn)
    }

    #[must_use]
    pub fn effective_vesting_shares(&self) -> Asset {
        Asset::vests(
            self.vesting_shares.amount - self.delegated_vesting_shares.amount
                + self.received_vesting_shares.amount,
        )
    }
}

impl ChainObject for Account {
    const KIND: &'static str = "account";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::unique("by_name"),
        IndexSpec::ordered("by_proxy"),
        IndexSpec::ordered("by_next_vesting_withdrawal"),
    ];

    object_identity!();

    fn index_key(&self, index: usize) -> IndexKey {
        match index {
            Self::BY_NAME => vec![KeyPart::from(&self.name)],
            Self::BY_PROXY => vec![KeyPart::from(&self.proxy)],
            _ => vec![KeyPart::from(self.next_vesting_withdrawal)],
        }
    }
}

// =============================================================================
// AUTHORITIES AND RECOVERY
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountAuthority {
    pub id: ObjectId,
    pub account: AccountName,
    pub owner: Authority,
    pub active: Authority,
    pub posting: Authority,
    pub last_owner_update: Timestamp,
}

impl AccountAuthority {
    pub const BY_ACCOUNT: usize = 0;
}

impl ChainObject for AccountAuthority {
    const KIND: &'static str = "account_authority";
    const INDICES: &'static [IndexSpec] = &[IndexSpec::unique("by_account")];

    object_identity!();

    fn index_key(&self, _index: usize) -> IndexKey {
        vec![KeyPart::from(&self.account)]
    }
}

/// A previous owner authority, usable for recovery until it ages out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerAuthorityHistory {
    pub id: ObjectId,
    pub account: AccountName,
    pub previous_owner_authority: Authority,
    pub last_valid_time: Timestamp,
}

impl OwnerAuthorityHistory {
    pub const BY_ACCOUNT: usize = 0;
    pub const BY_LAST_VALID: usize = 1;
}

impl ChainObject for OwnerAuthorityHistory {
    const KIND: &'static str = "owner_authority_history";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::ordered("by_account"),
        IndexSpec::ordered("by_last_valid"),
    ];

    object_identity!();

    fn index_key(&self, index: usize) -> IndexKey {
        match index {
            Self::BY_ACCOUNT => vec![
                KeyPart::from(&self.account),
                KeyPart::from(self.last_valid_time),
            ],
            _ => vec![KeyPart::from(self.last_valid_time)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecoveryRequest {
    pub id: ObjectId,
    pub account_to_recover: AccountName,
    pub new_owner_authority: Authority,
    pub expires: Timestamp,
}

impl AccountRecoveryRequest {
    pub const BY_ACCOUNT: usize = 0;
    pub const BY_EXPIRATION: usize = 1;
}

impl ChainObject for AccountRecoveryRequest {
    const KIND: &'static str = "account_recovery_request";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::unique("by_account"),
        IndexSpec::ordered("by_expiration"),
    ];

    object_identity!();

    fn index_key(&self, index: usize) -> IndexKey {
        match index {
            Self::BY_ACCOUNT => vec![KeyPart::from(&self.account_to_recover)],
            _ => vec![KeyPart::from(self.expires)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecoveryAccountRequest {
    pub id: ObjectId,
    pub account_to_recover: AccountName,
    pub recovery_account: AccountName,
    pub effective_on: Timestamp,
}

impl ChangeRecoveryAccountRequest {
    pub const BY_ACCOUNT: usize = 0;
    pub const BY_EFFECTIVE_DATE: usize = 1;
}

impl ChainObject for ChangeRecoveryAccountRequest {
    const KIND: &'static str = "change_recovery_account_request";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::unique("by_account"),
        IndexSpec::ordered("by_effective_date"),
    ];

    object_identity!();

    fn index_key(&self, index: usize) -> IndexKey {
        match index {
            Self::BY_ACCOUNT => vec![KeyPart::from(&self.account_to_recover)],
            _ => vec![KeyPart::from(self.effective_on)],
        }
    }
}
