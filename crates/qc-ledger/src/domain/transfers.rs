//! Funds held in transit: escrows and delayed savings withdrawals.

use super::asset::Asset;
use super::value_objects::{AccountName, ObjectId, Timestamp};
use crate::store::{object_identity, ChainObject, IndexKey, IndexSpec, KeyPart};
use serde::{Deserialize, Serialize};

/// Tri-party escrow. Removed once both balances are released.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escrow {
    pub id: ObjectId,
    pub escrow_id: u32,
    pub from: AccountName,
    pub to: AccountName,
    pub agent: AccountName,
    pub ratification_deadline: Timestamp,
    pub escrow_expiration: Timestamp,
    pub sbd_balance: Asset,
    pub steem_balance: Asset,
    pub pending_fee: Asset,
    pub to_approved: bool,
    pub agent_approved: bool,
    pub disputed: bool,
}

impl Escrow {
    pub const BY_FROM_ID: usize = 0;
    pub const BY_RATIFICATION_DEADLINE: usize = 1;

    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.to_approved && self.agent_approved
    }

    #[must_use]
    pub fn from_key(from: &AccountName, escrow_id: u32) -> IndexKey {
        vec![KeyPart::from(from), KeyPart::U32(escrow_id)]
    }
}

impl ChainObject for Escrow {
    const KIND: &'static str = "escrow";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::unique("by_from_id"),
        IndexSpec::ordered("by_ratification_deadline"),
    ];

    object_identity!();

    fn index_key(&self, index: usize) -> IndexKey {
        match index {
            Self::BY_FROM_ID => Self::from_key(&self.from, self.escrow_id),
            _ => vec![
                KeyPart::from(self.is_approved()),
                KeyPart::from(self.ratification_deadline),
            ],
        }
    }
}

/// Savings withdrawal waiting out its delay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavingsWithdraw {
    pub id: ObjectId,
    pub from: AccountName,
    pub to: AccountName,
    pub memo: String,
    pub request_id: u32,
    pub amount: Asset,
    pub complete: Timestamp,
}

impl SavingsWithdraw {
    pub const BY_FROM_RID: usize = 0;
    pub const BY_COMPLETE_FROM_RID: usize = 1;
    pub const BY_TO_COMPLETE: usize = 2;

    #[must_use]
    pub fn from_key(from: &AccountName, request_id: u32) -> IndexKey {
        vec![KeyPart::from(from), KeyPart::U32(request_id)]
    }
}

impl ChainObject for SavingsWithdraw {
    const KIND: &'static str = "savings_withdraw";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::unique("by_from_rid"),
        IndexSpec::unique("by_complete_from_rid"),
        IndexSpec::ordered("by_to_complete"),
    ];

    object_identity!();

    fn index_key(&self, index: usize) -> IndexKey {
        match index {
            Self::BY_FROM_RID => Self::from_key(&self.from, self.request_id),
            Self::BY_COMPLETE_FROM_RID => vec![
                KeyPart::from(self.complete),
                KeyPart::from(&self.from),
                KeyPart::U32(self.request_id),
            ],
            _ => vec![KeyPart::from(&self.to), KeyPart::from(self.complete)],
        }
    }
}
