//! Block producers, the votes that rank them and the production schedule.

use super::asset::Price;
use super::value_objects::{AccountName, ChainProperties, ChainVersion, ObjectId, Timestamp};
use crate::store::{object_identity, ChainObject, IndexKey, IndexSpec, KeyPart};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// How a witness earned its slot in the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleSlot {
    /// Not scheduled this round.
    None,
    /// One of the top voted witnesses.
    Top,
    /// Picked by virtual scheduled time.
    Timeshare,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Witness {
    pub id: ObjectId,
    pub owner: AccountName,
    pub created: Timestamp,
    pub url: String,
    pub signing_key: String,
    pub total_missed: u32,
    pub last_confirmed_block_num: u32,

    pub props: ChainProperties,
    pub sbd_exchange_rate: Price,
    pub last_sbd_exchange_update: Timestamp,

    /// Total vote weight, in vesting shares.
    pub votes: i64,
    pub schedule: ScheduleSlot,

    pub virtual_last_update: u128,
    pub virtual_position: u128,
    pub virtual_scheduled_time: u128,

    pub running_version: ChainVersion,
}

impl Witness {
    pub const BY_NAME: usize = 0;
    pub const BY_VOTE: usize = 1;
    pub const BY_SCHEDULE_TIME: usize = 2;

    #[must_use]
    pub fn new(owner: AccountName, created: Timestamp) -> Self {
        Self {
            id: ObjectId::default(),
            owner,
            created,
            url: String::new(),
            signing_key: String::new(),
            total_missed: 0,
            last_confirmed_block_num: 0,
            props: ChainProperties::default(),
            sbd_exchange_rate: Price::null(),
            last_sbd_exchange_update: Timestamp::MIN,
            votes: 0,
            schedule: ScheduleSlot::None,
            virtual_last_update: 0,
            virtual_position: 0,
            virtual_scheduled_time: u128::MAX,
            running_version: ChainVersion::GENESIS,
        }
    }
}

impl ChainObject for Witness {
    const KIND: &'static str = "witness";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::unique("by_name"),
        IndexSpec::ordered("by_vote_name"),
        IndexSpec::ordered("by_schedule_time"),
    ];

    object_identity!();

    fn index_key(&self, index: usize) -> IndexKey {
        match index {
            Self::BY_NAME => vec![KeyPart::from(&self.owner)],
            Self::BY_VOTE => vec![
                KeyPart::I64Desc(Reverse(self.votes)),
                KeyPart::from(&self.owner),
            ],
            _ => vec![
                KeyPart::U128(self.virtual_scheduled_time),
                KeyPart::from(&self.owner),
            ],
        }
    }
}

/// Existence of this object is an active approval of `witness` by `account`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitnessVote {
    pub id: ObjectId,
    pub witness: AccountName,
    pub account: AccountName,
}

impl WitnessVote {
    pub const BY_ACCOUNT_WITNESS: usize = 0;
    pub const BY_WITNESS_ACCOUNT: usize = 1;

    #[must_use]
    pub fn new(account: AccountName, witness: AccountName) -> Self {
        Self {
            id: ObjectId::default(),
            witness,
            account,
        }
    }

    #[must_use]
    pub fn key(account: &AccountName, witness: &AccountName) -> IndexKey {
        vec![KeyPart::from(account), KeyPart::from(witness)]
    }
}

impl ChainObject for WitnessVote {
    const KIND: &'static str = "witness_vote";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::unique("by_account_witness"),
        IndexSpec::unique("by_witness_account"),
    ];

    object_identity!();

    fn index_key(&self, index: usize) -> IndexKey {
        match index {
            Self::BY_ACCOUNT_WITNESS => Self::key(&self.account, &self.witness),
            _ => vec![KeyPart::from(&self.witness), KeyPart::from(&self.account)],
        }
    }
}

/// Singleton describing the current production round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitnessSchedule {
    pub id: ObjectId,
    pub current_virtual_time: u128,
    pub next_shuffle_block_num: u32,
    pub current_shuffled_witnesses: Vec<AccountName>,
    pub median_props: ChainProperties,
    pub majority_version: ChainVersion,
}

impl Default for WitnessSchedule {
    fn default() -> Self {
        Self {
            id: ObjectId::default(),
            current_virtual_time: 0,
            next_shuffle_block_num: 1,
            current_shuffled_witnesses: Vec::new(),
            median_props: ChainProperties::default(),
            majority_version: ChainVersion::GENESIS,
        }
    }
}

impl ChainObject for WitnessSchedule {
    const KIND: &'static str = "witness_schedule";
    const INDICES: &'static [IndexSpec] = &[];

    object_identity!();

    fn index_key(&self, _index: usize) -> IndexKey {
        Vec::new()
    }
}

/// Pending request to give up voting rights, effective after a delay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclineVotingRightsRequest {
    pub id: ObjectId,
    pub account: AccountName,
    pub effective_date: Timestamp,
}

impl DeclineVotingRightsRequest {
    pub const BY_ACCOUNT: usize = 0;
    pub const BY_EFFECTIVE_DATE: usize = 1;
}

impl ChainObject for DeclineVotingRightsRequest {
    const KIND: &'static str = "decline_voting_rights_request";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::unique("by_account"),
        IndexSpec::ordered("by_effective_date"),
    ];

    object_identity!();

    fn index_key(&self, index: usize) -> IndexKey {
        match index {
            Self::BY_ACCOUNT => vec![KeyPart::from(&self.account)],
            _ => vec![KeyPart::from(self.effective_date)],
        }
    }
}
