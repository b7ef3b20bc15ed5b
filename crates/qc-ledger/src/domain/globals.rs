//! Chain-wide singletons and reward pools.

use super::asset::{Asset, AssetError, Price};
use super::constants::{CONTENT_CONSTANT, PERCENT_1};
use super::value_objects::{AccountName, ObjectId, Timestamp};
use crate::store::{object_identity, ChainObject, IndexKey, IndexSpec, KeyPart};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Process-wide chain state. Exactly one instance exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicGlobalProperties {
    pub id: ObjectId,
    pub head_block_number: u32,
    pub head_block_time: Timestamp,
    pub current_witness: AccountName,
    pub num_pow_witnesses: u32,

    /// Liquid supply, including everything held in funds, orders and escrow.
    pub current_supply: Asset,
    pub current_sbd_supply: Asset,
    /// `current_supply` plus the SBD supply valued at the median feed.
    pub virtual_supply: Asset,

    pub total_vesting_fund_steem: Asset,
    pub total_vesting_shares: Asset,
    pub total_reward_fund_steem: Asset,

    pub sbd_interest_rate: u16,
    pub sbd_print_rate: u16,
    pub maximum_block_size: u32,

    pub current_aslot: u64,
    /// Bitmap of the last 128 slots, 1 where a block was produced.
    pub recent_slots_filled: u128,
    pub participation_count: u8,
    pub last_irreversible_block_num: u32,
}

impl DynamicGlobalProperties {
    /// STEEM per VESTS used for new stake; fixed at 1000:1e6 until the fund
    /// is seeded.
    pub fn vesting_share_price(&self) -> Result<Price, AssetError> {
        if self.total_vesting_fund_steem.amount == 0 || self.total_vesting_shares.amount == 0 {
            return Price::new(Asset::vests(1_000_000), Asset::steem(1_000));
        }
        Price::new(self.total_vesting_shares, self.total_vesting_fund_steem)
    }
}

impl Default for DynamicGlobalProperties {
    fn default() -> Self {
        Self {
            id: ObjectId::default(),
            head_block_number: 0,
            head_block_time: Timestamp::MIN,
            current_witness: AccountName::none(),
            num_pow_witnesses: 0,
            current_supply: Asset::steem(0),
            current_sbd_supply: Asset::sbd(0),
            virtual_supply: Asset::steem(0),
            total_vesting_fund_steem: Asset::steem(0),
            total_vesting_shares: Asset::vests(0),
            total_reward_fund_steem: Asset::steem(0),
            sbd_interest_rate: 0,
            sbd_print_rate: 100 * PERCENT_1,
            maximum_block_size: 131_072,
            current_aslot: 0,
            recent_slots_filled: u128::MAX,
            participation_count: 128,
            last_irreversible_block_num: 0,
        }
    }
}

impl ChainObject for DynamicGlobalProperties {
    const KIND: &'static str = "dynamic_global_properties";
    const INDICES: &'static [IndexSpec] = &[];

    object_identity!();

    fn index_key(&self, _index: usize) -> IndexKey {
        Vec::new()
    }
}

/// Bounded history of median price feeds. Singleton.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeedHistory {
    pub id: ObjectId,
    pub current_median_history: Price,
    pub price_history: VecDeque<Price>,
}

impl ChainObject for FeedHistory {
    const KIND: &'static str = "feed_history";
    const INDICES: &'static [IndexSpec] = &[];

    object_identity!();

    fn index_key(&self, _index: usize) -> IndexKey {
        Vec::new()
    }
}

/// Named pool that content rewards are paid from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardFund {
    pub id: ObjectId,
    pub name: String,
    pub reward_balance: Asset,
    pub recent_claims: u128,
    pub last_update: Timestamp,
    pub content_constant: u128,
    pub percent_curation_rewards: u16,
    pub percent_content_rewards: u16,
}

impl RewardFund {
    pub const BY_NAME: usize = 0;

    #[must_use]
    pub fn new(name: &str, percent_content_rewards: u16, last_update: Timestamp) -> Self {
        Self {
            id: ObjectId::default(),
            name: name.to_string(),
            reward_balance: Asset::steem(0),
            recent_claims: 0,
            last_update,
            content_constant: CONTENT_CONSTANT,
            percent_curation_rewards: 25 * PERCENT_1,
            percent_content_rewards,
        }
    }

    #[must_use]
    pub fn name_key(name: &str) -> IndexKey {
        vec![KeyPart::Text(name.to_string())]
    }
}

impl ChainObject for RewardFund {
    const KIND: &'static str = "reward_fund";
    const INDICES: &'static [IndexSpec] = &[IndexSpec::unique("by_name")];

    object_identity!();

    fn index_key(&self, _index: usize) -> IndexKey {
        Self::name_key(&self.name)
    }
}
