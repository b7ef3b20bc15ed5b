//! Internal exchange objects: resting limit orders, pending SBD conversions
//! and liquidity-provider volume trackers.

use super::asset::{Asset, AssetError, BookRate, Price};
use super::value_objects::{AccountName, ObjectId, Timestamp};
use crate::store::{object_identity, ChainObject, IndexKey, IndexSpec, KeyPart};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// A resting order selling `for_sale` units of `sell_price.base`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitOrder {
    pub id: ObjectId,
    pub created: Timestamp,
    pub expiration: Timestamp,
    pub seller: AccountName,
    pub orderid: u32,
    pub for_sale: i64,
    pub sell_price: Price,
}

impl LimitOrder {
    pub const BY_EXPIRATION: usize = 0;
    pub const BY_PRICE: usize = 1;
    pub const BY_ACCOUNT: usize = 2;

    #[must_use]
    pub fn amount_for_sale(&self) -> Asset {
        Asset::new(self.for_sale, self.sell_price.base.symbol)
    }

    /// What the seller gets if the rest of the order fills at its own price.
    pub fn amount_to_receive(&self) -> Result<Asset, AssetError> {
        self.amount_for_sale().mul_price(&self.sell_price)
    }

    #[must_use]
    pub fn account_key(seller: &AccountName, orderid: u32) -> IndexKey {
        vec![KeyPart::from(seller), KeyPart::U32(orderid)]
    }

    /// Start of the book for orders selling `base` for `quote`, best first.
    #[must_use]
    pub fn book_start(price: Price) -> IndexKey {
        vec![KeyPart::PriceDesc(Reverse(BookRate(price)))]
    }
}

impl ChainObject for LimitOrder {
    const KIND: &'static str = "limit_order";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::ordered("by_expiration"),
        IndexSpec::ordered("by_price"),
        IndexSpec::unique("by_account"),
    ];

    object_identity!();

    fn index_key(&self, index: usize) -> IndexKey {
        match index {
            Self::BY_EXPIRATION => vec![KeyPart::from(self.expiration)],
            // equal rates fall through to the appended object id, oldest first
            Self::BY_PRICE => Self::book_start(self.sell_price),
            _ => Self::account_key(&self.seller, self.orderid),
        }
    }
}

/// SBD parked until `conversion_date`, then paid out at the median feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertRequest {
    pub id: ObjectId,
    pub owner: AccountName,
    pub requestid: u32,
    pub amount: Asset,
    pub conversion_date: Timestamp,
}

impl ConvertRequest {
    pub const BY_CONVERSION_DATE: usize = 0;
    pub const BY_OWNER: usize = 1;
}

impl ChainObject for ConvertRequest {
    const KIND: &'static str = "convert_request";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::ordered("by_conversion_date"),
        IndexSpec::unique("by_owner"),
    ];

    object_identity!();

    fn index_key(&self, index: usize) -> IndexKey {
        match index {
            Self::BY_CONVERSION_DATE => vec![KeyPart::from(self.conversion_date)],
            _ => vec![KeyPart::from(&self.owner), KeyPart::U32(self.requestid)],
        }
    }
}

/// Market-making volume of one account, ranked by weight for payouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityRewardBalance {
    pub id: ObjectId,
    pub owner: AccountName,
    pub steem_volume: i64,
    pub sbd_volume: i64,
    pub weight: u128,
    pub last_update: Timestamp,
}

impl LiquidityRewardBalance {
    pub const BY_OWNER: usize = 0;
    pub const BY_VOLUME_WEIGHT: usize = 1;

    #[must_use]
    pub fn new(owner: AccountName, last_update: Timestamp) -> Self {
        Self {
            id: ObjectId::default(),
            owner,
            steem_volume: 0,
            sbd_volume: 0,
            weight: 0,
            last_update,
        }
    }

    /// Weight is zero unless both sides of the market were provided.
    #[must_use]
    pub fn volume_weight(&self) -> u128 {
        if self.steem_volume > 0 && self.sbd_volume > 0 {
            self.weight
        } else {
            0
        }
    }

    /// Recomputes `weight` from the volumes. With `min_volume` the smaller
    /// side counts; otherwise the product of both sides.
    pub fn update_weight(&mut self, min_volume: bool) {
        self.weight = if self.steem_volume <= 0 || self.sbd_volume <= 0 {
            0
        } else if min_volume {
            self.steem_volume.min(self.sbd_volume) as u128
        } else {
            self.steem_volume as u128 * self.sbd_volume as u128
        };
    }
}

impl ChainObject for LiquidityRewardBalance {
    const KIND: &'static str = "liquidity_reward_balance";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::unique("by_owner"),
        IndexSpec::ordered("by_volume_weight"),
    ];

    object_identity!();

    fn index_key(&self, index: usize) -> IndexKey {
        match index {
            Self::BY_OWNER => vec![KeyPart::from(&self.owner)],
            _ => vec![
                KeyPart::U128Desc(Reverse(self.volume_weight())),
                KeyPart::from(&self.owner),
            ],
        }
    }
}
