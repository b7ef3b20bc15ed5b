//! # Order Policy
//!
//! Limit order matching for the internal STEEM/SBD exchange.
//!
//! A new order walks the opposite side of the book best price first and
//! executes at each resting order's price until it is exhausted or nothing
//! crosses any more. Every match fully fills at least one side, and a fully
//! filled resting order is removed, so the walk always terminates.
//!
//! An order whose remainder would receive nothing at its own price is
//! cancelled and refunded instead of resting as dust.

use super::{AccountPolicy, RewardPolicy};
use crate::algorithms::{compute_fill, liquidity_eligible};
use crate::domain::constants::LEGACY_ORDER_ID_MASK;
use crate::domain::hardfork;
use crate::domain::{
    AccountName, Asset, ChainError, InternalError, LimitOrder, ObjectId, Price, Symbol,
    VirtualOperation,
};
use crate::state::ChainState;
use crate::store::ChainObject;

/// Which sides a single match removed from the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchOutcome {
    pub new_filled: bool,
    pub old_filled: bool,
}

/// Order book rules.
pub trait OrderPolicy {
    fn find_limit_order(&self, seller: &AccountName, orderid: u32) -> Option<&LimitOrder>;

    fn get_limit_order(&self, seller: &AccountName, orderid: u32)
        -> Result<&LimitOrder, ChainError>;

    /// Matches the stored order `order_id` against the book. Returns `true`
    /// when the order no longer rests in the book afterwards.
    fn apply_order(&mut self, order_id: ObjectId) -> Result<bool, ChainError>;

    /// Executes one match at `match_price`, the resting order's price.
    fn match_orders(
        &mut self,
        new_order: &LimitOrder,
        old_order: &LimitOrder,
        match_price: &Price,
    ) -> Result<MatchOutcome, ChainError>;

    /// Credits `receives` to the seller and removes `pays` from the order.
    /// Returns `true` when the order left the book.
    fn fill_order(
        &mut self,
        order: &LimitOrder,
        pays: Asset,
        receives: Asset,
    ) -> Result<bool, ChainError>;

    /// Refunds the unsold remainder and removes the order.
    fn cancel_order(&mut self, order_id: ObjectId) -> Result<(), ChainError>;

    /// Cancels every order whose expiration has passed.
    fn clear_expired_orders(&mut self) -> Result<(), ChainError>;
}

/// Whether `resting` sells at or below the limit `max_price` of a new order.
fn crosses(resting: &Price, max_price: &Price) -> bool {
    if resting.base.symbol != max_price.base.symbol
        || resting.quote.symbol != max_price.quote.symbol
    {
        return false;
    }
    i128::from(resting.base.amount) * i128::from(max_price.quote.amount)
        >= i128::from(max_price.base.amount) * i128::from(resting.quote.amount)
}

impl ChainState {
    pub(crate) fn order_id_key(&self, orderid: u32) -> u32 {
        if self.has_hardfork(hardfork::FULL_ORDER_ID) {
            orderid
        } else {
            orderid & LEGACY_ORDER_ID_MASK
        }
    }

    /// Best resting order crossing `max_price`, if any.
    fn best_crossing(&self, max_price: &Price) -> Option<LimitOrder> {
        let start = LimitOrder::book_start(Price::max(
            max_price.base.symbol,
            max_price.quote.symbol,
        ));
        self.db
            .range_from::<LimitOrder>(LimitOrder::BY_PRICE, start)
            .next()
            .filter(|order| crosses(&order.sell_price, max_price))
            .cloned()
    }
}

impl OrderPolicy for ChainState {
    fn find_limit_order(&self, seller: &AccountName, orderid: u32) -> Option<&LimitOrder> {
        let key = LimitOrder::account_key(seller, self.order_id_key(orderid));
        self.db.find_by::<LimitOrder>(LimitOrder::BY_ACCOUNT, &key)
    }

    fn get_limit_order(
        &self,
        seller: &AccountName,
        orderid: u32,
    ) -> Result<&LimitOrder, ChainError> {
        self.find_limit_order(seller, orderid)
            .ok_or_else(|| ChainError::not_found(LimitOrder::KIND, format!("{seller}/{orderid}")))
    }

    fn apply_order(&mut self, order_id: ObjectId) -> Result<bool, ChainError> {
        let max_price = !self.db.get::<LimitOrder>(order_id)?.sell_price;

        loop {
            let Some(new_order) = self.db.find::<LimitOrder>(order_id).cloned() else {
                return Ok(true);
            };
            let Some(resting) = self.best_crossing(&max_price) else {
                return Ok(false);
            };

            let outcome = self.match_orders(&new_order, &resting, &resting.sell_price)?;
            if outcome.new_filled {
                return Ok(self.db.find::<LimitOrder>(order_id).is_none());
            }
        }
    }

    fn match_orders(
        &mut self,
        new_order: &LimitOrder,
        old_order: &LimitOrder,
        match_price: &Price,
    ) -> Result<MatchOutcome, ChainError> {
        if new_order.sell_price.quote.symbol != old_order.sell_price.base.symbol
            || new_order.sell_price.base.symbol != old_order.sell_price.quote.symbol
            || new_order.for_sale <= 0
            || old_order.for_sale <= 0
        {
            return Err(InternalError::Invariant(format!(
                "orders {} and {} cannot be matched",
                new_order.id, old_order.id
            ))
            .into());
        }

        let fill = compute_fill(
            new_order.amount_for_sale(),
            old_order.amount_for_sale(),
            match_price,
        )?;

        let now = self.head_block_time()?;
        if !self.has_hardfork(hardfork::NO_LIQUIDITY_REWARD)
            && liquidity_eligible(
                now.since(old_order.created),
                self.has_hardfork(hardfork::LIQUIDITY_PERIOD_HF10),
            )
        {
            if fill.old_receives.symbol == Symbol::Steem {
                self.adjust_liquidity_reward(&old_order.seller, fill.old_receives, false)?;
                self.adjust_liquidity_reward(&new_order.seller, -fill.old_receives, false)?;
            } else {
                self.adjust_liquidity_reward(&old_order.seller, fill.new_receives, true)?;
                self.adjust_liquidity_reward(&new_order.seller, -fill.new_receives, true)?;
            }
        }

        self.push_virtual_operation(VirtualOperation::FillOrder {
            current_owner: new_order.seller.clone(),
            current_orderid: new_order.orderid,
            current_pays: fill.new_pays,
            open_owner: old_order.seller.clone(),
            open_orderid: old_order.orderid,
            open_pays: fill.old_pays,
        });

        let outcome = MatchOutcome {
            new_filled: self.fill_order(new_order, fill.new_pays, fill.new_receives)?,
            old_filled: self.fill_order(old_order, fill.old_pays, fill.old_receives)?,
        };
        if !outcome.new_filled && !outcome.old_filled {
            return Err(InternalError::Invariant(format!(
                "match of {} and {} filled neither order",
                new_order.id, old_order.id
            ))
            .into());
        }

        tracing::debug!(
            taker = %new_order.seller,
            maker = %old_order.seller,
            taker_pays = %fill.new_pays,
            maker_pays = %fill.old_pays,
            "orders matched"
        );
        Ok(outcome)
    }

    fn fill_order(
        &mut self,
        order: &LimitOrder,
        pays: Asset,
        receives: Asset,
    ) -> Result<bool, ChainError> {
        let for_sale = self.db.get::<LimitOrder>(order.id)?.amount_for_sale();
        if for_sale.symbol != pays.symbol || pays.symbol == receives.symbol {
            return Err(InternalError::Invariant(format!(
                "fill of order {} pays {pays} for {receives}",
                order.id
            ))
            .into());
        }

        self.adjust_balance(&order.seller, receives)?;

        if pays == for_sale {
            self.db.remove::<LimitOrder>(order.id)?;
            return Ok(true);
        }

        self.db
            .modify::<LimitOrder, _>(order.id, |o| o.for_sale -= pays.amount)?;
        let remainder = self.db.get::<LimitOrder>(order.id)?.amount_to_receive()?;
        if remainder.amount == 0 {
            tracing::debug!(seller = %order.seller, order_id = order.orderid, "cancelling dust order");
            self.cancel_order(order.id)?;
            return Ok(true);
        }
        Ok(false)
    }

    fn cancel_order(&mut self, order_id: ObjectId) -> Result<(), ChainError> {
        let order = self.db.get::<LimitOrder>(order_id)?.clone();
        self.adjust_balance(&order.seller, order.amount_for_sale())?;
        self.db.remove::<LimitOrder>(order_id)?;
        Ok(())
    }

    fn clear_expired_orders(&mut self) -> Result<(), ChainError> {
        let now = self.head_block_time()?;
        let expired = super::due::<LimitOrder, _>(&self.db, LimitOrder::BY_EXPIRATION, |o| {
            o.expiration < now
        });
        for order in expired {
            self.cancel_order(order.id)?;
        }
        Ok(())
    }
}
