//! # Asset Policy
//!
//! Supply accounting. `current_supply` and `current_sbd_supply` must always
//! equal what is actually held; `virtual_supply` values the SBD supply in
//! STEEM at the median feed.

use super::{add_to, due, sub_from, AccountPolicy};
use crate::algorithms::to_steem;
use crate::domain::constants::{
    FEED_HISTORY_WINDOW, FEED_HISTORY_WINDOW_PRE_HF16, FEED_INTERVAL_BLOCKS, MAX_FEED_AGE,
    MIN_FEEDS, PERCENT_100, SBD_START_PERCENT, SBD_STOP_PERCENT, START_VESTING_BLOCK,
};
use crate::domain::hardfork;
use crate::domain::{
    add_amount, AccountName, Asset, ChainError, ConvertRequest, FeedHistory, Price, Symbol,
    VirtualOperation,
};
use crate::state::ChainState;

/// Supply-side rules.
pub trait AssetPolicy {
    /// Adds `delta` to the supply of its symbol. With `adjust_vesting`, new
    /// STEEM is matched nine-fold into the vesting fund once vesting has
    /// started.
    fn adjust_supply(&mut self, delta: Asset, adjust_vesting: bool) -> Result<(), ChainError>;

    /// Recomputes the virtual supply and the SBD print rate.
    fn update_virtual_supply(&mut self) -> Result<(), ChainError>;

    /// Pays `steem` to `to`, printing the SBD share at the current print
    /// rate. Returns the `(sbd, steem)` actually paid.
    fn create_sbd(&mut self, to: &AccountName, steem: Asset) -> Result<(Asset, Asset), ChainError>;

    /// Settles conversion requests whose date has passed.
    fn process_conversions(&mut self) -> Result<(), ChainError>;

    /// Folds fresh witness feeds into the median history.
    fn update_median_feed(&mut self) -> Result<(), ChainError>;
}

impl AssetPolicy for ChainState {
    fn adjust_supply(&mut self, delta: Asset, adjust_vesting: bool) -> Result<(), ChainError> {
        let adjust_vesting = adjust_vesting && self.head_block_num()? >= START_VESTING_BLOCK;
        let median = self.feed_history()?.current_median_history;

        self.update_props(|p| match delta.symbol {
            Symbol::Steem => {
                let new_vesting = if adjust_vesting && delta.amount > 0 {
                    delta
                        .amount
                        .checked_mul(9)
                        .ok_or(crate::domain::AssetError::Overflow("vesting match"))?
                } else {
                    0
                };
                let total = Asset::steem(add_amount(delta.amount, new_vesting)?);
                add_to(&mut p.current_supply, total)?;
                add_to(&mut p.virtual_supply, total)?;
                add_to(&mut p.total_vesting_fund_steem, Asset::steem(new_vesting))?;
                Ok(())
            }
            Symbol::Sbd => {
                add_to(&mut p.current_sbd_supply, delta)?;
                p.virtual_supply = p
                    .current_supply
                    .checked_add(&to_steem(&median, p.current_sbd_supply)?)?;
                Ok(())
            }
            Symbol::Vests => Err(ChainError::rule("Invalid symbol VESTS")),
        })
    }

    fn update_virtual_supply(&mut self) -> Result<(), ChainError> {
        let median = self.feed_history()?.current_median_history;
        let adjust_print_rate = !median.is_null() && self.has_hardfork(hardfork::FEED_MARKET_CAP_FLOOR);

        self.update_props(|p| {
            let sbd_value = to_steem(&median, p.current_sbd_supply)?;
            p.virtual_supply = p.current_supply.checked_add(&sbd_value)?;

            if adjust_print_rate && p.virtual_supply.amount > 0 {
                let percent_sbd = i128::from(sbd_value.amount) * i128::from(PERCENT_100)
                    / i128::from(p.virtual_supply.amount);
                p.sbd_print_rate = if percent_sbd <= i128::from(SBD_START_PERCENT) {
                    PERCENT_100
                } else if percent_sbd >= i128::from(SBD_STOP_PERCENT) {
                    0
                } else {
                    let span = i128::from(SBD_STOP_PERCENT - SBD_START_PERCENT);
                    ((i128::from(SBD_STOP_PERCENT) - percent_sbd) * i128::from(PERCENT_100) / span)
                        as u16
                };
            }
            Ok(())
        })
    }

    fn create_sbd(&mut self, to: &AccountName, steem: Asset) -> Result<(Asset, Asset), ChainError> {
        if steem.amount == 0 {
            return Ok((Asset::sbd(0), Asset::steem(0)));
        }
        let median = self.feed_history()?.current_median_history;
        if median.is_null() {
            self.adjust_balance(to, steem)?;
            return Ok((Asset::sbd(0), steem));
        }

        let print_rate = self.props()?.sbd_print_rate;
        let to_sbd = (i128::from(steem.amount) * i128::from(print_rate) / i128::from(PERCENT_100)) as i64;
        let to_steem = steem.amount - to_sbd;
        let sbd = Asset::steem(to_sbd).mul_price(&median)?;

        self.adjust_balance(to, sbd)?;
        self.adjust_balance(to, Asset::steem(to_steem))?;
        self.adjust_supply(Asset::steem(-to_sbd), false)?;
        self.adjust_supply(sbd, false)?;
        Ok((sbd, Asset::steem(to_steem)))
    }

    fn process_conversions(&mut self) -> Result<(), ChainError> {
        let median = self.feed_history()?.current_median_history;
        if median.is_null() {
            return Ok(());
        }
        let now = self.head_block_time()?;
        let ready = due::<ConvertRequest, _>(&self.db, ConvertRequest::BY_CONVERSION_DATE, |r| {
            r.conversion_date <= now
        });
        if ready.is_empty() {
            return Ok(());
        }

        let mut net_sbd = Asset::sbd(0);
        let mut net_steem = Asset::steem(0);
        for request in ready {
            let issued = request.amount.mul_price(&median)?;
            self.adjust_balance(&request.owner, issued)?;
            add_to(&mut net_sbd, request.amount)?;
            add_to(&mut net_steem, issued)?;
            self.push_virtual_operation(VirtualOperation::FillConvertRequest {
                owner: request.owner.clone(),
                requestid: request.requestid,
                amount_in: request.amount,
                amount_out: issued,
            });
            self.db.remove::<ConvertRequest>(request.id)?;
        }

        let net_sbd_value = net_sbd.mul_price(&median)?;
        self.update_props(|p| {
            add_to(&mut p.current_supply, net_steem)?;
            sub_from(&mut p.current_sbd_supply, net_sbd)?;
            add_to(&mut p.virtual_supply, net_steem)?;
            sub_from(&mut p.virtual_supply, net_sbd_value)?;
            Ok(())
        })?;
        tracing::debug!(sbd = %net_sbd, steem = %net_steem, "conversions settled");
        Ok(())
    }

    fn update_median_feed(&mut self) -> Result<(), ChainError> {
        if self.head_block_num()? % FEED_INTERVAL_BLOCKS != 0 {
            return Ok(());
        }
        let now = self.head_block_time()?;

        let mut feeds: Vec<Price> = Vec::new();
        for owner in self.witness_schedule()?.current_shuffled_witnesses.clone() {
            let Some(witness) = self.find_witness(&owner) else {
                continue;
            };
            let fresh = witness.last_sbd_exchange_update.plus(MAX_FEED_AGE) > now;
            if fresh && !witness.sbd_exchange_rate.is_null() {
                feeds.push(witness.sbd_exchange_rate);
            }
        }
        if feeds.len() < MIN_FEEDS {
            tracing::debug!(feeds = feeds.len(), "not enough fresh feeds for a median");
            return Ok(());
        }
        feeds.sort();
        let median_feed = feeds[feeds.len() / 2];

        let window = if self.has_hardfork(hardfork::SHORT_FEED_WINDOW) {
            FEED_HISTORY_WINDOW
        } else {
            FEED_HISTORY_WINDOW_PRE_HF16
        };
        let floor = if self.has_hardfork(hardfork::FEED_MARKET_CAP_FLOOR)
            && !self.flags().skip_price_feed_limit_check
        {
            let props = self.props()?;
            // SBD may not exceed a tenth of the market cap
            Price::new(
                Asset::sbd(9 * props.current_sbd_supply.amount),
                props.current_supply,
            )
            .ok()
        } else {
            None
        };

        self.db.modify_singleton::<FeedHistory, _>(|history| {
            history.price_history.push_back(median_feed);
            while history.price_history.len() > window {
                history.price_history.pop_front();
            }
            let mut sorted: Vec<Price> = history.price_history.iter().copied().collect();
            sorted.sort();
            if let Some(median) = sorted.get(sorted.len() / 2) {
                history.current_median_history = *median;
            }
            if let Some(floor) = floor {
                if floor > history.current_median_history {
                    history.current_median_history = floor;
                }
            }
        })?;
        tracing::debug!(median = %median_feed, "median feed updated");
        Ok(())
    }
}
