//! Whole-state consistency checks.
//!
//! Supply accounting must balance exactly: every unit of STEEM and SBD is
//! held by an account, an order, an escrow, a pending request or a fund.

use super::asset::{Asset, Symbol};
use super::errors::{ChainError, InternalError};
use super::globals::{DynamicGlobalProperties, FeedHistory, RewardFund};
use super::account::Account;
use super::market::{ConvertRequest, LimitOrder};
use super::transfers::{Escrow, SavingsWithdraw};
use super::witness::Witness;
use crate::store::Database;

/// Per-symbol totals gathered from every holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupplyTotals {
    pub steem: i128,
    pub sbd: i128,
    pub vests: i128,
}

impl SupplyTotals {
    fn add(&mut self, amount: &Asset) {
        let value = i128::from(amount.amount);
        match amount.symbol {
            Symbol::Steem => self.steem += value,
            Symbol::Sbd => self.sbd += value,
            Symbol::Vests => self.vests += value,
        }
    }
}

/// Sums every balance in the store.
pub fn collect_supply(db: &Database) -> Result<SupplyTotals, ChainError> {
    let mut totals = SupplyTotals {
        steem: 0,
        sbd: 0,
        vests: 0,
    };

    for account in db.all::<Account>() {
        totals.add(&account.balance);
        totals.add(&account.savings_balance);
        totals.add(&account.sbd_balance);
        totals.add(&account.savings_sbd_balance);
        totals.add(&account.vesting_shares);
    }
    for request in db.all::<ConvertRequest>() {
        totals.add(&request.amount);
    }
    for order in db.all::<LimitOrder>() {
        totals.add(&order.amount_for_sale());
    }
    for escrow in db.all::<Escrow>() {
        totals.add(&escrow.steem_balance);
        totals.add(&escrow.sbd_balance);
        totals.add(&escrow.pending_fee);
    }
    for withdraw in db.all::<SavingsWithdraw>() {
        totals.add(&withdraw.amount);
    }
    for fund in db.all::<RewardFund>() {
        totals.add(&fund.reward_balance);
    }

    let props = db.singleton::<DynamicGlobalProperties>()?;
    totals.add(&props.total_vesting_fund_steem);
    totals.add(&props.total_reward_fund_steem);
    Ok(totals)
}

fn violated(message: String) -> ChainError {
    InternalError::Invariant(message).into()
}

/// Checks supply accounting and per-account balance invariants.
pub fn validate_invariants(db: &Database) -> Result<(), ChainError> {
    let props = db.singleton::<DynamicGlobalProperties>()?;

    for witness in db.all::<Witness>() {
        if witness.votes > props.total_vesting_shares.amount {
            return Err(violated(format!(
                "witness {} has {} votes, more than {} total vesting shares",
                witness.owner, witness.votes, props.total_vesting_shares.amount
            )));
        }
    }

    for account in db.all::<Account>() {
        let negative = [
            &account.balance,
            &account.savings_balance,
            &account.sbd_balance,
            &account.savings_sbd_balance,
            &account.vesting_shares,
        ]
        .into_iter()
        .find(|amount| amount.amount < 0);
        if let Some(amount) = negative {
            return Err(violated(format!(
                "account {} holds negative {}",
                account.name, amount
            )));
        }
        if account.vesting_shares.amount - account.delegated_vesting_shares.amount < 0 {
            return Err(violated(format!(
                "account {} delegates more than it holds",
                account.name
            )));
        }
    }

    let totals = collect_supply(db)?;
    if totals.steem != i128::from(props.current_supply.amount) {
        return Err(violated(format!(
            "current supply {} does not match held STEEM {}",
            props.current_supply, totals.steem
        )));
    }
    if totals.sbd != i128::from(props.current_sbd_supply.amount) {
        return Err(violated(format!(
            "current SBD supply {} does not match held SBD {}",
            props.current_sbd_supply, totals.sbd
        )));
    }
    if totals.vests != i128::from(props.total_vesting_shares.amount) {
        return Err(violated(format!(
            "total vesting shares {} does not match held VESTS {}",
            props.total_vesting_shares, totals.vests
        )));
    }

    let median = db.singleton::<FeedHistory>()?.current_median_history;
    if !median.is_null() {
        let sbd_value = props.current_sbd_supply.mul_price(&median)?;
        let expected = props.current_supply.checked_add(&sbd_value)?;
        if props.virtual_supply != expected {
            return Err(violated(format!(
                "virtual supply {} does not match {}",
                props.virtual_supply, expected
            )));
        }
    }
    Ok(())
}
