//! # Withdrawal Policy
//!
//! Scheduled vesting power-downs and savings withdrawal lookups.
//!
//! Each due account withdraws one installment of vesting shares. Routes are
//! paid in two passes: auto-vest routes first, receiving the shares
//! unconverted, then liquid routes, receiving STEEM at the vesting share
//! price. Whatever no route claimed is converted for the owner.

use super::{add_to, due, sub_from, WitnessPolicy};
use crate::domain::constants::{PERCENT_100, VESTING_WITHDRAW_INTERVAL_SECONDS};
use crate::domain::{
    Account, AccountName, Asset, ChainError, InternalError, SavingsWithdraw, Timestamp,
    VirtualOperation, WithdrawVestingRoute,
};
use crate::state::ChainState;
use crate::store::{ChainObject, KeyPart};

/// Power-down processing.
pub trait WithdrawalPolicy {
    /// Pays the current installment of every power-down that is due.
    fn process_vesting_withdrawals(&mut self) -> Result<(), ChainError>;

    fn find_savings_withdraw(&self, from: &AccountName, request_id: u32)
        -> Option<&SavingsWithdraw>;

    fn get_savings_withdraw(
        &self,
        from: &AccountName,
        request_id: u32,
    ) -> Result<&SavingsWithdraw, ChainError>;
}

/// Shares paid this installment: the rate, or the odd remainder on the
/// last one, never more than the account holds.
fn installment(account: &Account) -> i64 {
    let rate = account.vesting_withdraw_rate.amount;
    let amount = if account.to_withdraw - account.withdrawn < rate {
        account.to_withdraw.checked_rem(rate).unwrap_or(0)
    } else {
        rate
    };
    account.vesting_shares.amount.min(amount)
}

fn route_share(to_withdraw: i64, percent: u16) -> i64 {
    (i128::from(to_withdraw) * i128::from(percent) / i128::from(PERCENT_100)) as i64
}

impl ChainState {
    fn withdraw_routes(&self, from: &AccountName) -> Vec<WithdrawVestingRoute> {
        self.db
            .prefix::<WithdrawVestingRoute>(
                WithdrawVestingRoute::BY_WITHDRAW_ROUTE,
                vec![KeyPart::from(from)],
            )
            .cloned()
            .collect()
    }

    /// Burns `vests` out of the vesting fund and returns the STEEM released.
    fn release_vests(&mut self, vests: i64) -> Result<Asset, ChainError> {
        let price = self.props()?.vesting_share_price()?;
        let steem = Asset::vests(vests).mul_price(&price)?;
        self.update_props(|p| {
            sub_from(&mut p.total_vesting_fund_steem, steem)?;
            sub_from(&mut p.total_vesting_shares, Asset::vests(vests))?;
            Ok(())
        })?;
        Ok(steem)
    }

    fn withdraw_installment(&mut self, account: Account) -> Result<(), ChainError> {
        let to_withdraw = installment(&account);
        let routes = self.withdraw_routes(&account.name);
        let from = account.name.clone();

        let mut deposited_as_vests = 0i64;
        for route in routes.iter().filter(|r| r.auto_vest) {
            let deposit = route_share(to_withdraw, route.percent);
            deposited_as_vests += deposit;
            if deposit > 0 {
                self.update_account(&route.to_account, |a| {
                    add_to(&mut a.vesting_shares, Asset::vests(deposit))?;
                    Ok(())
                })?;
                self.adjust_proxied_witness_votes(&route.to_account, deposit, 0)?;
                self.push_virtual_operation(VirtualOperation::FillVestingWithdraw {
                    from_account: from.clone(),
                    to_account: route.to_account.clone(),
                    withdrawn: Asset::vests(deposit),
                    deposited: Asset::vests(deposit),
                });
            }
        }

        let mut deposited_as_steem = 0i64;
        for route in routes.iter().filter(|r| !r.auto_vest) {
            let deposit = route_share(to_withdraw, route.percent);
            deposited_as_steem += deposit;
            if deposit > 0 {
                let steem = self.release_vests(deposit)?;
                self.update_account(&route.to_account, |a| {
                    add_to(&mut a.balance, steem)?;
                    Ok(())
                })?;
                self.push_virtual_operation(VirtualOperation::FillVestingWithdraw {
                    from_account: from.clone(),
                    to_account: route.to_account.clone(),
                    withdrawn: Asset::vests(deposit),
                    deposited: steem,
                });
            }
        }

        let to_convert = to_withdraw - deposited_as_steem - deposited_as_vests;
        if to_convert < 0 {
            return Err(InternalError::Invariant(format!(
                "{from} deposited more vests than were withdrawn"
            ))
            .into());
        }

        let converted = self.release_vests(to_convert)?;
        self.update_account(&from, |a| {
            sub_from(&mut a.vesting_shares, Asset::vests(to_withdraw))?;
            add_to(&mut a.balance, converted)?;
            a.withdrawn += to_withdraw;
            if a.withdrawn >= a.to_withdraw || a.vesting_shares.amount == 0 {
                a.vesting_withdraw_rate = Asset::vests(0);
                a.next_vesting_withdrawal = Timestamp::MAX;
            } else {
                a.next_vesting_withdrawal = a
                    .next_vesting_withdrawal
                    .plus(VESTING_WITHDRAW_INTERVAL_SECONDS);
            }
            Ok(())
        })?;

        if to_withdraw > 0 {
            self.adjust_proxied_witness_votes(&from, -to_withdraw, 0)?;
        }
        tracing::debug!(account = %from, vests = to_withdraw, steem = %converted, "vesting withdrawn");
        self.push_virtual_operation(VirtualOperation::FillVestingWithdraw {
            from_account: from.clone(),
            to_account: from,
            withdrawn: Asset::vests(to_withdraw),
            deposited: converted,
        });
        Ok(())
    }
}

impl WithdrawalPolicy for ChainState {
    fn process_vesting_withdrawals(&mut self) -> Result<(), ChainError> {
        let now = self.head_block_time()?;
        let accounts = due::<Account, _>(&self.db, Account::BY_NEXT_VESTING_WITHDRAWAL, |a| {
            a.next_vesting_withdrawal <= now
        });
        for account in accounts {
            let current = self.account(&account.name)?.clone();
            self.withdraw_installment(current)?;
        }
        Ok(())
    }

    fn find_savings_withdraw(
        &self,
        from: &AccountName,
        request_id: u32,
    ) -> Option<&SavingsWithdraw> {
        self.db.find_by::<SavingsWithdraw>(
            SavingsWithdraw::BY_FROM_RID,
            &SavingsWithdraw::from_key(from, request_id),
        )
    }

    fn get_savings_withdraw(
        &self,
        from: &AccountName,
        request_id: u32,
    ) -> Result<&SavingsWithdraw, ChainError> {
        self.find_savings_withdraw(from, request_id).ok_or_else(|| {
            ChainError::not_found(SavingsWithdraw::KIND, format!("{from}/{request_id}"))
        })
    }
}
