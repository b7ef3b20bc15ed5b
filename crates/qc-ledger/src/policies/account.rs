//! # Account Policy
//!
//! Balance mutation and the per-block account sweeps.
//!
//! SBD balances accrue interest on balance-seconds. Every adjustment first
//! brings the accumulator up to the head block time and, once a full
//! compounding interval has passed, pays the interest into the balance and
//! emits an `interest` virtual operation. Savings SBD is tracked the same
//! way but never pays interest.

use super::{add_to, due, sub_from, AssetPolicy, RewardPolicy, WitnessPolicy};
use crate::algorithms::{
    accrue_balance_seconds, inflation_rate, interest_due, interest_payable, new_steem_per_block,
    percent_reward_per_block, to_steem,
};
use crate::domain::constants::{
    BOOTSTRAP_CONTENT_REWARD, BOOTSTRAP_CURATE_REWARD, CONTENT_APR_PERCENT,
    CONTENT_REWARD_PERCENT, CURATE_APR_PERCENT, MIN_CONTENT_REWARD, MIN_CURATE_REWARD,
    MIN_PRODUCER_REWARD, NULL_ACCOUNT, OWNER_AUTH_HISTORY_TRACKING_START_BLOCK_NUM,
    OWNER_AUTH_RECOVERY_PERIOD, PERCENT_100, PRODUCER_APR_PERCENT, START_VESTING_BLOCK,
    VESTING_FUND_PERCENT,
};
use crate::domain::hardfork;
use crate::domain::{
    Account, AccountAuthority, AccountName, AccountRecoveryRequest, Asset, Authority, ChainError,
    ChangeRecoveryAccountRequest, Escrow, ObjectId, OwnerAuthorityHistory, SavingsWithdraw, Symbol,
    ValidationError, VestingDelegationExpiration, VirtualOperation,
};
use crate::state::{name_key, ChainState};
use crate::store::KeyPart;

/// Balance rules and account-level maintenance.
pub trait AccountPolicy {
    /// Liquid balance of `name` in `symbol`.
    fn get_balance(&self, name: &AccountName, symbol: Symbol) -> Result<Asset, ChainError>;

    fn get_savings_balance(&self, name: &AccountName, symbol: Symbol) -> Result<Asset, ChainError>;

    /// Adds `delta` to the liquid balance of `delta.symbol`, paying pending
    /// SBD interest first. Fails if the balance would go negative.
    fn adjust_balance(&mut self, name: &AccountName, delta: Asset) -> Result<(), ChainError>;

    /// Adds `delta` to the savings balance of `delta.symbol`.
    fn adjust_savings_balance(&mut self, name: &AccountName, delta: Asset)
        -> Result<(), ChainError>;

    /// Replaces the owner authority, remembering the old one for recovery.
    fn update_owner_authority(
        &mut self,
        name: &AccountName,
        owner: Authority,
    ) -> Result<(), ChainError>;

    /// Burns everything held by the null account.
    fn clear_null_account_balance(&mut self) -> Result<(), ChainError>;

    /// Debits `fee` from `name` and removes it from the supply.
    fn pay_fee(&mut self, name: &AccountName, fee: Asset) -> Result<(), ChainError>;

    /// Refunds escrows that were not ratified before their deadline.
    fn expire_escrow_ratification(&mut self) -> Result<(), ChainError>;

    /// Mints this block's inflation into the reward, vesting and witness
    /// funds.
    fn process_funds(&mut self) -> Result<(), ChainError>;

    /// Completes savings withdrawals whose delay has passed.
    fn process_savings_withdraws(&mut self) -> Result<(), ChainError>;

    /// Expires recovery requests and stale owner history, and applies due
    /// recovery account changes.
    fn account_recovery_processing(&mut self) -> Result<(), ChainError>;

    /// Returns delegated shares whose cooldown has passed.
    fn clear_expired_delegations(&mut self) -> Result<(), ChainError>;
}

fn unsupported(symbol: Symbol) -> ChainError {
    ChainError::rule(format!("Invalid symbol {symbol}"))
}

/// `balance + delta`, rejecting a negative result as insufficient funds.
fn credit(account: &AccountName, balance: Asset, delta: Asset) -> Result<Asset, ChainError> {
    let updated = balance.checked_add(&delta)?;
    if updated.amount < 0 {
        return Err(ValidationError::InsufficientFunds {
            account: account.clone(),
            required: -delta,
            available: balance,
        }
        .into());
    }
    Ok(updated)
}

impl AccountPolicy for ChainState {
    fn get_balance(&self, name: &AccountName, symbol: Symbol) -> Result<Asset, ChainError> {
        let account = self.account(name)?;
        match symbol {
            Symbol::Steem => Ok(account.balance),
            Symbol::Sbd => Ok(account.sbd_balance),
            Symbol::Vests => Err(unsupported(symbol)),
        }
    }

    fn get_savings_balance(&self, name: &AccountName, symbol: Symbol) -> Result<Asset, ChainError> {
        let account = self.account(name)?;
        match symbol {
            Symbol::Steem => Ok(account.savings_balance),
            Symbol::Sbd => Ok(account.savings_sbd_balance),
            Symbol::Vests => Err(unsupported(symbol)),
        }
    }

    fn adjust_balance(&mut self, name: &AccountName, delta: Asset) -> Result<(), ChainError> {
        match delta.symbol {
            Symbol::Steem => self.update_account(name, |a| {
                a.balance = credit(&a.name, a.balance, delta)?;
                Ok(())
            }),
            Symbol::Sbd => {
                let now = self.head_block_time()?;
                let rate = self.props()?.sbd_interest_rate;
                let mut paid = None;

                self.update_account(name, |a| {
                    if a.sbd_seconds_last_update != now {
                        let elapsed = now.since(a.sbd_seconds_last_update);
                        a.sbd_seconds =
                            accrue_balance_seconds(a.sbd_seconds, a.sbd_balance.amount, elapsed)?;
                        a.sbd_seconds_last_update = now;

                        if interest_payable(
                            a.sbd_seconds,
                            a.sbd_seconds_last_update,
                            a.sbd_last_interest_payment,
                        ) {
                            let interest = Asset::sbd(interest_due(a.sbd_seconds, rate)?);
                            add_to(&mut a.sbd_balance, interest)?;
                            a.sbd_seconds = 0;
                            a.sbd_last_interest_payment = now;
                            paid = Some(interest);
                        }
                    }
                    a.sbd_balance = credit(&a.name, a.sbd_balance, delta)?;
                    Ok(())
                })?;

                if let Some(interest) = paid {
                    tracing::debug!(account = %name, interest = %interest, "sbd interest paid");
                    self.push_virtual_operation(VirtualOperation::Interest {
                        owner: name.clone(),
                        interest,
                    });
                    let median = self.feed_history()?.current_median_history;
                    let value = to_steem(&median, interest)?;
                    self.update_props(|p| {
                        add_to(&mut p.current_sbd_supply, interest)?;
                        add_to(&mut p.virtual_supply, value)?;
                        Ok(())
                    })?;
                }
                Ok(())
            }
            Symbol::Vests => Err(unsupported(delta.symbol)),
        }
    }

    fn adjust_savings_balance(
        &mut self,
        name: &AccountName,
        delta: Asset,
    ) -> Result<(), ChainError> {
        match delta.symbol {
            Symbol::Steem => self.update_account(name, |a| {
                a.savings_balance = credit(&a.name, a.savings_balance, delta)?;
                Ok(())
            }),
            Symbol::Sbd => {
                let now = self.head_block_time()?;
                self.update_account(name, |a| {
                    if a.savings_sbd_seconds_last_update != now {
                        let elapsed = now.since(a.savings_sbd_seconds_last_update);
                        a.savings_sbd_seconds = accrue_balance_seconds(
                            a.savings_sbd_seconds,
                            a.savings_sbd_balance.amount,
                            elapsed,
                        )?;
                        a.savings_sbd_seconds_last_update = now;
                    }
                    a.savings_sbd_balance = credit(&a.name, a.savings_sbd_balance, delta)?;
                    Ok(())
                })
            }
            Symbol::Vests => Err(unsupported(delta.symbol)),
        }
    }

    fn update_owner_authority(
        &mut self,
        name: &AccountName,
        owner: Authority,
    ) -> Result<(), ChainError> {
        let now = self.head_block_time()?;
        let authority = self
            .db
            .get_by::<AccountAuthority>(AccountAuthority::BY_ACCOUNT, &name_key(name))?
            .clone();

        if self.head_block_num()? >= OWNER_AUTH_HISTORY_TRACKING_START_BLOCK_NUM {
            self.db.create(OwnerAuthorityHistory {
                id: ObjectId::default(),
                account: name.clone(),
                previous_owner_authority: authority.owner.clone(),
                last_valid_time: now,
            })?;
        }

        self.db.modify::<AccountAuthority, _>(authority.id, |auth| {
            auth.owner = owner;
            auth.last_owner_update = now;
        })?;
        self.update_account(name, |a| {
            a.last_owner_update = now;
            Ok(())
        })
    }

    fn clear_null_account_balance(&mut self) -> Result<(), ChainError> {
        if !self.has_hardfork(hardfork::BURN_NULL_ACCOUNT) {
            return Ok(());
        }
        let null_name = AccountName::from(NULL_ACCOUNT);
        let Some(null) = self.find_account(&null_name).cloned() else {
            return Ok(());
        };

        let mut total_steem = null.balance.checked_add(&null.savings_balance)?;
        let total_sbd = null.sbd_balance.checked_add(&null.savings_sbd_balance)?;

        if null.vesting_shares.amount > 0 {
            let price = self.props()?.vesting_share_price()?;
            let converted = null.vesting_shares.mul_price(&price)?;
            self.update_props(|p| {
                sub_from(&mut p.total_vesting_shares, null.vesting_shares)?;
                sub_from(&mut p.total_vesting_fund_steem, converted)?;
                Ok(())
            })?;
            add_to(&mut total_steem, converted)?;
        }

        if total_steem.is_zero() && total_sbd.is_zero() && null.vesting_shares.is_zero() {
            return Ok(());
        }

        self.db.modify::<Account, _>(null.id, |a| {
            a.balance = Asset::steem(0);
            a.savings_balance = Asset::steem(0);
            a.sbd_balance = Asset::sbd(0);
            a.savings_sbd_balance = Asset::sbd(0);
            a.vesting_shares = Asset::vests(0);
        })?;

        if total_steem.amount > 0 {
            self.adjust_supply(-total_steem, false)?;
        }
        if total_sbd.amount > 0 {
            self.adjust_supply(-total_sbd, false)?;
        }
        tracing::debug!(steem = %total_steem, sbd = %total_sbd, "burned null account balance");
        Ok(())
    }

    fn pay_fee(&mut self, name: &AccountName, fee: Asset) -> Result<(), ChainError> {
        if fee.amount == 0 {
            return Ok(());
        }
        self.adjust_balance(name, -fee)?;
        self.adjust_supply(-fee, false)
    }

    fn expire_escrow_ratification(&mut self) -> Result<(), ChainError> {
        let now = self.head_block_time()?;
        let expired: Vec<Escrow> = self
            .db
            .prefix::<Escrow>(Escrow::BY_RATIFICATION_DEADLINE, vec![KeyPart::from(false)])
            .take_while(|escrow| escrow.ratification_deadline <= now)
            .cloned()
            .collect();

        for escrow in expired {
            self.adjust_balance(&escrow.from, escrow.steem_balance)?;
            self.adjust_balance(&escrow.from, escrow.sbd_balance)?;
            self.adjust_balance(&escrow.from, escrow.pending_fee)?;
            self.db.remove::<Escrow>(escrow.id)?;
            tracing::debug!(from = %escrow.from, escrow_id = escrow.escrow_id, "escrow expired unratified");
        }
        Ok(())
    }

    fn process_funds(&mut self) -> Result<(), ChainError> {
        let props = self.props()?.clone();
        let producer = props.current_witness.clone();
        let has_producer = self.find_account(&producer).is_some();

        if self.has_hardfork(hardfork::NARROWING_INFLATION) {
            let rate = inflation_rate(props.head_block_number);
            let new_steem = new_steem_per_block(props.virtual_supply.amount, rate);
            let percent = |share: i64| new_steem * share / i64::from(PERCENT_100);

            let reward_funds = self.has_hardfork(hardfork::REWARD_FUNDS);
            let mut content_reward = percent(CONTENT_REWARD_PERCENT);
            if reward_funds {
                content_reward = self.pay_reward_funds(content_reward)?;
            }
            let vesting_reward = percent(VESTING_FUND_PERCENT);
            let witness_reward = if has_producer {
                new_steem - content_reward - vesting_reward
            } else {
                0
            };
            let minted = Asset::steem(content_reward + vesting_reward + witness_reward);

            self.update_props(|p| {
                add_to(&mut p.total_vesting_fund_steem, Asset::steem(vesting_reward))?;
                if !reward_funds {
                    add_to(&mut p.total_reward_fund_steem, Asset::steem(content_reward))?;
                }
                add_to(&mut p.current_supply, minted)?;
                add_to(&mut p.virtual_supply, minted)?;
                Ok(())
            })?;
            if witness_reward > 0 {
                self.create_vesting(&producer, Asset::steem(witness_reward))?;
            }
            return Ok(());
        }

        let virtual_supply = props.virtual_supply.amount;
        let (content_reward, curate_reward) = if props.head_block_number > START_VESTING_BLOCK {
            (
                percent_reward_per_block(virtual_supply, CONTENT_APR_PERCENT).max(MIN_CONTENT_REWARD),
                percent_reward_per_block(virtual_supply, CURATE_APR_PERCENT).max(MIN_CURATE_REWARD),
            )
        } else {
            (BOOTSTRAP_CONTENT_REWARD, BOOTSTRAP_CURATE_REWARD)
        };

        let witness_pay = if has_producer {
            let pay = percent_reward_per_block(virtual_supply, PRODUCER_APR_PERCENT)
                .max(MIN_PRODUCER_REWARD);
            self.create_vesting(&producer, Asset::steem(pay))?;
            pay
        } else {
            0
        };

        let vesting_reward = if props.head_block_number < START_VESTING_BLOCK {
            0
        } else {
            (content_reward + curate_reward + witness_pay) * 9
        };
        let content_total = Asset::steem(content_reward + curate_reward);
        let minted = Asset::steem(content_reward + curate_reward + witness_pay + vesting_reward);

        self.update_props(|p| {
            add_to(&mut p.total_vesting_fund_steem, Asset::steem(vesting_reward))?;
            add_to(&mut p.total_reward_fund_steem, content_total)?;
            add_to(&mut p.current_supply, minted)?;
            add_to(&mut p.virtual_supply, minted)?;
            Ok(())
        })
    }

    fn process_savings_withdraws(&mut self) -> Result<(), ChainError> {
        let now = self.head_block_time()?;
        let completed = due::<SavingsWithdraw, _>(
            &self.db,
            SavingsWithdraw::BY_COMPLETE_FROM_RID,
            |w| w.complete <= now,
        );

        for withdraw in completed {
            self.adjust_balance(&withdraw.to, withdraw.amount)?;
            self.update_account(&withdraw.from, |a| {
                a.savings_withdraw_requests = a.savings_withdraw_requests.saturating_sub(1);
                Ok(())
            })?;
            self.db.remove::<SavingsWithdraw>(withdraw.id)?;
            self.push_virtual_operation(VirtualOperation::FillTransferFromSavings {
                from: withdraw.from,
                to: withdraw.to,
                amount: withdraw.amount,
                request_id: withdraw.request_id,
                memo: withdraw.memo,
            });
        }
        Ok(())
    }

    fn account_recovery_processing(&mut self) -> Result<(), ChainError> {
        let now = self.head_block_time()?;

        let expired = due::<AccountRecoveryRequest, _>(
            &self.db,
            AccountRecoveryRequest::BY_EXPIRATION,
            |r| r.expires <= now,
        );
        for request in expired {
            self.db.remove::<AccountRecoveryRequest>(request.id)?;
        }

        let stale = due::<OwnerAuthorityHistory, _>(
            &self.db,
            OwnerAuthorityHistory::BY_LAST_VALID,
            |h| h.last_valid_time.plus(OWNER_AUTH_RECOVERY_PERIOD) < now,
        );
        for history in stale {
            self.db.remove::<OwnerAuthorityHistory>(history.id)?;
        }

        let effective = due::<ChangeRecoveryAccountRequest, _>(
            &self.db,
            ChangeRecoveryAccountRequest::BY_EFFECTIVE_DATE,
            |r| r.effective_on <= now,
        );
        for request in effective {
            self.update_account(&request.account_to_recover, |a| {
                a.recovery_account = request.recovery_account.clone();
                Ok(())
            })?;
            self.db.remove::<ChangeRecoveryAccountRequest>(request.id)?;
        }
        Ok(())
    }

    fn clear_expired_delegations(&mut self) -> Result<(), ChainError> {
        let now = self.head_block_time()?;
        let expired = due::<VestingDelegationExpiration, _>(
            &self.db,
            VestingDelegationExpiration::BY_EXPIRATION,
            |e| e.expiration < now,
        );

        for expiration in expired {
            self.update_account(&expiration.delegator, |a| {
                sub_from(&mut a.delegated_vesting_shares, expiration.vesting_shares)?;
                Ok(())
            })?;
            self.push_virtual_operation(VirtualOperation::ReturnVestingDelegation {
                account: expiration.delegator.clone(),
                vesting_shares: expiration.vesting_shares,
            });
            self.db.remove::<VestingDelegationExpiration>(expiration.id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::constants::{SECONDS_PER_YEAR, SBD_INTEREST_COMPOUND_INTERVAL_SEC};
    use crate::domain::invariants::validate_invariants;
    use crate::domain::{ChainVersion, Price, Timestamp};
    use crate::policies::test_support::{advance_time, make_account, state, GENESIS_TIME};

    fn give_sbd(state: &mut ChainState, name: &AccountName, amount: i64) {
        state
            .update_account(name, |a| {
                a.sbd_balance = Asset::sbd(amount);
                Ok(())
            })
            .unwrap();
        state
            .modify_props(|p| p.current_sbd_supply.amount += amount)
            .unwrap();
    }

    #[test]
    fn test_adjust_steem_balance() {
        let mut state = state();
        let alice = make_account(&mut state, "alice", 100);
        state.adjust_balance(&alice, Asset::steem(-40)).unwrap();
        assert_eq!(state.get_balance(&alice, Symbol::Steem).unwrap(), Asset::steem(60));
    }

    #[test]
    fn test_overdraft_is_rejected() {
        let mut state = state();
        let alice = make_account(&mut state, "alice", 10);
        let err = state.adjust_balance(&alice, Asset::steem(-11)).unwrap_err();
        assert!(matches!(
            err,
            ChainError::Validation(ValidationError::InsufficientFunds { .. })
        ));
        assert_eq!(state.account(&alice).unwrap().balance, Asset::steem(10));
    }

    #[test]
    fn test_one_year_of_interest_at_ten_percent() {
        let mut state = state();
        state.modify_props(|p| p.sbd_interest_rate = 1000).unwrap();
        let alice = make_account(&mut state, "alice", 0);
        give_sbd(&mut state, &alice, 1_000_000);

        advance_time(&mut state, SECONDS_PER_YEAR as u32);
        state.adjust_balance(&alice, Asset::sbd(0)).unwrap();

        let account = state.account(&alice).unwrap();
        assert_eq!(account.sbd_balance, Asset::sbd(1_100_000));
        assert_eq!(account.sbd_seconds, 0);
        assert_eq!(
            state.props().unwrap().current_sbd_supply,
            Asset::sbd(1_100_000)
        );
        assert_eq!(
            state.virtual_operations(),
            &[VirtualOperation::Interest {
                owner: alice,
                interest: Asset::sbd(100_000),
            }]
        );
    }

    #[test]
    fn test_no_interest_within_compounding_interval() {
        let mut state = state();
        state.modify_props(|p| p.sbd_interest_rate = 1000).unwrap();
        let alice = make_account(&mut state, "alice", 0);
        give_sbd(&mut state, &alice, 1_000);

        advance_time(&mut state, SBD_INTEREST_COMPOUND_INTERVAL_SEC);
        state.adjust_balance(&alice, Asset::sbd(5)).unwrap();

        let account = state.account(&alice).unwrap();
        assert_eq!(account.sbd_balance, Asset::sbd(1_005));
        assert_eq!(
            account.sbd_seconds,
            1_000 * u128::from(SBD_INTEREST_COMPOUND_INTERVAL_SEC)
        );
        assert!(state.virtual_operations().is_empty());
    }

    #[test]
    fn test_savings_sbd_accrues_without_interest() {
        let mut state = state();
        state.modify_props(|p| p.sbd_interest_rate = 1000).unwrap();
        let alice = make_account(&mut state, "alice", 0);
        state.adjust_savings_balance(&alice, Asset::sbd(500)).unwrap();
        advance_time(&mut state, SECONDS_PER_YEAR as u32);
        state.adjust_savings_balance(&alice, Asset::sbd(0)).unwrap();

        let account = state.account(&alice).unwrap();
        assert_eq!(account.savings_sbd_balance, Asset::sbd(500));
        assert_eq!(account.savings_sbd_seconds, 500 * u128::from(SECONDS_PER_YEAR));
        assert!(state.virtual_operations().is_empty());
    }

    #[test]
    fn test_vests_are_not_a_liquid_balance() {
        let mut state = state();
        let alice = make_account(&mut state, "alice", 0);
        assert!(state.adjust_balance(&alice, Asset::vests(1)).is_err());
        assert!(state.get_balance(&alice, Symbol::Vests).is_err());
    }

    #[test]
    fn test_update_owner_authority_keeps_history() {
        let mut state = state();
        state.modify_props(|p| p.head_block_number = 10).unwrap();
        let alice = make_account(&mut state, "alice", 0);
        state
            .db
            .create(AccountAuthority {
                id: ObjectId::default(),
                account: alice.clone(),
                owner: Authority::from_key("OLD"),
                active: Authority::from_key("OLD"),
                posting: Authority::from_key("OLD"),
                last_owner_update: Timestamp::MIN,
            })
            .unwrap();

        state
            .update_owner_authority(&alice, Authority::from_key("NEW"))
            .unwrap();

        let history: Vec<_> = state.db.all::<OwnerAuthorityHistory>().collect();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].previous_owner_authority, Authority::from_key("OLD"));
        let auth = state
            .db
            .get_by::<AccountAuthority>(AccountAuthority::BY_ACCOUNT, &name_key(&alice))
            .unwrap();
        assert_eq!(auth.owner, Authority::from_key("NEW"));
        assert_eq!(state.account(&alice).unwrap().last_owner_update, GENESIS_TIME);
    }

    #[test]
    fn test_null_account_balance_is_burned() {
        let mut state = state();
        state.set_version(ChainVersion::hardfork(hardfork::BURN_NULL_ACCOUNT));
        make_account(&mut state, "alice", 1_000);
        let null = make_account(&mut state, NULL_ACCOUNT, 250);

        state.clear_null_account_balance().unwrap();

        assert_eq!(state.account(&null).unwrap().balance, Asset::steem(0));
        assert_eq!(state.props().unwrap().current_supply, Asset::steem(1_000));
        validate_invariants(&state.db).unwrap();
    }

    #[test]
    fn test_pay_fee_burns_supply() {
        let mut state = state();
        let alice = make_account(&mut state, "alice", 100);
        state.pay_fee(&alice, Asset::steem(30)).unwrap();
        assert_eq!(state.account(&alice).unwrap().balance, Asset::steem(70));
        assert_eq!(state.props().unwrap().current_supply, Asset::steem(70));
        validate_invariants(&state.db).unwrap();
    }

    #[test]
    fn test_unratified_escrow_is_refunded() {
        let mut state = state();
        let alice = make_account(&mut state, "alice", 0);
        state
            .db
            .create(Escrow {
                id: ObjectId::default(),
                escrow_id: 7,
                from: alice.clone(),
                to: "bob".into(),
                agent: "carol".into(),
                ratification_deadline: GENESIS_TIME.plus(10),
                escrow_expiration: GENESIS_TIME.plus(100),
                sbd_balance: Asset::sbd(0),
                steem_balance: Asset::steem(40),
                pending_fee: Asset::steem(2),
                to_approved: true,
                agent_approved: false,
                disputed: false,
            })
            .unwrap();
        state.modify_props(|p| p.current_supply.amount += 42).unwrap();

        state.expire_escrow_ratification().unwrap();
        assert_eq!(state.db.count::<Escrow>(), 1);

        advance_time(&mut state, 10);
        state.expire_escrow_ratification().unwrap();
        assert_eq!(state.db.count::<Escrow>(), 0);
        assert_eq!(state.account(&alice).unwrap().balance, Asset::steem(42));
        validate_invariants(&state.db).unwrap();
    }

    #[test]
    fn test_narrowing_inflation_funds() {
        let mut state = state();
        state.set_version(ChainVersion::hardfork(hardfork::NARROWING_INFLATION));
        let witness = make_account(&mut state, "witness", 1_000_000_000_000);
        state
            .modify_props(|p| p.current_witness = witness.clone())
            .unwrap();

        state.process_funds().unwrap();

        let props = state.props().unwrap();
        let minted = new_steem_per_block(1_000_000_000_000, inflation_rate(0));
        assert_eq!(props.current_supply.amount, 1_000_000_000_000 + minted);
        assert_eq!(
            props.total_reward_fund_steem.amount,
            minted * CONTENT_REWARD_PERCENT / i64::from(PERCENT_100)
        );
        assert!(state.account(&witness).unwrap().vesting_shares.amount > 0);
        validate_invariants(&state.db).unwrap();
    }

    #[test]
    fn test_legacy_funds_during_bootstrap() {
        let mut state = state();
        let witness = make_account(&mut state, "witness", 1_000);
        state
            .modify_props(|p| p.current_witness = witness.clone())
            .unwrap();

        state.process_funds().unwrap();

        let props = state.props().unwrap();
        assert_eq!(
            props.total_reward_fund_steem,
            Asset::steem(BOOTSTRAP_CONTENT_REWARD + BOOTSTRAP_CURATE_REWARD)
        );
        assert_eq!(props.total_vesting_fund_steem, Asset::steem(MIN_PRODUCER_REWARD));
        validate_invariants(&state.db).unwrap();
    }

    #[test]
    fn test_savings_withdraw_completes() {
        let mut state = state();
        let alice = make_account(&mut state, "alice", 0);
        let bob = make_account(&mut state, "bob", 0);
        state
            .update_account(&alice, |a| {
                a.savings_withdraw_requests = 1;
                Ok(())
            })
            .unwrap();
        state
            .db
            .create(SavingsWithdraw {
                id: ObjectId::default(),
                from: alice.clone(),
                to: bob.clone(),
                memo: "rent".into(),
                request_id: 3,
                amount: Asset::steem(25),
                complete: GENESIS_TIME.plus(5),
            })
            .unwrap();
        state.modify_props(|p| p.current_supply.amount += 25).unwrap();

        advance_time(&mut state, 5);
        state.process_savings_withdraws().unwrap();

        assert_eq!(state.account(&bob).unwrap().balance, Asset::steem(25));
        assert_eq!(state.account(&alice).unwrap().savings_withdraw_requests, 0);
        assert_eq!(state.virtual_operations().len(), 1);
        validate_invariants(&state.db).unwrap();
    }

    #[test]
    fn test_recovery_processing_sweeps() {
        let mut state = state();
        let alice = make_account(&mut state, "alice", 0);
        state
            .db
            .create(AccountRecoveryRequest {
                id: ObjectId::default(),
                account_to_recover: alice.clone(),
                new_owner_authority: Authority::from_key("K"),
                expires: GENESIS_TIME,
            })
            .unwrap();
        state
            .db
            .create(ChangeRecoveryAccountRequest {
                id: ObjectId::default(),
                account_to_recover: alice.clone(),
                recovery_account: "carol".into(),
                effective_on: GENESIS_TIME,
            })
            .unwrap();

        state.account_recovery_processing().unwrap();

        assert_eq!(state.db.count::<AccountRecoveryRequest>(), 0);
        assert_eq!(state.db.count::<ChangeRecoveryAccountRequest>(), 0);
        assert_eq!(
            state.account(&alice).unwrap().recovery_account,
            AccountName::from("carol")
        );
    }

    #[test]
    fn test_expired_delegation_returns_shares() {
        let mut state = state();
        let alice = make_account(&mut state, "alice", 0);
        state
            .update_account(&alice, |a| {
                a.delegated_vesting_shares = Asset::vests(500);
                Ok(())
            })
            .unwrap();
        state
            .db
            .create(VestingDelegationExpiration {
                id: ObjectId::default(),
                delegator: alice.clone(),
                vesting_shares: Asset::vests(500),
                expiration: GENESIS_TIME,
            })
            .unwrap();

        state.clear_expired_delegations().unwrap();
        assert_eq!(state.db.count::<VestingDelegationExpiration>(), 1);

        advance_time(&mut state, 1);
        state.clear_expired_delegations().unwrap();
        assert_eq!(state.db.count::<VestingDelegationExpiration>(), 0);
        assert_eq!(
            state.account(&alice).unwrap().delegated_vesting_shares,
            Asset::vests(0)
        );
        assert!(matches!(
            state.virtual_operations(),
            [VirtualOperation::ReturnVestingDelegation { .. }]
        ));
    }

    #[test]
    fn test_interest_adds_virtual_supply_at_median() {
        let mut state = state();
        state.modify_props(|p| p.sbd_interest_rate = PERCENT_100).unwrap();
        state
            .db
            .modify_singleton::<crate::domain::FeedHistory, _>(|f| {
                f.current_median_history = Price::new(Asset::sbd(1), Asset::steem(2)).unwrap();
            })
            .unwrap();
        let alice = make_account(&mut state, "alice", 0);
        give_sbd(&mut state, &alice, 1_000);
        advance_time(&mut state, SECONDS_PER_YEAR as u32);

        let before = state.props().unwrap().virtual_supply;
        state.adjust_balance(&alice, Asset::sbd(0)).unwrap();
        let after = state.props().unwrap().virtual_supply;
        assert_eq!(after.amount - before.amount, 2_000);
    }
}
