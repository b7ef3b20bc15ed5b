//! Power-downs, withdraw routes and vesting delegation.

use super::{require_funds, Disabled, EvaluationContext, EvaluatorRegistry};
use crate::domain::constants::{
    CASHOUT_WINDOW_SECONDS, MAX_WITHDRAW_ROUTES, PERCENT_100, VESTING_WITHDRAW_INTERVALS,
    VESTING_WITHDRAW_INTERVALS_PRE_HF16, VESTING_WITHDRAW_INTERVAL_SECONDS,
};
use crate::domain::hardfork;
use crate::domain::{
    ensure, Asset, ChainError, ChainVersion, DelegateVestingSharesOperation, ObjectId,
    OperationKind, SetWithdrawVestingRouteOperation, Timestamp, VersionRange, VestingDelegation,
    VestingDelegationExpiration, WithdrawVestingOperation, WithdrawVestingRoute,
};
use crate::policies::{add_to, sub_from};
use crate::state::ChainState;
use crate::store::KeyPart;

pub(super) fn register(registry: &mut EvaluatorRegistry) -> Result<(), ChainError> {
    let short_power_down = ChainVersion::hardfork(hardfork::SHORT_POWER_DOWN);
    let delegation = ChainVersion::hardfork(hardfork::VESTING_DELEGATION);

    registry.register_fn(
        VersionRange::until(short_power_down),
        withdraw_vesting::<VESTING_WITHDRAW_INTERVALS_PRE_HF16>,
    )?;
    registry.register_fn(
        VersionRange::from(short_power_down),
        withdraw_vesting::<VESTING_WITHDRAW_INTERVALS>,
    )?;
    registry.register_fn(VersionRange::always(), set_withdraw_vesting_route)?;
    registry.register(
        VersionRange::until(delegation),
        Disabled {
            kind: OperationKind::DelegateVestingShares,
            required: hardfork::VESTING_DELEGATION,
        },
    )?;
    registry.register_fn(VersionRange::from(delegation), delegate_vesting_shares)?;
    Ok(())
}

/// Account creation fee converted to vesting shares, times `multiplier`.
fn fee_in_vests(state: &ChainState, multiplier: i64) -> Result<Asset, ChainError> {
    let fee = state.witness_schedule()?.median_props.account_creation_fee;
    let price = state.props()?.vesting_share_price()?;
    Ok(Asset::steem(fee.amount * multiplier).mul_price(&price)?)
}

fn withdraw_vesting<const INTERVALS: i64>(
    ctx: &mut EvaluationContext<'_>,
    op: &WithdrawVestingOperation,
) -> Result<(), ChainError> {
    let strict = ctx.producing || ctx.state.has_hardfork(hardfork::REJECT_NOOP_WITHDRAW);
    let state = &mut *ctx.state;
    let account = state.account(&op.account)?.clone();

    let withdrawable = account
        .vesting_shares
        .checked_sub(&account.delegated_vesting_shares)?;
    require_funds(&account.name, withdrawable, op.vesting_shares)?;

    if !account.mined && state.has_hardfork(hardfork::POWER_DOWN_MIN_VESTS) {
        let min_vests = fee_in_vests(state, 10)?;
        ensure(
            account.vesting_shares.amount > min_vests.amount
                || (state.has_hardfork(hardfork::ZERO_POWER_DOWN_UNMINED)
                    && op.vesting_shares.amount == 0),
            "Account registered by another account requires 10x account creation fee worth of vesting shares before it can be powered down.",
        )?;
    }

    if op.vesting_shares.amount == 0 {
        if strict {
            ensure(
                account.vesting_withdraw_rate.amount != 0,
                "This operation would not change the vesting withdraw rate.",
            )?;
        }
        return state.update_account(&op.account, |a| {
            a.vesting_withdraw_rate = Asset::vests(0);
            a.next_vesting_withdrawal = Timestamp::MAX;
            a.to_withdraw = 0;
            a.withdrawn = 0;
            Ok(())
        });
    }

    let rate = Asset::vests((op.vesting_shares.amount / INTERVALS).max(1));
    if strict {
        ensure(
            account.vesting_withdraw_rate != rate,
            "This operation would not change the vesting withdraw rate.",
        )?;
    }

    let next = state.head_block_time()?.plus(VESTING_WITHDRAW_INTERVAL_SECONDS);
    tracing::debug!(account = %op.account, rate = %rate, "power down scheduled");
    state.update_account(&op.account, |a| {
        a.vesting_withdraw_rate = rate;
        a.next_vesting_withdrawal = next;
        a.to_withdraw = op.vesting_shares.amount;
        a.withdrawn = 0;
        Ok(())
    })
}

fn set_withdraw_vesting_route(
    ctx: &mut EvaluationContext<'_>,
    op: &SetWithdrawVestingRouteOperation,
) -> Result<(), ChainError> {
    let state = &mut *ctx.state;
    let routes = state.account(&op.from_account)?.withdraw_routes;
    state.account(&op.to_account)?;

    let key = WithdrawVestingRoute::route_key(&op.from_account, &op.to_account);
    let existing = state
        .db
        .find_by::<WithdrawVestingRoute>(WithdrawVestingRoute::BY_WITHDRAW_ROUTE, &key)
        .map(|route| route.id);

    match existing {
        None => {
            ensure(op.percent != 0, "Cannot create a 0% destination.")?;
            ensure(
                routes < MAX_WITHDRAW_ROUTES,
                "Account already has the maximum number of routes.",
            )?;
            state.db.create(WithdrawVestingRoute {
                id: ObjectId::default(),
                from_account: op.from_account.clone(),
                to_account: op.to_account.clone(),
                percent: op.percent,
                auto_vest: op.auto_vest,
            })?;
            state.update_account(&op.from_account, |a| {
                a.withdraw_routes += 1;
                Ok(())
            })?;
        }
        Some(id) if op.percent == 0 => {
            state.db.remove::<WithdrawVestingRoute>(id)?;
            state.update_account(&op.from_account, |a| {
                a.withdraw_routes = a.withdraw_routes.saturating_sub(1);
                Ok(())
            })?;
        }
        Some(id) => {
            state.db.modify::<WithdrawVestingRoute, _>(id, |route| {
                route.percent = op.percent;
                route.auto_vest = op.auto_vest;
            })?;
        }
    }

    let total_percent: u32 = state
        .db
        .prefix::<WithdrawVestingRoute>(
            WithdrawVestingRoute::BY_WITHDRAW_ROUTE,
            vec![KeyPart::from(&op.from_account)],
        )
        .map(|route| u32::from(route.percent))
        .sum();
    ensure(
        total_percent <= u32::from(PERCENT_100),
        "More than 100% of vesting withdrawals allocated to destinations.",
    )
}

fn delegate_vesting_shares(
    ctx: &mut EvaluationContext<'_>,
    op: &DelegateVestingSharesOperation,
) -> Result<(), ChainError> {
    let state = &mut *ctx.state;
    let delegator = state.account(&op.delegator)?.clone();
    state.account(&op.delegatee)?;

    let available = Asset::vests(delegator.available_vesting_shares());
    let min_delegation = fee_in_vests(state, 10)?;
    let min_update = fee_in_vests(state, 1)?;
    let now = state.head_block_time()?;

    let key = VestingDelegation::delegation_key(&op.delegator, &op.delegatee);
    let delegation = state
        .db
        .find_by::<VestingDelegation>(VestingDelegation::BY_DELEGATION, &key)
        .cloned();

    match delegation {
        None => {
            require_funds(&op.delegator, available, op.vesting_shares)?;
            ensure(
                op.vesting_shares.amount >= min_delegation.amount,
                format!("Account must delegate a minimum of {min_delegation}"),
            )?;

            state.db.create(VestingDelegation {
                id: ObjectId::default(),
                delegator: op.delegator.clone(),
                delegatee: op.delegatee.clone(),
                vesting_shares: op.vesting_shares,
                min_delegation_time: now,
            })?;
            state.update_account(&op.delegator, |a| {
                add_to(&mut a.delegated_vesting_shares, op.vesting_shares)?;
                Ok(())
            })?;
            state.update_account(&op.delegatee, |a| {
                add_to(&mut a.received_vesting_shares, op.vesting_shares)?;
                Ok(())
            })?;
        }
        Some(delegation) if op.vesting_shares.amount >= delegation.vesting_shares.amount => {
            let delta = op.vesting_shares.checked_sub(&delegation.vesting_shares)?;
            ensure(
                delta.amount >= min_update.amount,
                format!("Vesting share increase is not enough of a difference. min_update: {min_update}"),
            )?;
            require_funds(&op.delegator, available, delta)?;

            state.update_account(&op.delegator, |a| {
                add_to(&mut a.delegated_vesting_shares, delta)?;
                Ok(())
            })?;
            state.update_account(&op.delegatee, |a| {
                add_to(&mut a.received_vesting_shares, delta)?;
                Ok(())
            })?;
            state.db.modify::<VestingDelegation, _>(delegation.id, |d| {
                d.vesting_shares = op.vesting_shares;
            })?;
        }
        Some(delegation) => {
            let delta = delegation.vesting_shares.checked_sub(&op.vesting_shares)?;
            ensure(
                delta.amount >= min_update.amount,
                format!("Vesting share decrease is not enough of a difference. min_update: {min_update}"),
            )?;
            ensure(
                op.vesting_shares.amount >= min_delegation.amount || op.vesting_shares.amount == 0,
                format!(
                    "Delegation must be removed or leave minimum delegation amount of {min_delegation}"
                ),
            )?;

            // delegated shares stay locked for the delegator until the
            // expiration returns them
            state.db.create(VestingDelegationExpiration {
                id: ObjectId::default(),
                delegator: op.delegator.clone(),
                vesting_shares: delta,
                expiration: now
                    .plus(CASHOUT_WINDOW_SECONDS)
                    .max(delegation.min_delegation_time),
            })?;
            state.update_account(&op.delegatee, |a| {
                sub_from(&mut a.received_vesting_shares, delta)?;
                Ok(())
            })?;

            if op.vesting_shares.amount > 0 {
                state.db.modify::<VestingDelegation, _>(delegation.id, |d| {
                    d.vesting_shares = op.vesting_shares;
                })?;
            } else {
                state.db.remove::<VestingDelegation>(delegation.id)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountName, ChainError, ValidationError};
    use crate::evaluators::test_support::apply;
    use crate::policies::test_support::{make_account, state, GENESIS_TIME};
    use crate::policies::AccountPolicy;

    fn give_vests(state: &mut ChainState, name: &AccountName, vests: i64) {
        state
            .update_account(name, |a| {
                a.vesting_shares = Asset::vests(vests);
                Ok(())
            })
            .unwrap();
        state
            .modify_props(|p| {
                p.total_vesting_shares.amount += vests;
                p.total_vesting_fund_steem.amount += vests / 1_000;
            })
            .unwrap();
    }

    fn withdraw(account: &AccountName, vests: i64) -> WithdrawVestingOperation {
        WithdrawVestingOperation {
            account: account.clone(),
            vesting_shares: Asset::vests(vests),
        }
    }

    fn delegate(from: &AccountName, to: &AccountName, vests: i64) -> DelegateVestingSharesOperation {
        DelegateVestingSharesOperation {
            delegator: from.clone(),
            delegatee: to.clone(),
            vesting_shares: Asset::vests(vests),
        }
    }

    #[test]
    fn test_withdraw_rate_uses_interval_count() {
        let mut state = state();
        let alice = make_account(&mut state, "alice", 0);
        give_vests(&mut state, &alice, 1_040_000);

        apply(&mut state, withdraw(&alice, 1_040_000)).unwrap();
        let account = state.account(&alice).unwrap();
        assert_eq!(account.vesting_withdraw_rate, Asset::vests(10_000));
        assert_eq!(account.to_withdraw, 1_040_000);
        assert_eq!(
            account.next_vesting_withdrawal,
            GENESIS_TIME.plus(VESTING_WITHDRAW_INTERVAL_SECONDS)
        );

        state.set_version(ChainVersion::hardfork(hardfork::SHORT_POWER_DOWN));
        apply(&mut state, withdraw(&alice, 1_300_000 / 2)).unwrap();
        assert_eq!(
            state.account(&alice).unwrap().vesting_withdraw_rate,
            Asset::vests(50_000)
        );
    }

    #[test]
    fn test_withdraw_rate_floor_is_one() {
        let mut state = state();
        let alice = make_account(&mut state, "alice", 0);
        give_vests(&mut state, &alice, 100);
        apply(&mut state, withdraw(&alice, 5)).unwrap();
        assert_eq!(state.account(&alice).unwrap().vesting_withdraw_rate, Asset::vests(1));
    }

    #[test]
    fn test_withdraw_more_than_owned() {
        let mut state = state();
        let alice = make_account(&mut state, "alice", 0);
        give_vests(&mut state, &alice, 100);
        let err = apply(&mut state, withdraw(&alice, 101)).unwrap_err();
        assert!(matches!(
            err,
            ChainError::Validation(ValidationError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn test_noop_withdraw_rejected_after_hardfork() {
        let mut state = state();
        let alice = make_account(&mut state, "alice", 0);
        give_vests(&mut state, &alice, 100);

        apply(&mut state, withdraw(&alice, 0)).unwrap();
        state.set_version(ChainVersion::hardfork(hardfork::REJECT_NOOP_WITHDRAW));
        let err = apply(&mut state, withdraw(&alice, 0)).unwrap_err();
        assert!(err.to_string().contains("would not change"));
    }

    #[test]
    fn test_unmined_account_needs_minimum_vests() {
        let mut state = state();
        state.set_version(ChainVersion::hardfork(hardfork::POWER_DOWN_MIN_VESTS));
        let alice = make_account(&mut state, "alice", 0);
        give_vests(&mut state, &alice, 5_000);
        state
            .update_account(&alice, |a| {
                a.mined = false;
                Ok(())
            })
            .unwrap();

        let err = apply(&mut state, withdraw(&alice, 1_000)).unwrap_err();
        assert!(err.to_string().contains("10x account creation fee"));
    }

    #[test]
    fn test_routes_capped_at_hundred_percent() {
        let mut state = state();
        let alice = make_account(&mut state, "alice", 0);
        let bob = make_account(&mut state, "bob", 0);
        let carol = make_account(&mut state, "carol", 0);
        let route = |to: &AccountName, percent| SetWithdrawVestingRouteOperation {
            from_account: alice.clone(),
            to_account: to.clone(),
            percent,
            auto_vest: false,
        };

        apply(&mut state, route(&bob, 6_000)).unwrap();
        let err = apply(&mut state, route(&carol, 5_000)).unwrap_err();
        assert!(err.to_string().contains("More than 100%"));
        assert_eq!(state.account(&alice).unwrap().withdraw_routes, 1);

        apply(&mut state, route(&bob, 0)).unwrap();
        assert_eq!(state.account(&alice).unwrap().withdraw_routes, 0);
        assert_eq!(state.db.count::<WithdrawVestingRoute>(), 0);
    }

    #[test]
    fn test_delegation_disabled_before_hardfork() {
        let mut state = state();
        let alice = make_account(&mut state, "alice", 0);
        let bob = make_account(&mut state, "bob", 0);
        let err = apply(&mut state, delegate(&alice, &bob, 1)).unwrap_err();
        assert_eq!(
            err,
            ChainError::Validation(ValidationError::HardforkNotActive {
                required: hardfork::VESTING_DELEGATION
            })
        );
    }

    #[test]
    fn test_delegation_lifecycle() {
        let mut state = state();
        state.set_version(ChainVersion::hardfork(hardfork::VESTING_DELEGATION));
        let alice = make_account(&mut state, "alice", 0);
        let bob = make_account(&mut state, "bob", 0);
        give_vests(&mut state, &alice, 100_000);

        // minimum is ten times the 1 STEEM fee at 1000 VESTS per STEEM
        assert!(apply(&mut state, delegate(&alice, &bob, 9_999)).is_err());
        apply(&mut state, delegate(&alice, &bob, 20_000)).unwrap();
        assert_eq!(
            state.account(&alice).unwrap().delegated_vesting_shares,
            Asset::vests(20_000)
        );
        assert_eq!(
            state.account(&bob).unwrap().received_vesting_shares,
            Asset::vests(20_000)
        );

        apply(&mut state, delegate(&alice, &bob, 30_000)).unwrap();
        assert_eq!(
            state.account(&bob).unwrap().effective_vesting_shares(),
            Asset::vests(30_000)
        );

        apply(&mut state, delegate(&alice, &bob, 0)).unwrap();
        assert_eq!(state.db.count::<VestingDelegation>(), 0);
        assert_eq!(
            state.account(&bob).unwrap().received_vesting_shares,
            Asset::vests(0)
        );
        // still locked until the expiration is processed
        assert_eq!(
            state.account(&alice).unwrap().delegated_vesting_shares,
            Asset::vests(30_000)
        );

        let expiration = state.db.all::<VestingDelegationExpiration>().next().unwrap();
        assert_eq!(expiration.expiration, GENESIS_TIME.plus(CASHOUT_WINDOW_SECONDS));
        crate::policies::test_support::advance_time(&mut state, CASHOUT_WINDOW_SECONDS + 1);
        state.clear_expired_delegations().unwrap();
        assert_eq!(
            state.account(&alice).unwrap().delegated_vesting_shares,
            Asset::vests(0)
        );
    }

    #[test]
    fn test_delegation_beyond_available_shares() {
        let mut state = state();
        state.set_version(ChainVersion::hardfork(hardfork::VESTING_DELEGATION));
        let alice = make_account(&mut state, "alice", 0);
        let bob = make_account(&mut state, "bob", 0);
        give_vests(&mut state, &alice, 15_000);

        let err = apply(&mut state, delegate(&alice, &bob, 20_000)).unwrap_err();
        assert!(matches!(
            err,
            ChainError::Validation(ValidationError::InsufficientFunds { .. })
        ));
    }
}
