//! Internal STEEM/SBD exchange.

use super::{require_funds, EvaluationContext, EvaluatorRegistry};
use crate::domain::{
    ensure, AccountName, Asset, ChainError, LimitOrder, LimitOrderCancelOperation,
    LimitOrderCreate2Operation, LimitOrderCreateOperation, ObjectId, Price, Timestamp,
    ValidationError, VersionRange,
};
use crate::policies::{AccountPolicy, OrderPolicy};

pub(super) fn register(registry: &mut EvaluatorRegistry) -> Result<(), ChainError> {
    registry.register_fn(VersionRange::always(), limit_order_create)?;
    registry.register_fn(VersionRange::always(), limit_order_create2)?;
    registry.register_fn(VersionRange::always(), limit_order_cancel)?;
    Ok(())
}

/// Order parameters shared by both create forms.
struct NewOrder<'a> {
    owner: &'a AccountName,
    orderid: u32,
    amount_to_sell: Asset,
    sell_price: Price,
    fill_or_kill: bool,
    expiration: Timestamp,
}

fn place_order(ctx: &mut EvaluationContext<'_>, order: NewOrder<'_>) -> Result<(), ChainError> {
    let state = &mut *ctx.state;
    let now = state.head_block_time()?;
    ensure(
        order.expiration > now,
        "Limit order has to expire after head block time.",
    )?;
    let available = state.get_balance(order.owner, order.amount_to_sell.symbol)?;
    require_funds(order.owner, available, order.amount_to_sell)?;

    state.adjust_balance(order.owner, -order.amount_to_sell)?;
    let orderid = state.order_id_key(order.orderid);
    let id = state.db.create(LimitOrder {
        id: ObjectId::default(),
        created: now,
        expiration: order.expiration,
        seller: order.owner.clone(),
        orderid,
        for_sale: order.amount_to_sell.amount,
        sell_price: order.sell_price,
    })?;

    let filled = state.apply_order(id)?;
    if order.fill_or_kill && !filled {
        return Err(ValidationError::OrderNotFilled {
            seller: order.owner.clone(),
            order_id: order.orderid,
        }
        .into());
    }
    Ok(())
}

fn limit_order_create(
    ctx: &mut EvaluationContext<'_>,
    op: &LimitOrderCreateOperation,
) -> Result<(), ChainError> {
    place_order(
        ctx,
        NewOrder {
            owner: &op.owner,
            orderid: op.orderid,
            amount_to_sell: op.amount_to_sell,
            sell_price: op.sell_price(),
            fill_or_kill: op.fill_or_kill,
            expiration: op.expiration,
        },
    )
}

fn limit_order_create2(
    ctx: &mut EvaluationContext<'_>,
    op: &LimitOrderCreate2Operation,
) -> Result<(), ChainError> {
    place_order(
        ctx,
        NewOrder {
            owner: &op.owner,
            orderid: op.orderid,
            amount_to_sell: op.amount_to_sell,
            sell_price: op.exchange_rate,
            fill_or_kill: op.fill_or_kill,
            expiration: op.expiration,
        },
    )
}

fn limit_order_cancel(
    ctx: &mut EvaluationContext<'_>,
    op: &LimitOrderCancelOperation,
) -> Result<(), ChainError> {
    let id = ctx.state.get_limit_order(&op.owner, op.orderid)?.id;
    ctx.state.cancel_order(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::hardfork;
    use crate::domain::{ChainVersion, VirtualOperation};
    use crate::evaluators::test_support::apply;
    use crate::policies::test_support::{make_account, state, GENESIS_TIME};
    use crate::state::ChainState;

    fn market() -> (ChainState, AccountName, AccountName) {
        let mut state = state();
        state.set_version(ChainVersion::hardfork(hardfork::NO_LIQUIDITY_REWARD));
        let alice = make_account(&mut state, "alice", 1_000);
        let bob = make_account(&mut state, "bob", 0);
        state.adjust_balance(&bob, Asset::sbd(1_000)).unwrap();
        state
            .modify_props(|p| p.current_sbd_supply.amount += 1_000)
            .unwrap();
        (state, alice, bob)
    }

    fn sell(
        owner: &AccountName,
        orderid: u32,
        amount: Asset,
        receive: Asset,
        fill_or_kill: bool,
    ) -> LimitOrderCreateOperation {
        LimitOrderCreateOperation {
            owner: owner.clone(),
            orderid,
            amount_to_sell: amount,
            min_to_receive: receive,
            fill_or_kill,
            expiration: GENESIS_TIME.plus(3_600),
        }
    }

    #[test]
    fn test_resting_order_escrows_funds() {
        let (mut state, alice, _) = market();
        apply(
            &mut state,
            sell(&alice, 1, Asset::steem(100), Asset::sbd(50), false),
        )
        .unwrap();

        assert_eq!(state.account(&alice).unwrap().balance, Asset::steem(900));
        assert_eq!(state.get_limit_order(&alice, 1).unwrap().for_sale, 100);
    }

    #[test]
    fn test_crossing_order_fills_and_emits_fill() {
        let (mut state, alice, bob) = market();
        apply(
            &mut state,
            sell(&alice, 1, Asset::steem(100), Asset::sbd(50), false),
        )
        .unwrap();
        apply(
            &mut state,
            LimitOrderCreate2Operation {
                owner: bob.clone(),
                orderid: 9,
                amount_to_sell: Asset::sbd(50),
                exchange_rate: Price::new(Asset::sbd(1), Asset::steem(2)).unwrap(),
                fill_or_kill: true,
                expiration: GENESIS_TIME.plus(60),
            },
        )
        .unwrap();

        assert!(state.find_limit_order(&alice, 1).is_none());
        assert!(state.find_limit_order(&bob, 9).is_none());
        assert_eq!(state.account(&bob).unwrap().balance, Asset::steem(100));
        assert_eq!(state.account(&alice).unwrap().sbd_balance, Asset::sbd(50));
        assert!(state
            .virtual_operations()
            .iter()
            .any(|vop| matches!(vop, VirtualOperation::FillOrder { .. })));
    }

    #[test]
    fn test_fill_or_kill_rolls_back() {
        let (mut state, alice, _) = market();
        let err = apply(
            &mut state,
            sell(&alice, 1, Asset::steem(100), Asset::sbd(50), true),
        )
        .unwrap_err();

        assert_eq!(
            err,
            ChainError::Validation(ValidationError::OrderNotFilled {
                seller: alice.clone(),
                order_id: 1,
            })
        );
        assert_eq!(state.account(&alice).unwrap().balance, Asset::steem(1_000));
        assert!(state.find_limit_order(&alice, 1).is_none());
    }

    #[test]
    fn test_expired_order_rejected() {
        let (mut state, alice, _) = market();
        let mut op = sell(&alice, 1, Asset::steem(10), Asset::sbd(5), false);
        op.expiration = GENESIS_TIME;
        assert!(apply(&mut state, op).is_err());
    }

    #[test]
    fn test_cancel_refunds_remainder() {
        let (mut state, alice, _) = market();
        apply(
            &mut state,
            sell(&alice, 3, Asset::steem(100), Asset::sbd(50), false),
        )
        .unwrap();
        apply(
            &mut state,
            LimitOrderCancelOperation {
                owner: alice.clone(),
                orderid: 3,
            },
        )
        .unwrap();

        assert_eq!(state.account(&alice).unwrap().balance, Asset::steem(1_000));
        let err = apply(
            &mut state,
            LimitOrderCancelOperation {
                owner: alice,
                orderid: 3,
            },
        )
        .unwrap_err();
        assert!(matches!(err, ChainError::NotFound { .. }));
    }

    #[test]
    fn test_legacy_order_ids_truncate() {
        let (mut state, alice, _) = market();
        state.set_version(ChainVersion::GENESIS);
        apply(
            &mut state,
            sell(&alice, 0x1_0002, Asset::steem(10), Asset::sbd(5), false),
        )
        .unwrap();
        assert_eq!(state.get_limit_order(&alice, 2).unwrap().orderid, 2);

        let err = apply(
            &mut state,
            sell(&alice, 2, Asset::steem(10), Asset::sbd(5), false),
        )
        .unwrap_err();
        assert!(matches!(err, ChainError::UniqueViolation { .. }));
    }
}
