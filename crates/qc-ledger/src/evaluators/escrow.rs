//! Three-party escrow: transfer, ratification, dispute and release.

use super::{require_funds, EvaluationContext, EvaluatorRegistry};
use crate::domain::{
    ensure, AccountName, Asset, ChainError, Escrow, EscrowApproveOperation,
    EscrowDisputeOperation, EscrowReleaseOperation, EscrowTransferOperation, ObjectId, Symbol,
    VersionRange,
};
use crate::policies::AccountPolicy;
use crate::state::ChainState;
use crate::store::ChainObject;

pub(super) fn register(registry: &mut EvaluatorRegistry) -> Result<(), ChainError> {
    registry.register_fn(VersionRange::always(), escrow_transfer)?;
    registry.register_fn(VersionRange::always(), escrow_approve)?;
    registry.register_fn(VersionRange::always(), escrow_dispute)?;
    registry.register_fn(VersionRange::always(), escrow_release)?;
    Ok(())
}

fn get_escrow(state: &ChainState, from: &AccountName, escrow_id: u32) -> Result<Escrow, ChainError> {
    state
        .db
        .find_by::<Escrow>(Escrow::BY_FROM_ID, &Escrow::from_key(from, escrow_id))
        .cloned()
        .ok_or_else(|| ChainError::not_found(Escrow::KIND, format!("{from}/{escrow_id}")))
}

fn check_parties(escrow: &Escrow, to: &AccountName, agent: &AccountName) -> Result<(), ChainError> {
    ensure(
        &escrow.to == to,
        format!("Operation 'to' ({to}) does not match escrow 'to' ({}).", escrow.to),
    )?;
    ensure(
        &escrow.agent == agent,
        format!(
            "Operation 'agent' ({agent}) does not match escrow 'agent' ({}).",
            escrow.agent
        ),
    )
}

fn escrow_transfer(
    ctx: &mut EvaluationContext<'_>,
    op: &EscrowTransferOperation,
) -> Result<(), ChainError> {
    let state = &mut *ctx.state;
    let from = state.account(&op.from)?;
    let (balance, sbd_balance) = (from.balance, from.sbd_balance);
    state.account(&op.to)?;
    state.account(&op.agent)?;

    let now = state.head_block_time()?;
    ensure(
        op.ratification_deadline > now,
        "The escrow ratification deadline must be after head block time.",
    )?;
    ensure(
        op.escrow_expiration > now,
        "The escrow expiration must be after head block time.",
    )?;

    let mut steem_spent = op.steem_amount;
    let mut sbd_spent = op.sbd_amount;
    match op.fee.symbol {
        Symbol::Steem => steem_spent = steem_spent.checked_add(&op.fee)?,
        _ => sbd_spent = sbd_spent.checked_add(&op.fee)?,
    }
    require_funds(&op.from, balance, steem_spent)?;
    require_funds(&op.from, sbd_balance, sbd_spent)?;

    state.adjust_balance(&op.from, -steem_spent)?;
    state.adjust_balance(&op.from, -sbd_spent)?;
    state.db.create(Escrow {
        id: ObjectId::default(),
        escrow_id: op.escrow_id,
        from: op.from.clone(),
        to: op.to.clone(),
        agent: op.agent.clone(),
        ratification_deadline: op.ratification_deadline,
        escrow_expiration: op.escrow_expiration,
        sbd_balance: op.sbd_amount,
        steem_balance: op.steem_amount,
        pending_fee: op.fee,
        to_approved: false,
        agent_approved: false,
        disputed: false,
    })?;
    Ok(())
}

fn escrow_approve(
    ctx: &mut EvaluationContext<'_>,
    op: &EscrowApproveOperation,
) -> Result<(), ChainError> {
    let state = &mut *ctx.state;
    let escrow = get_escrow(state, &op.from, op.escrow_id)?;
    check_parties(&escrow, &op.to, &op.agent)?;
    ensure(
        escrow.ratification_deadline >= state.head_block_time()?,
        "The escrow ratification deadline has passed. Escrow can no longer be ratified.",
    )?;

    if op.who == op.to {
        ensure(
            !escrow.to_approved,
            format!("Account 'to' ({}) has already approved the escrow.", op.to),
        )?;
    }
    if op.who == op.agent {
        ensure(
            !escrow.agent_approved,
            format!("Account 'agent' ({}) has already approved the escrow.", op.agent),
        )?;
    }

    if !op.approve {
        state.adjust_balance(&escrow.from, escrow.steem_balance)?;
        state.adjust_balance(&escrow.from, escrow.sbd_balance)?;
        state.adjust_balance(&escrow.from, escrow.pending_fee)?;
        state.db.remove::<Escrow>(escrow.id)?;
        tracing::debug!(from = %escrow.from, escrow_id = escrow.escrow_id, who = %op.who, "escrow rejected");
        return Ok(());
    }

    let by_to = op.who == op.to;
    state.db.modify::<Escrow, _>(escrow.id, |e| {
        if by_to {
            e.to_approved = true;
        } else {
            e.agent_approved = true;
        }
    })?;

    let escrow = state.db.get::<Escrow>(escrow.id)?;
    if escrow.is_approved() {
        let (id, fee) = (escrow.id, escrow.pending_fee);
        state.adjust_balance(&op.agent, fee)?;
        state
            .db
            .modify::<Escrow, _>(id, |e| e.pending_fee = Asset::zero(fee.symbol))?;
    }
    Ok(())
}

fn escrow_dispute(
    ctx: &mut EvaluationContext<'_>,
    op: &EscrowDisputeOperation,
) -> Result<(), ChainError> {
    let state = &mut *ctx.state;
    state.account(&op.from)?;
    let escrow = get_escrow(state, &op.from, op.escrow_id)?;
    ensure(
        state.head_block_time()? < escrow.escrow_expiration,
        "Disputing the escrow must happen before expiration.",
    )?;
    ensure(
        escrow.is_approved(),
        "The escrow must be approved by all parties before a dispute can be raised.",
    )?;
    ensure(!escrow.disputed, "The escrow is already under dispute.")?;
    check_parties(&escrow, &op.to, &op.agent)?;

    state.db.modify::<Escrow, _>(escrow.id, |e| e.disputed = true)
}

fn escrow_release(
    ctx: &mut EvaluationContext<'_>,
    op: &EscrowReleaseOperation,
) -> Result<(), ChainError> {
    let state = &mut *ctx.state;
    state.account(&op.from)?;
    state.account(&op.receiver)?;
    let escrow = get_escrow(state, &op.from, op.escrow_id)?;

    ensure(
        escrow.steem_balance.amount >= op.steem_amount.amount,
        format!(
            "Release amount exceeds escrow balance. Amount: {}, Balance: {}",
            op.steem_amount, escrow.steem_balance
        ),
    )?;
    ensure(
        escrow.sbd_balance.amount >= op.sbd_amount.amount,
        format!(
            "Release amount exceeds escrow balance. Amount: {}, Balance: {}",
            op.sbd_amount, escrow.sbd_balance
        ),
    )?;
    check_parties(&escrow, &op.to, &op.agent)?;
    ensure(
        op.receiver == escrow.from || op.receiver == escrow.to,
        format!(
            "Funds must be released to 'from' ({}) or 'to' ({})",
            escrow.from, escrow.to
        ),
    )?;
    ensure(
        escrow.is_approved(),
        "Funds cannot be released prior to escrow approval.",
    )?;

    if escrow.disputed {
        ensure(
            op.who == escrow.agent,
            format!(
                "Only 'agent' ({}) can release funds in a disputed escrow.",
                escrow.agent
            ),
        )?;
    } else {
        ensure(
            op.who == escrow.from || op.who == escrow.to,
            format!(
                "Only 'from' ({}) and 'to' ({}) can release funds from a non-disputed escrow",
                escrow.from, escrow.to
            ),
        )?;
        // before expiration each party may only release to the other
        if escrow.escrow_expiration > state.head_block_time()? {
            if op.who == escrow.from {
                ensure(
                    op.receiver == escrow.to,
                    format!("Only 'from' ({}) can release funds to 'to' ({}).", escrow.from, escrow.to),
                )?;
            } else {
                ensure(
                    op.receiver == escrow.from,
                    format!("Only 'to' ({}) can release funds to 'from' ({}).", escrow.to, escrow.from),
                )?;
            }
        }
    }

    state.adjust_balance(&op.receiver, op.steem_amount)?;
    state.adjust_balance(&op.receiver, op.sbd_amount)?;
    state.db.modify::<Escrow, _>(escrow.id, |e| {
        e.steem_balance.amount -= op.steem_amount.amount;
        e.sbd_balance.amount -= op.sbd_amount.amount;
    })?;

    let drained = state.db.get::<Escrow>(escrow.id)?;
    if drained.steem_balance.is_zero() && drained.sbd_balance.is_zero() {
        state.db.remove::<Escrow>(escrow.id)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::invariants::validate_invariants;
    use crate::evaluators::test_support::apply;
    use crate::policies::test_support::{advance_time, make_account, state, GENESIS_TIME};

    struct Parties {
        state: ChainState,
        alice: AccountName,
        bob: AccountName,
        carol: AccountName,
    }

    fn parties() -> Parties {
        let mut state = state();
        let alice = make_account(&mut state, "alice", 1_000);
        let bob = make_account(&mut state, "bob", 0);
        let carol = make_account(&mut state, "carol", 0);
        Parties {
            state,
            alice,
            bob,
            carol,
        }
    }

    fn transfer(p: &Parties, steem: i64, fee: i64) -> EscrowTransferOperation {
        EscrowTransferOperation {
            from: p.alice.clone(),
            to: p.bob.clone(),
            agent: p.carol.clone(),
            escrow_id: 1,
            sbd_amount: Asset::sbd(0),
            steem_amount: Asset::steem(steem),
            fee: Asset::steem(fee),
            ratification_deadline: GENESIS_TIME.plus(100),
            escrow_expiration: GENESIS_TIME.plus(1_000),
            json_meta: String::new(),
        }
    }

    fn approve(p: &Parties, who: &AccountName, approve: bool) -> EscrowApproveOperation {
        EscrowApproveOperation {
            from: p.alice.clone(),
            to: p.bob.clone(),
            agent: p.carol.clone(),
            who: who.clone(),
            escrow_id: 1,
            approve,
        }
    }

    fn release(p: &Parties, who: &AccountName, receiver: &AccountName, steem: i64) -> EscrowReleaseOperation {
        EscrowReleaseOperation {
            from: p.alice.clone(),
            to: p.bob.clone(),
            agent: p.carol.clone(),
            who: who.clone(),
            receiver: receiver.clone(),
            escrow_id: 1,
            sbd_amount: Asset::sbd(0),
            steem_amount: Asset::steem(steem),
        }
    }

    fn ratified() -> Parties {
        let mut p = parties();
        let op = transfer(&p, 100, 5);
        apply(&mut p.state, op).unwrap();
        let (bob, carol) = (p.bob.clone(), p.carol.clone());
        let op = approve(&p, &bob, true);
        apply(&mut p.state, op).unwrap();
        let op = approve(&p, &carol, true);
        apply(&mut p.state, op).unwrap();
        p
    }

    #[test]
    fn test_transfer_locks_amount_and_fee() {
        let mut p = parties();
        let op = transfer(&p, 100, 5);
        apply(&mut p.state, op).unwrap();

        assert_eq!(p.state.account(&p.alice).unwrap().balance, Asset::steem(895));
        let escrow = get_escrow(&p.state, &p.alice, 1).unwrap();
        assert_eq!(escrow.pending_fee, Asset::steem(5));
        assert!(!escrow.is_approved());
        validate_invariants(&p.state.db).unwrap();
    }

    #[test]
    fn test_transfer_requires_funds_for_fee() {
        let mut p = parties();
        let op = transfer(&p, 1_000, 1);
        assert!(apply(&mut p.state, op).is_err());
        assert_eq!(p.state.db.count::<Escrow>(), 0);
    }

    #[test]
    fn test_full_approval_pays_agent() {
        let p = ratified();
        assert_eq!(p.state.account(&p.carol).unwrap().balance, Asset::steem(5));
        let escrow = get_escrow(&p.state, &p.alice, 1).unwrap();
        assert!(escrow.is_approved());
        assert!(escrow.pending_fee.is_zero());
        validate_invariants(&p.state.db).unwrap();
    }

    #[test]
    fn test_double_approval_rejected() {
        let mut p = parties();
        let op = transfer(&p, 100, 5);
        apply(&mut p.state, op).unwrap();
        let bob = p.bob.clone();
        let op = approve(&p, &bob, true);
        apply(&mut p.state, op.clone()).unwrap();
        assert!(apply(&mut p.state, op).is_err());
    }

    #[test]
    fn test_rejection_refunds_sender() {
        let mut p = parties();
        let op = transfer(&p, 100, 5);
        apply(&mut p.state, op).unwrap();
        let carol = p.carol.clone();
        let op = approve(&p, &carol, false);
        apply(&mut p.state, op).unwrap();

        assert_eq!(p.state.account(&p.alice).unwrap().balance, Asset::steem(1_000));
        assert_eq!(p.state.db.count::<Escrow>(), 0);
    }

    #[test]
    fn test_approval_after_deadline_rejected() {
        let mut p = parties();
        let op = transfer(&p, 100, 5);
        apply(&mut p.state, op).unwrap();
        advance_time(&mut p.state, 101);
        let bob = p.bob.clone();
        let op = approve(&p, &bob, true);
        assert!(apply(&mut p.state, op).is_err());
    }

    #[test]
    fn test_release_before_expiration_goes_to_counterparty() {
        let mut p = ratified();
        let (alice, bob) = (p.alice.clone(), p.bob.clone());

        let op = release(&p, &alice, &alice, 10);
        assert!(apply(&mut p.state, op).is_err());

        let op = release(&p, &alice, &bob, 40);
        apply(&mut p.state, op).unwrap();
        assert_eq!(p.state.account(&bob).unwrap().balance, Asset::steem(40));
        assert_eq!(
            get_escrow(&p.state, &alice, 1).unwrap().steem_balance,
            Asset::steem(60)
        );
    }

    #[test]
    fn test_release_after_expiration_to_either_party() {
        let mut p = ratified();
        advance_time(&mut p.state, 1_000);
        let bob = p.bob.clone();
        let op = release(&p, &bob, &bob, 100);
        apply(&mut p.state, op).unwrap();

        assert_eq!(p.state.account(&bob).unwrap().balance, Asset::steem(100));
        assert_eq!(p.state.db.count::<Escrow>(), 0);
        validate_invariants(&p.state.db).unwrap();
    }

    #[test]
    fn test_dispute_hands_release_to_agent() {
        let mut p = ratified();
        let (alice, bob, carol) = (p.alice.clone(), p.bob.clone(), p.carol.clone());
        apply(
            &mut p.state,
            EscrowDisputeOperation {
                from: alice.clone(),
                to: bob.clone(),
                agent: carol.clone(),
                who: alice.clone(),
                escrow_id: 1,
            },
        )
        .unwrap();
        assert!(get_escrow(&p.state, &alice, 1).unwrap().disputed);

        let op = release(&p, &alice, &bob, 10);
        assert!(apply(&mut p.state, op).is_err());
        let op = release(&p, &carol, &alice, 100);
        apply(&mut p.state, op).unwrap();
        assert_eq!(p.state.account(&alice).unwrap().balance, Asset::steem(995));
    }

    #[test]
    fn test_dispute_requires_ratification() {
        let mut p = parties();
        let op = transfer(&p, 100, 5);
        apply(&mut p.state, op).unwrap();
        let err = apply(
            &mut p.state,
            EscrowDisputeOperation {
                from: p.alice.clone(),
                to: p.bob.clone(),
                agent: p.carol.clone(),
                who: p.bob.clone(),
                escrow_id: 1,
            },
        );
        assert!(err.is_err());
    }
}
