//! Liquid transfers, savings and SBD conversion.

use super::{require_funds, EvaluationContext, EvaluatorRegistry};
use crate::domain::constants::{
    CONVERSION_DELAY, CONVERSION_DELAY_PRE_HF16, SAVINGS_WITHDRAW_REQUEST_LIMIT,
    SAVINGS_WITHDRAW_TIME,
};
use crate::domain::hardfork;
use crate::domain::{
    ensure, CancelTransferFromSavingsOperation, ChainError, ChainVersion, ConvertOperation,
    ConvertRequest, ObjectId, SavingsWithdraw, TransferFromSavingsOperation, TransferOperation,
    TransferToSavingsOperation, TransferToVestingOperation, VersionRange,
};
use crate::policies::{AccountPolicy, WithdrawalPolicy, WitnessPolicy};

pub(super) fn register(registry: &mut EvaluatorRegistry) -> Result<(), ChainError> {
    let short_delay = ChainVersion::hardfork(hardfork::SHORT_CONVERSION_DELAY);

    registry.register_fn(VersionRange::always(), transfer)?;
    registry.register_fn(VersionRange::always(), transfer_to_vesting)?;
    registry.register_fn(VersionRange::always(), transfer_to_savings)?;
    registry.register_fn(VersionRange::always(), transfer_from_savings)?;
    registry.register_fn(VersionRange::always(), cancel_transfer_from_savings)?;
    registry.register_fn(
        VersionRange::until(short_delay),
        convert::<CONVERSION_DELAY_PRE_HF16>,
    )?;
    registry.register_fn(VersionRange::from(short_delay), convert::<CONVERSION_DELAY>)?;
    Ok(())
}

fn transfer(ctx: &mut EvaluationContext<'_>, op: &TransferOperation) -> Result<(), ChainError> {
    let state = &mut *ctx.state;
    state.account(&op.to)?;
    let available = state.get_balance(&op.from, op.amount.symbol)?;
    require_funds(&op.from, available, op.amount)?;

    state.adjust_balance(&op.from, -op.amount)?;
    state.adjust_balance(&op.to, op.amount)
}

fn transfer_to_vesting(
    ctx: &mut EvaluationContext<'_>,
    op: &TransferToVestingOperation,
) -> Result<(), ChainError> {
    let state = &mut *ctx.state;
    let to = if op.to.is_none() { &op.from } else { &op.to };
    state.account(to)?;
    let available = state.get_balance(&op.from, op.amount.symbol)?;
    require_funds(&op.from, available, op.amount)?;

    state.adjust_balance(&op.from, -op.amount)?;
    state.create_vesting(to, op.amount)?;
    Ok(())
}

fn transfer_to_savings(
    ctx: &mut EvaluationContext<'_>,
    op: &TransferToSavingsOperation,
) -> Result<(), ChainError> {
    let state = &mut *ctx.state;
    state.account(&op.to)?;
    let available = state.get_balance(&op.from, op.amount.symbol)?;
    require_funds(&op.from, available, op.amount)?;

    state.adjust_balance(&op.from, -op.amount)?;
    state.adjust_savings_balance(&op.to, op.amount)
}

fn transfer_from_savings(
    ctx: &mut EvaluationContext<'_>,
    op: &TransferFromSavingsOperation,
) -> Result<(), ChainError> {
    let state = &mut *ctx.state;
    let requests = state.account(&op.from)?.savings_withdraw_requests;
    state.account(&op.to)?;
    ensure(
        requests < SAVINGS_WITHDRAW_REQUEST_LIMIT,
        "Account has reached limit for pending withdraw requests.",
    )?;
    let available = state.get_savings_balance(&op.from, op.amount.symbol)?;
    require_funds(&op.from, available, op.amount)?;

    let complete = state.head_block_time()?.plus(SAVINGS_WITHDRAW_TIME);
    state.adjust_savings_balance(&op.from, -op.amount)?;
    state.db.create(SavingsWithdraw {
        id: ObjectId::default(),
        from: op.from.clone(),
        to: op.to.clone(),
        memo: op.memo.clone(),
        request_id: op.request_id,
        amount: op.amount,
        complete,
    })?;
    state.update_account(&op.from, |a| {
        a.savings_withdraw_requests += 1;
        Ok(())
    })
}

fn cancel_transfer_from_savings(
    ctx: &mut EvaluationContext<'_>,
    op: &CancelTransferFromSavingsOperation,
) -> Result<(), ChainError> {
    let state = &mut *ctx.state;
    let withdraw = state.get_savings_withdraw(&op.from, op.request_id)?.clone();

    state.adjust_savings_balance(&withdraw.from, withdraw.amount)?;
    state.db.remove::<SavingsWithdraw>(withdraw.id)?;
    state.update_account(&op.from, |a| {
        a.savings_withdraw_requests = a.savings_withdraw_requests.saturating_sub(1);
        Ok(())
    })
}

fn convert<const DELAY: u32>(
    ctx: &mut EvaluationContext<'_>,
    op: &ConvertOperation,
) -> Result<(), ChainError> {
    let state = &mut *ctx.state;
    let available = state.get_balance(&op.owner, op.amount.symbol)?;
    require_funds(&op.owner, available, op.amount)?;
    ensure(
        !state.feed_history()?.current_median_history.is_null(),
        "Cannot convert SBD because there is no price feed.",
    )?;

    state.adjust_balance(&op.owner, -op.amount)?;
    let conversion_date = state.head_block_time()?.plus(DELAY);
    state.db.create(ConvertRequest {
        id: ObjectId::default(),
        owner: op.owner.clone(),
        requestid: op.requestid,
        amount: op.amount,
        conversion_date,
    })?;
    Ok(())
}
