//! Account creation, authority updates and owner recovery.

use super::{require_funds, EvaluationContext, EvaluatorRegistry};
use crate::domain::constants::{
    ACCOUNT_RECOVERY_REQUEST_EXPIRATION_PERIOD, CREATE_ACCOUNT_WITH_STEEM_MODIFIER,
    INIT_MINER_NAME, OWNER_AUTH_RECOVERY_PERIOD, OWNER_UPDATE_LIMIT, TEMP_ACCOUNT,
};
use crate::domain::hardfork;
use crate::domain::{
    ensure, Account, AccountAuthority, AccountCreateOperation, AccountName,
    AccountRecoveryRequest, AccountUpdateOperation, Asset, Authority, ChainError,
    ChangeRecoveryAccountOperation, ChangeRecoveryAccountRequest, ObjectId,
    OwnerAuthorityHistory, RecoverAccountOperation, RequestAccountRecoveryOperation, Timestamp,
    VersionRange, Witness,
};
use crate::policies::{AccountPolicy, WitnessPolicy};
use crate::state::{name_key, ChainState};

pub(super) fn register(registry: &mut EvaluatorRegistry) -> Result<(), ChainError> {
    registry.register_fn(VersionRange::always(), account_create)?;
    registry.register_fn(VersionRange::always(), account_update)?;
    registry.register_fn(VersionRange::always(), request_account_recovery)?;
    registry.register_fn(VersionRange::always(), recover_account)?;
    registry.register_fn(VersionRange::always(), change_recovery_account)?;
    Ok(())
}

/// Whether accounts named inside authorities must exist.
fn verifies_authority_accounts(ctx: &EvaluationContext<'_>) -> bool {
    ctx.producing || ctx.state.has_hardfork(hardfork::VERIFY_AUTHORITY_ACCOUNTS)
}

fn check_authority_accounts(state: &ChainState, authority: &Authority) -> Result<(), ChainError> {
    for name in authority.account_auths.keys() {
        state.account(name)?;
    }
    Ok(())
}

fn authority_of<'s>(
    state: &'s ChainState,
    name: &AccountName,
) -> Result<&'s AccountAuthority, ChainError> {
    state
        .db
        .get_by::<AccountAuthority>(AccountAuthority::BY_ACCOUNT, &name_key(name))
}

/// Smallest fee accepted at the active version.
fn minimum_creation_fee(state: &ChainState) -> Result<Asset, ChainError> {
    let median = state.witness_schedule()?.median_props.account_creation_fee;
    Ok(if state.has_hardfork(hardfork::ACCOUNT_CREATION_FEE_MULTIPLIER) {
        Asset::steem(median.amount.saturating_mul(CREATE_ACCOUNT_WITH_STEEM_MODIFIER))
    } else if state.has_hardfork(hardfork::ACCOUNT_CREATION_FEE) {
        median
    } else {
        Asset::steem(0)
    })
}

fn account_create(
    ctx: &mut EvaluationContext<'_>,
    op: &AccountCreateOperation,
) -> Result<(), ChainError> {
    let balance = ctx.state.account(&op.creator)?.balance;
    require_funds(&op.creator, balance, op.fee)?;

    let required = minimum_creation_fee(ctx.state)?;
    ensure(
        op.fee.amount >= required.amount,
        format!("Insufficient Fee: {required} required, {} provided.", op.fee),
    )?;

    if verifies_authority_accounts(ctx) {
        check_authority_accounts(ctx.state, &op.owner)?;
        check_authority_accounts(ctx.state, &op.active)?;
        check_authority_accounts(ctx.state, &op.posting)?;
    }

    let state = &mut *ctx.state;
    let now = state.head_block_time()?;
    state.adjust_balance(&op.creator, -op.fee)?;

    let mut account = Account::new(op.new_account_name.clone(), now);
    account.memo_key = op.memo_key.clone();
    account.json_metadata = op.json_metadata.clone();
    account.mined = false;
    account.recovery_account = if state.has_hardfork(hardfork::CREATOR_IS_RECOVERY_PARTNER) {
        op.creator.clone()
    } else {
        AccountName::from(INIT_MINER_NAME)
    };
    state.db.create(account)?;
    state.db.create(AccountAuthority {
        id: ObjectId::default(),
        account: op.new_account_name.clone(),
        owner: op.owner.clone(),
        active: op.active.clone(),
        posting: op.posting.clone(),
        last_owner_update: Timestamp::MIN,
    })?;

    if op.fee.amount > 0 {
        state.create_vesting(&op.new_account_name, op.fee)?;
    }
    tracing::debug!(creator = %op.creator, account = %op.new_account_name, fee = %op.fee, "account created");
    Ok(())
}

fn account_update(
    ctx: &mut EvaluationContext<'_>,
    op: &AccountUpdateOperation,
) -> Result<(), ChainError> {
    if ctx.state.has_hardfork(hardfork::FREEZE_TEMP_ACCOUNT) {
        ensure(
            op.account.as_str() != TEMP_ACCOUNT,
            "Cannot update temp account.",
        )?;
    }
    let verify = verifies_authority_accounts(ctx);
    let state = &mut *ctx.state;
    let now = state.head_block_time()?;
    state.account(&op.account)?;
    let last_owner_update = authority_of(state, &op.account)?.last_owner_update;

    if let Some(owner) = &op.owner {
        if state.has_hardfork(hardfork::OWNER_UPDATE_THROTTLE) {
            ensure(
                now.since(last_owner_update) > OWNER_UPDATE_LIMIT,
                "Owner authority can only be updated once an hour.",
            )?;
        }
        if verify {
            check_authority_accounts(state, owner)?;
        }
        state.update_owner_authority(&op.account, owner.clone())?;
    }
    if verify {
        if let Some(active) = &op.active {
            check_authority_accounts(state, active)?;
        }
        if let Some(posting) = &op.posting {
            check_authority_accounts(state, posting)?;
        }
    }

    let touches_active = op.active.is_some() || op.owner.is_some();
    state.update_account(&op.account, |a| {
        if !op.memo_key.is_empty() {
            a.memo_key = op.memo_key.clone();
        }
        if touches_active {
            a.active_challenged = false;
        }
        a.last_account_update = now;
        if !op.json_metadata.is_empty() {
            a.json_metadata = op.json_metadata.clone();
        }
        Ok(())
    })?;

    if op.active.is_some() || op.posting.is_some() {
        let id = authority_of(state, &op.account)?.id;
        state.db.modify::<AccountAuthority, _>(id, |auth| {
            if let Some(active) = &op.active {
                auth.active = active.clone();
            }
            if let Some(posting) = &op.posting {
                auth.posting = posting.clone();
            }
        })?;
    }
    Ok(())
}

fn request_account_recovery(
    ctx: &mut EvaluationContext<'_>,
    op: &RequestAccountRecoveryOperation,
) -> Result<(), ChainError> {
    let verify = verifies_authority_accounts(ctx);
    let state = &mut *ctx.state;
    let partner = state.account(&op.account_to_recover)?.recovery_account.clone();

    if partner.is_none() {
        // an account without a partner is recovered by the top witness
        let top = state
            .db
            .iter::<Witness>(Witness::BY_VOTE)
            .next()
            .map(|w| w.owner.clone());
        ensure(
            top.as_ref() == Some(&op.recovery_account),
            "Top witness must recover an account with no recovery partner.",
        )?;
    } else {
        ensure(
            partner == op.recovery_account,
            "Cannot recover an account that does not have you as their recovery partner.",
        )?;
    }

    let expires = state
        .head_block_time()?
        .plus(ACCOUNT_RECOVERY_REQUEST_EXPIRATION_PERIOD);
    let existing = state
        .db
        .find_by::<AccountRecoveryRequest>(
            AccountRecoveryRequest::BY_ACCOUNT,
            &name_key(&op.account_to_recover),
        )
        .map(|r| r.id);
    let authority = &op.new_owner_authority;

    match existing {
        None => {
            ensure(
                !authority.is_impossible(),
                "Cannot recover using an impossible authority.",
            )?;
            ensure(
                authority.weight_threshold > 0,
                "Cannot recover using an open authority.",
            )?;
            if verify {
                check_authority_accounts(state, authority)?;
            }
            state.db.create(AccountRecoveryRequest {
                id: ObjectId::default(),
                account_to_recover: op.account_to_recover.clone(),
                new_owner_authority: authority.clone(),
                expires,
            })?;
        }
        Some(id) if authority.weight_threshold == 0 => {
            state.db.remove::<AccountRecoveryRequest>(id)?;
        }
        Some(id) => {
            ensure(
                !authority.is_impossible(),
                "Cannot recover using an impossible authority.",
            )?;
            if verify {
                check_authority_accounts(state, authority)?;
            }
            state.db.modify::<AccountRecoveryRequest, _>(id, |r| {
                r.new_owner_authority = authority.clone();
                r.expires = expires;
            })?;
        }
    }
    Ok(())
}

fn recover_account(
    ctx: &mut EvaluationContext<'_>,
    op: &RecoverAccountOperation,
) -> Result<(), ChainError> {
    let state = &mut *ctx.state;
    let now = state.head_block_time()?;
    let last_recovery = state.account(&op.account_to_recover)?.last_account_recovery;

    if state.has_hardfork(hardfork::RECOVERY_THROTTLE) {
        ensure(
            now.since(last_recovery) > OWNER_UPDATE_LIMIT,
            "Owner authority can only be updated once an hour.",
        )?;
    }

    let request = state
        .db
        .find_by::<AccountRecoveryRequest>(
            AccountRecoveryRequest::BY_ACCOUNT,
            &name_key(&op.account_to_recover),
        )
        .ok_or_else(|| ChainError::rule("There are no active recovery requests for this account."))?;
    ensure(
        request.new_owner_authority == op.new_owner_authority,
        "New owner authority does not match recovery request.",
    )?;
    let request_id = request.id;

    let found = state
        .db
        .prefix::<OwnerAuthorityHistory>(
            OwnerAuthorityHistory::BY_ACCOUNT,
            name_key(&op.account_to_recover),
        )
        .any(|h| h.previous_owner_authority == op.recent_owner_authority);
    ensure(found, "Recent authority not found in authority history.")?;

    state.db.remove::<AccountRecoveryRequest>(request_id)?;
    state.update_owner_authority(&op.account_to_recover, op.new_owner_authority.clone())?;
    state.update_account(&op.account_to_recover, |a| {
        a.last_account_recovery = now;
        Ok(())
    })?;
    tracing::info!(account = %op.account_to_recover, "account recovered");
    Ok(())
}

fn change_recovery_account(
    ctx: &mut EvaluationContext<'_>,
    op: &ChangeRecoveryAccountOperation,
) -> Result<(), ChainError> {
    let state = &mut *ctx.state;
    state.account(&op.new_recovery_account)?;
    let current = state.account(&op.account_to_recover)?.recovery_account.clone();
    let effective_on = state.head_block_time()?.plus(OWNER_AUTH_RECOVERY_PERIOD);

    let existing = state
        .db
        .find_by::<ChangeRecoveryAccountRequest>(
            ChangeRecoveryAccountRequest::BY_ACCOUNT,
            &name_key(&op.account_to_recover),
        )
        .map(|r| r.id);

    match existing {
        None => {
            state.db.create(ChangeRecoveryAccountRequest {
                id: ObjectId::default(),
                account_to_recover: op.account_to_recover.clone(),
                recovery_account: op.new_recovery_account.clone(),
                effective_on,
            })?;
        }
        Some(id) if current != op.new_recovery_account => {
            state.db.modify::<ChangeRecoveryAccountRequest, _>(id, |r| {
                r.recovery_account = op.new_recovery_account.clone();
                r.effective_on = effective_on;
            })?;
        }
        // changing back to the current partner withdraws the request
        Some(id) => {
            state.db.remove::<ChangeRecoveryAccountRequest>(id)?;
        }
    }
    Ok(())
}
