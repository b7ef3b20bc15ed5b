//! Witness registration, price feeds and witness voting.
//!
//! Vote tallying changed twice: before hardfork 2 a vote adds straight to
//! the witness, between hardforks 2 and 3 it is routed through the proxy
//! machinery, and from hardfork 3 on it moves the witness's virtual
//! schedule position as well.

use super::{Disabled, EvaluationContext, EvaluatorRegistry};
use crate::domain::constants::{
    DECLINE_VOTING_RIGHTS_DELAY, MAX_ACCOUNT_WITNESS_VOTES, MAX_PROXY_RECURSION_DEPTH,
};
use crate::domain::hardfork;
use crate::domain::{
    ensure, AccountWitnessProxyOperation, AccountWitnessVoteOperation, ChainError, ChainVersion,
    DeclineVotingRightsOperation, DeclineVotingRightsRequest, FeedPublishOperation, ObjectId,
    OperationKind, Symbol, ValidationError, VersionRange, Witness, WitnessUpdateOperation,
    WitnessVote,
};
use crate::policies::witness::VoteLayers;
use crate::policies::WitnessPolicy;
use crate::state::name_key;

pub(super) fn register(registry: &mut EvaluatorRegistry) -> Result<(), ChainError> {
    let vote_limit = ChainVersion::hardfork(hardfork::WITNESS_VOTE_LIMIT);
    let direct_vote = ChainVersion::hardfork(hardfork::DIRECT_WITNESS_VOTE);
    let decline = ChainVersion::hardfork(hardfork::DECLINE_VOTING_RIGHTS);

    registry.register_fn(VersionRange::always(), feed_publish)?;
    registry.register_fn(VersionRange::always(), witness_update)?;
    registry.register_fn(VersionRange::until(vote_limit), witness_vote_untracked)?;
    registry.register_fn(
        VersionRange::new(vote_limit, Some(direct_vote)),
        witness_vote_proxied,
    )?;
    registry.register_fn(VersionRange::from(direct_vote), witness_vote)?;
    registry.register_fn(VersionRange::always(), account_witness_proxy)?;
    registry.register(
        VersionRange::until(decline),
        Disabled {
            kind: OperationKind::DeclineVotingRights,
            required: hardfork::DECLINE_VOTING_RIGHTS,
        },
    )?;
    registry.register_fn(VersionRange::from(decline), decline_voting_rights)?;
    Ok(())
}

fn feed_publish(ctx: &mut EvaluationContext<'_>, op: &FeedPublishOperation) -> Result<(), ChainError> {
    let state = &mut *ctx.state;
    let now = state.head_block_time()?;
    // feeds are stored as SBD per STEEM
    let rate = if op.exchange_rate.base.symbol == Symbol::Sbd {
        op.exchange_rate
    } else {
        op.exchange_rate.invert()
    };

    state.update_witness(&op.publisher, |w| {
        w.sbd_exchange_rate = rate;
        w.last_sbd_exchange_update = now;
        Ok(())
    })
}

fn witness_update(
    ctx: &mut EvaluationContext<'_>,
    op: &WitnessUpdateOperation,
) -> Result<(), ChainError> {
    let state = &mut *ctx.state;
    state.account(&op.owner)?;

    if state.find_witness(&op.owner).is_some() {
        return state.update_witness(&op.owner, |w| {
            w.url = op.url.clone();
            w.signing_key = op.block_signing_key.clone();
            w.props = op.props.clone();
            Ok(())
        });
    }

    let mut witness = Witness::new(op.owner.clone(), state.head_block_time()?);
    witness.url = op.url.clone();
    witness.signing_key = op.block_signing_key.clone();
    witness.props = op.props.clone();
    state.db.create(witness)?;
    tracing::info!(owner = %op.owner, "witness registered");
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tally {
    /// Adjust the witness's vote total only.
    Untracked,
    /// Route through the voter's proxy chain.
    Proxied,
    /// Adjust the witness and its schedule position.
    Direct,
}

fn witness_vote_untracked(
    ctx: &mut EvaluationContext<'_>,
    op: &AccountWitnessVoteOperation,
) -> Result<(), ChainError> {
    cast_witness_vote(ctx, op, Tally::Untracked)
}

fn witness_vote_proxied(
    ctx: &mut EvaluationContext<'_>,
    op: &AccountWitnessVoteOperation,
) -> Result<(), ChainError> {
    cast_witness_vote(ctx, op, Tally::Proxied)
}

fn witness_vote(
    ctx: &mut EvaluationContext<'_>,
    op: &AccountWitnessVoteOperation,
) -> Result<(), ChainError> {
    cast_witness_vote(ctx, op, Tally::Direct)
}

fn cast_witness_vote(
    ctx: &mut EvaluationContext<'_>,
    op: &AccountWitnessVoteOperation,
    tally: Tally,
) -> Result<(), ChainError> {
    let state = &mut *ctx.state;
    let voter = state.account(&op.account)?.clone();
    if !voter.proxy.is_none() {
        return Err(ValidationError::ProxyIsSet {
            account: voter.name,
        }
        .into());
    }
    if op.approve && !voter.can_vote {
        return Err(ValidationError::VotingRightsDeclined {
            account: voter.name,
        }
        .into());
    }
    let witness_id = state.witness(&op.witness)?.id;

    let existing = state
        .db
        .find_by::<WitnessVote>(
            WitnessVote::BY_ACCOUNT_WITNESS,
            &WitnessVote::key(&op.account, &op.witness),
        )
        .map(|vote| vote.id);
    let weight = voter.witness_vote_weight();

    match existing {
        None => {
            if !op.approve {
                return Err(ValidationError::VoteMissing {
                    witness: op.witness.clone(),
                }
                .into());
            }
            if tally != Tally::Untracked
                && voter.witnesses_voted_for >= MAX_ACCOUNT_WITNESS_VOTES
            {
                return Err(ValidationError::TooManyWitnessVotes {
                    account: voter.name,
                    limit: MAX_ACCOUNT_WITNESS_VOTES,
                }
                .into());
            }

            state
                .db
                .create(WitnessVote::new(op.account.clone(), op.witness.clone()))?;
            match tally {
                Tally::Untracked => state.db.modify::<Witness, _>(witness_id, |w| w.votes += weight)?,
                Tally::Proxied => state.adjust_proxied_witness_votes(&op.account, weight, 0)?,
                Tally::Direct => state.adjust_witness_vote(&op.witness, weight)?,
            }
            state.update_account(&op.account, |a| {
                a.witnesses_voted_for += 1;
                Ok(())
            })
        }
        Some(vote_id) => {
            if op.approve {
                return Err(ValidationError::VoteAlreadyExists {
                    witness: op.witness.clone(),
                }
                .into());
            }

            match tally {
                Tally::Untracked => state.db.modify::<Witness, _>(witness_id, |w| w.votes -= weight)?,
                Tally::Proxied => state.adjust_proxied_witness_votes(&op.account, -weight, 0)?,
                Tally::Direct => state.adjust_witness_vote(&op.witness, -weight)?,
            }
            state.update_account(&op.account, |a| {
                a.witnesses_voted_for = a.witnesses_voted_for.saturating_sub(1);
                Ok(())
            })?;
            state.db.remove::<WitnessVote>(vote_id)?;
            Ok(())
        }
    }
}

fn account_witness_proxy(
    ctx: &mut EvaluationContext<'_>,
    op: &AccountWitnessProxyOperation,
) -> Result<(), ChainError> {
    let state = &mut *ctx.state;
    let account = state.account(&op.account)?.clone();
    ensure(account.proxy != op.proxy, "Proxy must change.")?;
    if !account.can_vote {
        return Err(ValidationError::VotingRightsDeclined {
            account: account.name,
        }
        .into());
    }

    let mut delta: VoteLayers = [0; MAX_PROXY_RECURSION_DEPTH + 1];
    delta[0] = -account.vesting_shares.amount;
    for (layer, votes) in account.proxied_vsf_votes.iter().enumerate() {
        delta[layer + 1] = -votes;
    }
    state.adjust_proxied_witness_vote_layers(&op.account, &delta, 0)?;

    if op.proxy.is_none() {
        return state.update_account(&op.account, |a| {
            a.proxy = op.proxy.clone();
            Ok(())
        });
    }

    state.check_proxy_chain(&op.account, &op.proxy)?;
    state.clear_witness_votes(&op.account)?;
    state.update_account(&op.account, |a| {
        a.proxy = op.proxy.clone();
        Ok(())
    })?;

    for layer in &mut delta {
        *layer = -*layer;
    }
    state.adjust_proxied_witness_vote_layers(&op.account, &delta, 0)?;
    tracing::debug!(account = %op.account, proxy = %op.proxy, "witness proxy set");
    Ok(())
}

fn decline_voting_rights(
    ctx: &mut EvaluationContext<'_>,
    op: &DeclineVotingRightsOperation,
) -> Result<(), ChainError> {
    let state = &mut *ctx.state;
    state.account(&op.account)?;
    let existing = state
        .db
        .find_by::<DeclineVotingRightsRequest>(
            DeclineVotingRightsRequest::BY_ACCOUNT,
            &name_key(&op.account),
        )
        .map(|request| request.id);

    if op.decline {
        ensure(
            existing.is_none(),
            "Cannot create new request because one already exists.",
        )?;
        let effective_date = state.head_block_time()?.plus(DECLINE_VOTING_RIGHTS_DELAY);
        state.db.create(DeclineVotingRightsRequest {
            id: ObjectId::default(),
            account: op.account.clone(),
            effective_date,
        })?;
        return Ok(());
    }

    match existing {
        Some(id) => {
            state.db.remove::<DeclineVotingRightsRequest>(id)?;
            Ok(())
        }
        None => Err(ChainError::rule(
            "Cannot cancel the request because it does not exist.",
        )),
    }
}
