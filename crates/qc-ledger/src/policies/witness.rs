//! # Witness Policy
//!
//! Stake, vote propagation and the production schedule.
//!
//! ## Vote propagation
//!
//! An account without a proxy pushes `vesting_shares + proxied_vsf_votes`
//! into every witness it approves. An account with a proxy pushes its weight
//! up the proxy chain instead, recording it in each hop's
//! `proxied_vsf_votes[depth]`. Weight travelling further than
//! `MAX_PROXY_RECURSION_DEPTH` hops is dropped.
//!
//! Proxy chains are acyclic by construction; every walk still carries a
//! visited set and reports a cycle as a fatal [`InternalError::ProxyCycle`].
//!
//! ## Scheduling
//!
//! Each round takes the top voted witnesses plus one timeshare witness
//! chosen by virtual time, then shuffles them deterministically.

use super::add_to;
use crate::algorithms::schedule::{
    advance_position, clamp_scheduled_time, median_by_key, participation_rate, scheduled_time,
    shuffle,
};
use crate::domain::constants::{
    MAX_PROXY_RECURSION_DEPTH, MAX_VOTED_WITNESSES, VIRTUAL_SCHEDULE_LAP_LENGTH,
    VIRTUAL_SCHEDULE_LAP_LENGTH2,
};
use crate::domain::hardfork;
use crate::domain::{
    Account, AccountName, Asset, ChainError, ChainVersion, DeclineVotingRightsRequest,
    InternalError, ScheduleSlot, ValidationError, Witness, WitnessSchedule, WitnessVote,
};
use crate::state::ChainState;
use crate::store::{ChainObject, KeyPart};
use std::collections::BTreeSet;

/// Vote weight per proxy layer: own shares first, then each proxied layer.
pub type VoteLayers = [i64; MAX_PROXY_RECURSION_DEPTH + 1];

/// Witness voting and scheduling rules.
pub trait WitnessPolicy {
    /// Converts `steem` into vesting shares for `to` at the current share
    /// price. Returns the shares created.
    fn create_vesting(&mut self, to: &AccountName, steem: Asset) -> Result<Asset, ChainError>;

    /// Adds `delta` to one witness's votes, advancing its virtual position.
    fn adjust_witness_vote(&mut self, witness: &AccountName, delta: i64) -> Result<(), ChainError>;

    /// Adds `delta` to every witness `account` approves.
    fn adjust_witness_votes(&mut self, account: &AccountName, delta: i64)
        -> Result<(), ChainError>;

    /// Routes a stake change of `account` through its proxy chain, starting
    /// `depth` hops in.
    fn adjust_proxied_witness_votes(
        &mut self,
        account: &AccountName,
        delta: i64,
        depth: usize,
    ) -> Result<(), ChainError>;

    /// Routes a per-layer change through the proxy chain, shifting each
    /// layer one slot deeper per hop.
    fn adjust_proxied_witness_vote_layers(
        &mut self,
        account: &AccountName,
        delta: &VoteLayers,
        depth: usize,
    ) -> Result<(), ChainError>;

    /// Fails if making `proxy` the proxy of `account` would create a loop
    /// or a chain longer than the recursion limit.
    fn check_proxy_chain(&self, account: &AccountName, proxy: &AccountName)
        -> Result<(), ChainError>;

    /// Removes every witness approval of `account`.
    fn clear_witness_votes(&mut self, account: &AccountName) -> Result<(), ChainError>;

    /// Applies voting-rights declines whose delay has passed.
    fn process_decline_voting_rights(&mut self) -> Result<(), ChainError>;

    /// Recomputes every witness's votes from the approvals.
    fn retally_witness_votes(&mut self) -> Result<(), ChainError>;

    /// Recomputes `witnesses_voted_for`; without `force` only for accounts
    /// with a proxy.
    fn retally_witness_vote_counts(&mut self, force: bool) -> Result<(), ChainError>;

    /// Copies the median chain properties of the scheduled witnesses into
    /// the schedule and the global properties.
    fn update_median_witness_props(&mut self) -> Result<(), ChainError>;

    fn reset_virtual_schedule_time(&mut self) -> Result<(), ChainError>;

    /// Builds the next production round once the current one is used up.
    fn update_witness_schedule(&mut self) -> Result<(), ChainError>;

    /// Witness producing `slot_num` slots after the head block.
    fn scheduled_witness(&self, slot_num: u32) -> Result<AccountName, ChainError>;

    /// Share of recent slots that produced a block, in basis points.
    fn witness_participation_rate(&self) -> Result<u32, ChainError>;
}

fn proxy_cycle(account: &AccountName) -> ChainError {
    InternalError::ProxyCycle {
        account: account.clone(),
    }
    .into()
}

impl ChainState {
    fn approved_witnesses(&self, account: &AccountName) -> Vec<WitnessVote> {
        self.db
            .prefix::<WitnessVote>(WitnessVote::BY_ACCOUNT_WITNESS, vec![KeyPart::from(account)])
            .cloned()
            .collect()
    }

    fn lap_length(&self) -> u128 {
        if self.has_hardfork(hardfork::SCHEDULE_LAP_V2) {
            VIRTUAL_SCHEDULE_LAP_LENGTH2
        } else {
            VIRTUAL_SCHEDULE_LAP_LENGTH
        }
    }

    /// Highest version run by at least two thirds of `witnesses`.
    fn majority_version(&self, witnesses: &[AccountName]) -> Result<ChainVersion, ChainError> {
        let mut versions = witnesses
            .iter()
            .map(|name| self.witness(name).map(|w| w.running_version))
            .collect::<Result<Vec<_>, _>>()?;
        versions.sort_unstable_by(|a, b| b.cmp(a));
        let threshold = versions.len() * 2 / 3 + 1;
        Ok(versions
            .get(threshold - 1)
            .copied()
            .unwrap_or(ChainVersion::GENESIS))
    }
}

impl WitnessPolicy for ChainState {
    fn create_vesting(&mut self, to: &AccountName, steem: Asset) -> Result<Asset, ChainError> {
        let price = self.props()?.vesting_share_price()?;
        let new_vesting = steem.mul_price(&price)?;

        self.update_account(to, |a| {
            add_to(&mut a.vesting_shares, new_vesting)?;
            Ok(())
        })?;
        self.update_props(|p| {
            add_to(&mut p.total_vesting_fund_steem, steem)?;
            add_to(&mut p.total_vesting_shares, new_vesting)?;
            Ok(())
        })?;
        self.adjust_proxied_witness_votes(to, new_vesting.amount, 0)?;
        Ok(new_vesting)
    }

    fn adjust_witness_vote(&mut self, witness: &AccountName, delta: i64) -> Result<(), ChainError> {
        let now = self.witness_schedule()?.current_virtual_time;
        let total_vests = self.props()?.total_vesting_shares.amount;
        let lap = self.lap_length();
        let clamp = self.has_hardfork(hardfork::SCHEDULE_TIME_CLAMP);

        self.update_witness(witness, |w| {
            w.virtual_position =
                advance_position(w.virtual_position, w.votes, w.virtual_last_update, now);
            w.virtual_last_update = now;
            w.votes += delta;
            if w.votes > total_vests {
                return Err(InternalError::Invariant(format!(
                    "witness {} votes {} exceed total vesting shares {total_vests}",
                    w.owner, w.votes
                ))
                .into());
            }

            w.virtual_scheduled_time = scheduled_time(now, w.virtual_position, w.votes, lap);
            if clamp {
                w.virtual_scheduled_time = clamp_scheduled_time(w.virtual_scheduled_time, now);
            }
            Ok(())
        })
    }

    fn adjust_witness_votes(
        &mut self,
        account: &AccountName,
        delta: i64,
    ) -> Result<(), ChainError> {
        for vote in self.approved_witnesses(account) {
            self.adjust_witness_vote(&vote.witness, delta)?;
        }
        Ok(())
    }

    fn adjust_proxied_witness_votes(
        &mut self,
        account: &AccountName,
        delta: i64,
        depth: usize,
    ) -> Result<(), ChainError> {
        let mut visited = BTreeSet::from([account.clone()]);
        let mut current = account.clone();
        let mut depth = depth;

        loop {
            let proxy = self.account(&current)?.proxy.clone();
            if proxy.is_none() {
                return self.adjust_witness_votes(&current, delta);
            }
            if depth >= MAX_PROXY_RECURSION_DEPTH {
                tracing::trace!(account = %account, delta, "proxied vote past recursion limit dropped");
                return Ok(());
            }
            if !visited.insert(proxy.clone()) {
                return Err(proxy_cycle(&proxy));
            }

            self.update_account(&proxy, |a| {
                a.proxied_vsf_votes[depth] += delta;
                Ok(())
            })?;
            current = proxy;
            depth += 1;
        }
    }

    fn adjust_proxied_witness_vote_layers(
        &mut self,
        account: &AccountName,
        delta: &VoteLayers,
        depth: usize,
    ) -> Result<(), ChainError> {
        let mut visited = BTreeSet::from([account.clone()]);
        let mut current = account.clone();
        let mut depth = depth;

        loop {
            let proxy = self.account(&current)?.proxy.clone();
            if proxy.is_none() {
                let total: i64 = delta[..=MAX_PROXY_RECURSION_DEPTH.saturating_sub(depth)]
                    .iter()
                    .sum();
                return self.adjust_witness_votes(&current, total);
            }
            if depth >= MAX_PROXY_RECURSION_DEPTH {
                return Ok(());
            }
            if !visited.insert(proxy.clone()) {
                return Err(proxy_cycle(&proxy));
            }

            self.update_account(&proxy, |a| {
                for layer in 0..MAX_PROXY_RECURSION_DEPTH - depth {
                    a.proxied_vsf_votes[layer + depth] += delta[layer];
                }
                Ok(())
            })?;
            current = proxy;
            depth += 1;
        }
    }

    fn check_proxy_chain(
        &self,
        account: &AccountName,
        proxy: &AccountName,
    ) -> Result<(), ChainError> {
        let mut chain = BTreeSet::from([account.clone(), proxy.clone()]);
        let mut next = self.account(proxy)?.proxy.clone();

        while !next.is_none() {
            if !chain.insert(next.clone()) {
                return Err(ValidationError::ProxyLoop { account: next }.into());
            }
            if chain.len() > MAX_PROXY_RECURSION_DEPTH {
                return Err(ValidationError::ProxyChainTooLong {
                    length: chain.len(),
                    max: MAX_PROXY_RECURSION_DEPTH,
                }
                .into());
            }
            next = self.account(&next)?.proxy.clone();
        }
        Ok(())
    }

    fn clear_witness_votes(&mut self, account: &AccountName) -> Result<(), ChainError> {
        for vote in self.approved_witnesses(account) {
            self.db.remove::<WitnessVote>(vote.id)?;
        }
        if self.has_hardfork(hardfork::CLEAR_VOTE_COUNT) {
            self.update_account(account, |a| {
                a.witnesses_voted_for = 0;
                Ok(())
            })?;
        }
        Ok(())
    }

    fn process_decline_voting_rights(&mut self) -> Result<(), ChainError> {
        let now = self.head_block_time()?;
        let effective = super::due::<DeclineVotingRightsRequest, _>(
            &self.db,
            DeclineVotingRightsRequest::BY_EFFECTIVE_DATE,
            |r| r.effective_date <= now,
        );

        for request in effective {
            let account = self.account(&request.account)?.clone();
            let mut delta: VoteLayers = [0; MAX_PROXY_RECURSION_DEPTH + 1];
            delta[0] = -account.vesting_shares.amount;
            for (layer, votes) in account.proxied_vsf_votes.iter().enumerate() {
                delta[layer + 1] = -votes;
            }

            self.adjust_proxied_witness_vote_layers(&account.name, &delta, 0)?;
            self.clear_witness_votes(&account.name)?;
            self.update_account(&account.name, |a| {
                a.can_vote = false;
                a.proxy = AccountName::none();
                Ok(())
            })?;
            self.db.remove::<DeclineVotingRightsRequest>(request.id)?;
            tracing::info!(account = %account.name, "voting rights declined");
        }
        Ok(())
    }

    fn retally_witness_votes(&mut self) -> Result<(), ChainError> {
        let witnesses: Vec<_> = self.db.all::<Witness>().map(|w| w.id).collect();
        for id in witnesses {
            self.db.modify::<Witness, _>(id, |w| {
                w.votes = 0;
                w.virtual_position = 0;
            })?;
        }

        let voters: Vec<Account> = self
            .db
            .all::<Account>()
            .filter(|a| a.proxy.is_none())
            .cloned()
            .collect();
        for voter in voters {
            let weight = voter.witness_vote_weight();
            for vote in self.approved_witnesses(&voter.name) {
                self.adjust_witness_vote(&vote.witness, weight)?;
            }
        }
        Ok(())
    }

    fn retally_witness_vote_counts(&mut self, force: bool) -> Result<(), ChainError> {
        let accounts: Vec<Account> = self.db.all::<Account>().cloned().collect();
        for account in accounts {
            let count = if force || !account.proxy.is_none() {
                self.approved_witnesses(&account.name).len() as u16
            } else {
                0
            };
            if account.witnesses_voted_for != count {
                self.db
                    .modify::<Account, _>(account.id, |a| a.witnesses_voted_for = count)?;
            }
        }
        Ok(())
    }

    fn update_median_witness_props(&mut self) -> Result<(), ChainError> {
        let active = self
            .witness_schedule()?
            .current_shuffled_witnesses
            .iter()
            .map(|name| self.witness(name).map(|w| w.props.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        let (Some(fee), Some(block_size), Some(interest)) = (
            median_by_key(&active, |p| p.account_creation_fee.amount),
            median_by_key(&active, |p| p.maximum_block_size),
            median_by_key(&active, |p| p.sbd_interest_rate),
        ) else {
            return Ok(());
        };
        let fee = fee.account_creation_fee;
        let block_size = block_size.maximum_block_size;
        let interest = interest.sbd_interest_rate;

        self.db.modify_singleton::<WitnessSchedule, _>(|s| {
            s.median_props.account_creation_fee = fee;
            s.median_props.maximum_block_size = block_size;
            s.median_props.sbd_interest_rate = interest;
        })?;
        self.modify_props(|p| {
            p.maximum_block_size = block_size;
            p.sbd_interest_rate = interest;
        })
    }

    fn reset_virtual_schedule_time(&mut self) -> Result<(), ChainError> {
        self.db
            .modify_singleton::<WitnessSchedule, _>(|s| s.current_virtual_time = 0)?;

        let witnesses: Vec<_> = self.db.all::<Witness>().map(|w| w.id).collect();
        for id in witnesses {
            self.db.modify::<Witness, _>(id, |w| {
                w.virtual_position = 0;
                w.virtual_last_update = 0;
                w.virtual_scheduled_time =
                    scheduled_time(0, 0, w.votes, VIRTUAL_SCHEDULE_LAP_LENGTH2);
            })?;
        }
        tracing::debug!("virtual schedule time reset");
        Ok(())
    }

    fn update_witness_schedule(&mut self) -> Result<(), ChainError> {
        let head = self.head_block_num()?;
        let schedule = self.witness_schedule()?.clone();
        if head < schedule.next_shuffle_block_num {
            return Ok(());
        }

        let mut top: Vec<AccountName> = self
            .db
            .iter::<Witness>(Witness::BY_VOTE)
            .filter(|w| !w.signing_key.is_empty())
            .take(MAX_VOTED_WITNESSES)
            .map(|w| w.owner.clone())
            .collect();
        let selected: BTreeSet<AccountName> = top.iter().cloned().collect();

        let timeshare = self
            .db
            .iter::<Witness>(Witness::BY_SCHEDULE_TIME)
            .find(|w| !w.signing_key.is_empty() && !selected.contains(&w.owner))
            .cloned();

        let mut virtual_time = schedule.current_virtual_time;
        let mut reset = false;
        if let Some(witness) = &timeshare {
            virtual_time = witness.virtual_scheduled_time;
            if virtual_time < schedule.current_virtual_time {
                reset = true;
                virtual_time = 0;
            }

            let lap = self.lap_length();
            let clamp = self.has_hardfork(hardfork::SCHEDULE_TIME_CLAMP);
            self.db.modify::<Witness, _>(witness.id, |w| {
                w.virtual_position = 0;
                w.virtual_last_update = virtual_time;
                w.virtual_scheduled_time = scheduled_time(virtual_time, 0, w.votes, lap);
                if clamp {
                    w.virtual_scheduled_time =
                        clamp_scheduled_time(w.virtual_scheduled_time, virtual_time);
                }
            })?;
            top.push(witness.owner.clone());
        }

        let slots: Vec<_> = self
            .db
            .all::<Witness>()
            .filter_map(|w| {
                let slot = if selected.contains(&w.owner) {
                    ScheduleSlot::Top
                } else if timeshare.as_ref().is_some_and(|t| t.id == w.id) {
                    ScheduleSlot::Timeshare
                } else {
                    ScheduleSlot::None
                };
                (w.schedule != slot).then_some((w.id, slot))
            })
            .collect();
        for (id, slot) in slots {
            self.db.modify::<Witness, _>(id, |w| w.schedule = slot)?;
        }

        shuffle(&mut top, self.head_block_time()?.secs());
        let majority = self.majority_version(&top)?;
        let round_length = top.len().max(1) as u32;

        self.db.modify_singleton::<WitnessSchedule, _>(|s| {
            s.current_virtual_time = virtual_time;
            s.next_shuffle_block_num = head + round_length;
            s.current_shuffled_witnesses = top;
            s.majority_version = majority;
        })?;
        if reset {
            self.reset_virtual_schedule_time()?;
        }
        self.update_median_witness_props()?;

        tracing::debug!(
            block_num = head,
            witnesses = round_length,
            majority = %majority,
            "witness schedule updated"
        );
        Ok(())
    }

    fn scheduled_witness(&self, slot_num: u32) -> Result<AccountName, ChainError> {
        let aslot = self.props()?.current_aslot + u64::from(slot_num);
        let witnesses = &self.witness_schedule()?.current_shuffled_witnesses;
        if witnesses.is_empty() {
            return Err(ChainError::not_found(WitnessSchedule::KIND, "scheduled witness"));
        }
        Ok(witnesses[(aslot % witnesses.len() as u64) as usize].clone())
    }

    fn witness_participation_rate(&self) -> Result<u32, ChainError> {
        Ok(participation_rate(self.props()?.recent_slots_filled))
    }
}
