//! # Ledger Service
//!
//! Implements [`StateTransitionApi`]: block validation against the head,
//! the per-block undo session, transaction application, maintenance
//! sweeps and virtual operation delivery.
//!
//! ## Block Pipeline
//!
//! 1. Check the block extends the head on a scheduled slot.
//! 2. Open the block undo session, advance head data and the active version.
//! 3. Apply each transaction in a nested session. Business-rule failures
//!    drop the transaction; internal failures drop the whole block.
//! 4. Run the maintenance sweeps in their fixed order.
//! 5. Check the supply invariants, publish the virtual operations and keep
//!    the block reversible until it falls past `max_undo_depth`.

use super::genesis::{init_genesis, Genesis};
use super::hardforks::advance_version;
use crate::config::LedgerConfig;
use crate::domain::constants::BLOCK_INTERVAL;
use crate::domain::invariants::validate_invariants;
use crate::domain::{Block, ChainError, ChainVersion, Timestamp, Transaction, Witness};
use crate::evaluators::{default_registry, EvaluationContext, EvaluatorRegistry};
use crate::policies::{
    AccountPolicy, AssetPolicy, OrderPolicy, RewardPolicy, WithdrawalPolicy, WitnessPolicy,
};
use crate::ports::inbound::{BlockReceipt, FailedTransaction, StateTransitionApi};
use crate::ports::outbound::{HardforkOracle, InterpreterLookup, VirtualOperationSink};
use crate::state::ChainState;
use std::collections::VecDeque;
use std::sync::Arc;

/// Bookkeeping for a block that can still be popped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ReversibleBlock {
    block_num: u32,
    /// Revision of the block's undo session.
    revision: u64,
    /// Version in force before the block advanced it.
    previous_version: ChainVersion,
}

/// The state transition service.
pub struct Ledger {
    state: ChainState,
    registry: EvaluatorRegistry,
    config: LedgerConfig,
    oracle: Arc<dyn HardforkOracle>,
    sink: Arc<dyn VirtualOperationSink>,
    interpreters: Arc<dyn InterpreterLookup>,
    /// Oldest first.
    reversible: VecDeque<ReversibleBlock>,
}

impl Ledger {
    /// Builds the genesis state and wires the host dependencies.
    pub fn new(
        config: LedgerConfig,
        genesis: &Genesis,
        oracle: Arc<dyn HardforkOracle>,
        sink: Arc<dyn VirtualOperationSink>,
        interpreters: Arc<dyn InterpreterLookup>,
    ) -> Result<Self, ChainError> {
        let mut state = ChainState::new(config.state_flags())?;
        init_genesis(&mut state, genesis)?;

        Ok(Self {
            state,
            registry: default_registry()?,
            config,
            oracle,
            sink,
            interpreters,
            reversible: VecDeque::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Slot of `when` counted from the head block; 0 if `when` is not after
    /// the head.
    pub fn slot_at_time(&self, when: Timestamp) -> Result<u32, ChainError> {
        let first_slot = self.state.head_block_time()?.plus(BLOCK_INTERVAL);
        if when < first_slot {
            return Ok(0);
        }
        Ok(when.since(first_slot) / BLOCK_INTERVAL + 1)
    }

    /// Empty block for `slot`, signed by the witness scheduled for it.
    pub fn next_block(&self, slot: u32) -> Result<Block, ChainError> {
        let head_time = self.state.head_block_time()?;
        Ok(Block::new(
            self.state.head_block_num()? + 1,
            head_time.plus(slot.saturating_mul(BLOCK_INTERVAL)),
            self.state.scheduled_witness(slot)?,
        ))
    }

    fn check_header(&self, block: &Block) -> Result<u32, ChainError> {
        let head = self.state.head_block_num()?;
        if block.block_num != head + 1 {
            return Err(ChainError::rule(format!(
                "Block {} does not extend head {head}",
                block.block_num
            )));
        }

        let slot = self.slot_at_time(block.timestamp)?;
        if slot == 0 {
            return Err(ChainError::rule(format!(
                "Block time {} is not after head time {}",
                block.timestamp,
                self.state.head_block_time()?
            )));
        }

        self.state.witness(&block.witness)?;
        let scheduled = self.state.scheduled_witness(slot)?;
        if scheduled != block.witness {
            return Err(ChainError::rule(format!(
                "Witness {} produced block {} in a slot scheduled for {scheduled}",
                block.witness, block.block_num
            )));
        }
        Ok(slot)
    }

    fn apply(&mut self, block: &Block, producing: bool) -> Result<BlockReceipt, ChainError> {
        let slot = self.check_header(block)?;

        let previous_version = self.state.version();
        let revision = self.state.db.start_undo_session();

        let receipt = match self.apply_in_session(block, slot, producing) {
            Ok(receipt) => receipt,
            Err(err) => {
                self.state.db.undo()?;
                self.state.set_version(previous_version);
                let _ = self.state.take_virtual_operations();
                tracing::error!(block_num = block.block_num, error = %err, "block rejected");
                return Err(err);
            }
        };

        self.sink
            .publish(block.block_num, &receipt.virtual_operations);

        self.reversible.push_back(ReversibleBlock {
            block_num: block.block_num,
            revision,
            previous_version,
        });
        while self.reversible.len() > self.config.max_undo_depth {
            if let Some(oldest) = self.reversible.pop_front() {
                self.state.db.commit(oldest.revision);
            }
        }

        tracing::info!(
            block_num = block.block_num,
            witness = %block.witness,
            applied = receipt.applied_transactions,
            failed = receipt.failed_transactions.len(),
            virtual_ops = receipt.virtual_operations.len(),
            version = %self.state.version(),
            "block applied"
        );
        Ok(receipt)
    }

    fn apply_in_session(
        &mut self,
        block: &Block,
        slot: u32,
        producing: bool,
    ) -> Result<BlockReceipt, ChainError> {
        self.update_global_dynamic_data(block, slot)?;

        let target = self.oracle.version_at(block.block_num, block.timestamp);
        advance_version(&mut self.state, target)?;

        let mut receipt = BlockReceipt {
            block_num: block.block_num,
            ..BlockReceipt::default()
        };
        for (index, transaction) in block.transactions.iter().enumerate() {
            match self.apply_transaction(transaction, producing) {
                Ok(()) => receipt.applied_transactions += 1,
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    tracing::warn!(
                        block_num = block.block_num,
                        index,
                        error = %err,
                        "transaction dropped"
                    );
                    receipt.failed_transactions.push(FailedTransaction {
                        index,
                        error: err.to_string(),
                    });
                }
            }
        }

        self.update_signing_witness(block)?;
        self.run_maintenance()?;

        if self.config.check_invariants {
            validate_invariants(&self.state.db)?;
        }

        receipt.virtual_operations = self.state.take_virtual_operations();
        Ok(receipt)
    }

    fn apply_transaction(
        &mut self,
        transaction: &Transaction,
        producing: bool,
    ) -> Result<(), ChainError> {
        transaction.validate()?;

        let registry = &self.registry;
        let interpreters = self.interpreters.as_ref();
        self.state.with_session(|state| {
            let mut ctx = EvaluationContext::new(state, interpreters).producing(producing);
            transaction
                .operations
                .iter()
                .try_for_each(|op| registry.apply(&mut ctx, op))
        })
    }

    /// Head number, time and producer; absolute slot and the participation
    /// window. Witnesses scheduled for skipped slots are charged a miss.
    fn update_global_dynamic_data(&mut self, block: &Block, slot: u32) -> Result<(), ChainError> {
        let missed = slot - 1;
        let depth = u32::try_from(self.config.max_undo_depth).unwrap_or(u32::MAX);
        for skipped in 1..=missed {
            let owner = self.state.scheduled_witness(skipped)?;
            if owner != block.witness {
                self.state.update_witness(&owner, |w| {
                    w.total_missed += 1;
                    Ok(())
                })?;
            }
        }

        self.state.modify_props(|p| {
            let shift = missed + 1;
            p.recent_slots_filled = if shift < u128::BITS {
                (p.recent_slots_filled << shift) | (1u128 << missed)
            } else {
                0
            };
            p.participation_count = p.recent_slots_filled.count_ones() as u8;

            p.head_block_number = block.block_num;
            p.head_block_time = block.timestamp;
            p.current_witness = block.witness.clone();
            p.current_aslot += u64::from(slot);
            p.last_irreversible_block_num = p
                .last_irreversible_block_num
                .max(block.block_num.saturating_sub(depth));
        })?;

        if missed > 0 {
            tracing::debug!(block_num = block.block_num, missed, "missed slots before block");
        }
        Ok(())
    }

    fn update_signing_witness(&mut self, block: &Block) -> Result<(), ChainError> {
        let block_num = block.block_num;
        self.state.update_witness(&block.witness, |w: &mut Witness| {
            w.last_confirmed_block_num = block_num;
            Ok(())
        })
    }

    fn run_maintenance(&mut self) -> Result<(), ChainError> {
        let state = &mut self.state;
        state.clear_expired_orders()?;
        state.clear_expired_delegations()?;
        state.update_witness_schedule()?;
        state.update_median_feed()?;
        state.update_virtual_supply()?;
        state.clear_null_account_balance()?;
        state.process_funds()?;
        state.process_conversions()?;
        state.process_vesting_withdrawals()?;
        state.process_savings_withdraws()?;
        state.pay_liquidity_reward()?;
        state.update_virtual_supply()?;
        state.account_recovery_processing()?;
        state.expire_escrow_ratification()?;
        state.process_decline_voting_rights()?;
        Ok(())
    }
}

impl StateTransitionApi for Ledger {
    fn apply_block(&mut self, block: &Block) -> Result<BlockReceipt, ChainError> {
        self.apply(block, false)
    }

    fn produce_block(&mut self, block: &Block) -> Result<BlockReceipt, ChainError> {
        self.apply(block, true)
    }

    fn pop_block(&mut self) -> Result<(), ChainError> {
        let Some(block) = self.reversible.pop_back() else {
            return Err(ChainError::rule("No reversible block to pop"));
        };
        self.state.db.undo()?;
        self.state.set_version(block.previous_version);
        tracing::info!(block_num = block.block_num, "block popped");
        Ok(())
    }

    fn reversible_blocks(&self) -> usize {
        self.reversible.len()
    }

    fn state(&self) -> &ChainState {
        &self.state
    }
}
