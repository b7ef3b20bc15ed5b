//! # Inbound Port (Driving Port)
//!
//! The block-level API a node drives the state transition core through.

use crate::domain::{Block, ChainError, VirtualOperation};
use crate::state::ChainState;
use serde::{Deserialize, Serialize};

/// A transaction dropped from a block because it failed to apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedTransaction {
    /// Position of the transaction in the block.
    pub index: usize,
    pub error: String,
}

/// Outcome of one applied block.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockReceipt {
    pub block_num: u32,
    pub applied_transactions: usize,
    pub failed_transactions: Vec<FailedTransaction>,
    /// Virtual operations in application order.
    pub virtual_operations: Vec<VirtualOperation>,
}

/// Primary API for applying and reverting blocks.
pub trait StateTransitionApi {
    /// Applies a block received from the network. Transactions that fail
    /// with a business-rule error are left out of the resulting state.
    fn apply_block(&mut self, block: &Block) -> Result<BlockReceipt, ChainError>;

    /// Applies a block this node is producing. Custom interpreter failures
    /// are fatal to their transaction here.
    fn produce_block(&mut self, block: &Block) -> Result<BlockReceipt, ChainError>;

    /// Reverts the most recent reversible block.
    fn pop_block(&mut self) -> Result<(), ChainError>;

    /// Number of blocks that can still be popped.
    fn reversible_blocks(&self) -> usize;

    fn state(&self) -> &ChainState;
}
