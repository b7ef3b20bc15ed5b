//! # Outbound Ports (Driven Ports)
//!
//! Dependencies the ledger requires from its host.

use crate::domain::{
    ChainError, ChainVersion, CustomBinaryOperation, CustomJsonOperation, Timestamp,
    VirtualOperation,
};
use crate::state::ChainState;
use std::sync::Arc;

/// Source of the rule set in force for a block.
///
/// Must be monotonic: a later block never maps to an earlier version.
pub trait HardforkOracle: Send + Sync {
    fn version_at(&self, block_num: u32, time: Timestamp) -> ChainVersion;
}

/// Receives the virtual operations of every applied block, in order.
pub trait VirtualOperationSink: Send + Sync {
    fn publish(&self, block_num: u32, operations: &[VirtualOperation]);
}

/// A custom operation handed to a plugin interpreter.
#[derive(Debug, Clone, Copy)]
pub enum CustomPayload<'a> {
    Json(&'a CustomJsonOperation),
    Binary(&'a CustomBinaryOperation),
}

impl CustomPayload<'_> {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            CustomPayload::Json(op) => &op.id,
            CustomPayload::Binary(op) => &op.id,
        }
    }
}

/// Plugin logic for custom operations with a given id.
pub trait CustomOperationInterpreter: Send + Sync {
    fn apply(&self, state: &mut ChainState, payload: CustomPayload<'_>) -> Result<(), ChainError>;
}

/// Resolves the interpreter registered for a custom operation id.
pub trait InterpreterLookup: Send + Sync {
    fn interpreter(&self, id: &str) -> Option<Arc<dyn CustomOperationInterpreter>>;
}

// =============================================================================
// TEST DOUBLES
// =============================================================================
