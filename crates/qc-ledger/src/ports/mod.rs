//! # Ports
//!
//! - [`inbound`]: what the ledger offers its host.
//! - [`outbound`]: what the ledger needs from its host.

pub mod inbound;
pub mod outbound;

pub use inbound::{BlockReceipt, FailedTransaction, StateTransitionApi};
pub use outbound::{
    CustomOperationInterpreter, CustomPayload, HardforkOracle, InterpreterLookup,
    VirtualOperationSink,
};
