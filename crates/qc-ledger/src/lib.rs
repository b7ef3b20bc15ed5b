//! # qc-ledger
//!
//! State transition core for a delegated proof-of-stake chain with an
//! internal STEEM/SBD market.
//!
//! ## Role in System
//!
//! - **Single Source of Truth**: accounts, balances, orders, witnesses and
//!   the global properties live in one transactional object store
//! - **Deterministic**: every node applying the same blocks under the same
//!   hardfork schedule reaches identical state
//! - **Reversible**: each block is an undo session until it falls out of the
//!   reversible window
//!
//! ## Layout
//!
//! ```text
//!                      ┌──────────────────────────┐
//!   Block ────────────▶│ application::Ledger      │──▶ VirtualOperationSink
//!                      └────────────┬─────────────┘
//!                                   │ per operation
//!                      ┌────────────▼─────────────┐
//!                      │ evaluators (by version)  │──▶ InterpreterLookup
//!                      └────────────┬─────────────┘
//!                                   │
//!                      ┌────────────▼─────────────┐
//!                      │ policies on ChainState   │──▶ algorithms (pure)
//!                      └────────────┬─────────────┘
//!                                   │
//!                      ┌────────────▼─────────────┐
//!                      │ store::Database          │
//!                      └──────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut ledger = Ledger::new(
//!     LedgerConfig::from_env(),
//!     &Genesis::default(),
//!     Arc::new(ScheduledHardforks::all_at_genesis()),
//!     Arc::new(NullSink),
//!     Arc::new(InterpreterRegistry::new()),
//! )?;
//! let block = ledger.next_block(1)?.with_transaction(transfer);
//! let receipt = ledger.apply_block(&block)?;
//! ```

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod evaluators;
pub mod policies;
pub mod ports;
pub mod state;
pub mod store;
pub mod telemetry;

pub use adapters::{InterpreterRegistry, NullSink, RecordingSink, ScheduledHardforks};
pub use application::{Genesis, Ledger};
pub use config::LedgerConfig;
pub use domain::{Block, ChainError, ChainVersion, Operation, Transaction, VirtualOperation};
pub use ports::{BlockReceipt, StateTransitionApi};
pub use state::{ChainState, StateFlags};
pub use telemetry::init_tracing;
