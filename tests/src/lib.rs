//! # Quantum-Chain Ledger Test Suite
//!
//! End-to-end scenarios that drive blocks through [`qc_ledger::Ledger`].
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── support.rs          # TestChain fixture
//!     ├── block_lifecycle.rs  # transactions, rollback, pop, irreversibility
//!     ├── hardforks.rs        # oracle-driven activation
//!     ├── market.rs           # order placement, cancellation, expiry
//!     ├── plugins.rs          # custom interpreters, virtual operations
//!     └── witnesses.rs        # votes, scheduling, missed slots
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p qc-tests
//! cargo test -p qc-tests integration::market::
//! ```

#![allow(dead_code)]

pub mod integration;
