//! # Application Layer
//!
//! The [`Ledger`] service drives blocks through the state transition core:
//!
//! ```text
//! Block ──▶ header checks ──▶ head update ──▶ hardforks ──▶ transactions
//!                                                              │
//!      sink ◀── virtual ops ◀── invariants ◀── maintenance ◀───┘
//! ```
//!
//! Each block runs in its own undo session, kept open until the block falls
//! out of the reversible window.

pub mod genesis;
pub mod hardforks;
pub mod service;

pub use genesis::{init_genesis, Genesis};
pub use hardforks::{advance_version, apply_hardfork};
pub use service::Ledger;
