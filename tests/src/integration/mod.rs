//! Scenario tests through the block lifecycle service.

pub mod support;

mod block_lifecycle;
mod hardforks;
mod market;
mod plugins;
mod witnesses;
