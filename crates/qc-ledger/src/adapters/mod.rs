//! # Adapters
//!
//! In-memory implementations of the outbound ports.
//!
//! - [`ScheduledHardforks`]: activation-time table answering [`HardforkOracle`].
//! - [`RecordingSink`]: keeps every published virtual operation.
//! - [`InterpreterRegistry`]: custom operation interpreters keyed by id.
//!
//! [`HardforkOracle`]: crate::ports::HardforkOracle

pub mod hardforks;
pub mod interpreters;
pub mod sink;

pub use hardforks::ScheduledHardforks;
pub use interpreters::InterpreterRegistry;
pub use sink::{NullSink, RecordingSink};
