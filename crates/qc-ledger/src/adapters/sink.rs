//! Virtual operation sinks.

use crate::domain::VirtualOperation;
use crate::ports::VirtualOperationSink;
use parking_lot::Mutex;

/// Keeps every published batch in memory, tagged with its block number.
#[derive(Debug, Default)]
pub struct RecordingSink {
    published: Mutex<Vec<(u32, Vec<VirtualOperation>)>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All virtual operations published so far, in order.
    #[must_use]
    pub fn operations(&self) -> Vec<VirtualOperation> {
        self.published
            .lock()
            .iter()
            .flat_map(|(_, ops)| ops.iter().cloned())
            .collect()
    }

    /// Virtual operations published for `block_num`.
    #[must_use]
    pub fn operations_for(&self, block_num: u32) -> Vec<VirtualOperation> {
        self.published
            .lock()
            .iter()
            .filter(|(num, _)| *num == block_num)
            .flat_map(|(_, ops)| ops.iter().cloned())
            .collect()
    }

    #[must_use]
    pub fn batches(&self) -> usize {
        self.published.lock().len()
    }
}

impl VirtualOperationSink for RecordingSink {
    fn publish(&self, block_num: u32, operations: &[VirtualOperation]) {
        self.published.lock().push((block_num, operations.to_vec()));
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl VirtualOperationSink for NullSink {
    fn publish(&self, _block_num: u32, _operations: &[VirtualOperation]) {}
}
