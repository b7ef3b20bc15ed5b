//! Blocks and transactions as the core consumes them: already signed,
//! already authority-checked, reduced to their operations.

use super::errors::{ensure, ChainError};
use super::operations::Operation;
use super::value_objects::{AccountName, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Transaction {
    pub operations: Vec<Operation>,
}

impl Transaction {
    #[must_use]
    pub fn new(operations: Vec<Operation>) -> Self {
        Self { operations }
    }

    /// Stateless checks of every operation.
    pub fn validate(&self) -> Result<(), ChainError> {
        ensure(
            !self.operations.is_empty(),
            "A transaction must have at least one operation",
        )?;
        self.operations.iter().try_for_each(Operation::validate)
    }
}

impl From<Operation> for Transaction {
    fn from(op: Operation) -> Self {
        Self::new(vec![op])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub block_num: u32,
    pub timestamp: Timestamp,
    /// Producer of the block.
    pub witness: AccountName,
    pub transactions: Vec<Transaction>,
}

impl Block {
    #[must_use]
    pub fn new(block_num: u32, timestamp: Timestamp, witness: AccountName) -> Self {
        Self {
            block_num,
            timestamp,
            witness,
            transactions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_transaction(mut self, transaction: impl Into<Transaction>) -> Self {
        self.transactions.push(transaction.into());
        self
    }
}
