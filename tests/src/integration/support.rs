//! # Test Chain
//!
//! A [`Ledger`] at genesis with a recording sink and an interpreter
//! registry, plus helpers that wrap operations into blocks.

use qc_ledger::domain::constants::INIT_MINER_NAME;
use qc_ledger::domain::hardfork::Hardfork;
use qc_ledger::domain::{
    AccountCreateOperation, AccountName, Asset, Authority, Block, Operation, TransferOperation,
};
use qc_ledger::{
    BlockReceipt, Genesis, InterpreterRegistry, Ledger, LedgerConfig, RecordingSink,
    ScheduledHardforks, StateTransitionApi,
};
use std::sync::Arc;

pub const INITIAL_SUPPLY: i64 = 10_000_000;

/// Covers the account creation fee at every version.
pub const CREATION_FEE: i64 = 30;

pub struct TestChain {
    pub ledger: Ledger,
    pub sink: Arc<RecordingSink>,
    pub interpreters: Arc<InterpreterRegistry>,
}

impl TestChain {
    /// Chain with hardforks up to `hardfork` active from block 1.
    pub fn new(hardfork: Hardfork) -> Self {
        Self::with_oracle(LedgerConfig::default(), ScheduledHardforks::up_to(hardfork))
    }

    pub fn with_oracle(config: LedgerConfig, oracle: ScheduledHardforks) -> Self {
        let sink = Arc::new(RecordingSink::new());
        let interpreters = Arc::new(InterpreterRegistry::new());
        let ledger = Ledger::new(
            config,
            &genesis(),
            Arc::new(oracle),
            sink.clone(),
            interpreters.clone(),
        )
        .expect("genesis");
        Self {
            ledger,
            sink,
            interpreters,
        }
    }

    /// Next block on the first free slot, one transaction per operation.
    pub fn block(&self, operations: Vec<Operation>) -> Block {
        self.block_at_slot(1, operations)
    }

    pub fn block_at_slot(&self, slot: u32, operations: Vec<Operation>) -> Block {
        operations.into_iter().fold(
            self.ledger.next_block(slot).expect("scheduled witness"),
            |block, op| block.with_transaction(op),
        )
    }

    pub fn push(&mut self, operations: Vec<Operation>) -> BlockReceipt {
        let block = self.block(operations);
        self.ledger.apply_block(&block).expect("block applies")
    }

    pub fn push_empty(&mut self, count: usize) {
        for _ in 0..count {
            self.push(Vec::new());
        }
    }

    /// Creates `name` funded with `steem` from the initial miner. A zero
    /// amount only creates the account.
    pub fn fund_account(&mut self, name: &str, steem: i64) -> AccountName {
        let mut operations = vec![create_account(name)];
        if steem > 0 {
            operations.push(transfer(INIT_MINER_NAME, name, Asset::steem(steem)));
        }
        let receipt = self.push(operations);
        assert!(
            receipt.failed_transactions.is_empty(),
            "funding {name} failed: {:?}",
            receipt.failed_transactions
        );
        name.into()
    }

    pub fn balance(&self, name: &str) -> Asset {
        self.ledger.state().account(&name.into()).expect("account").balance
    }

    pub fn savings(&self, name: &str) -> Asset {
        self.ledger
            .state()
            .account(&name.into())
            .expect("account")
            .savings_balance
    }

    pub fn head(&self) -> u32 {
        self.ledger.state().head_block_num().expect("head")
    }
}

pub fn genesis() -> Genesis {
    Genesis {
        initial_supply: INITIAL_SUPPLY,
        ..Genesis::default()
    }
}

pub fn miner() -> AccountName {
    INIT_MINER_NAME.into()
}

pub fn key(name: &str) -> String {
    format!("STM{name}key")
}

/// Account creation by the initial miner.
pub fn create_account(name: &str) -> Operation {
    let authority = Authority::from_key(key(name));
    AccountCreateOperation {
        fee: Asset::steem(CREATION_FEE),
        creator: miner(),
        new_account_name: name.into(),
        owner: authority.clone(),
        active: authority.clone(),
        posting: authority,
        memo_key: key(name),
        json_metadata: String::new(),
    }
    .into()
}

pub fn transfer(from: &str, to: &str, amount: Asset) -> Operation {
    TransferOperation {
        from: from.into(),
        to: to.into(),
        amount,
        memo: String::new(),
    }
    .into()
}
