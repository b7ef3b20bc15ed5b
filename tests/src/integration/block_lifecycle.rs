//! # Block Lifecycle
//!
//! Transactions apply in order within a block, failures are excluded as a
//! whole, and blocks stay reversible until they leave the undo window.

#[cfg(test)]
mod tests {
    use crate::integration::support::{transfer, TestChain, INITIAL_SUPPLY};
    use qc_ledger::domain::constants::INIT_MINER_NAME;
    use qc_ledger::domain::{Asset, Operation, Transaction};
    use qc_ledger::{LedgerConfig, ScheduledHardforks, StateTransitionApi};

    #[test]
    fn test_transactions_apply_in_block_order() {
        let mut chain = TestChain::new(0);
        chain.fund_account("alice", 500);
        chain.fund_account("bob", 0);

        let receipt = chain.push(vec![
            transfer("alice", "bob", Asset::steem(300)),
            transfer("bob", "alice", Asset::steem(100)),
            // alice holds 300 here, not enough for a second 300
            transfer("alice", "bob", Asset::steem(301)),
        ]);

        assert_eq!(receipt.applied_transactions, 2);
        assert_eq!(receipt.failed_transactions.len(), 1);
        assert_eq!(receipt.failed_transactions[0].index, 2);
        assert_eq!(chain.balance("alice"), Asset::steem(300));
        assert_eq!(chain.balance("bob"), Asset::steem(200));
    }

    #[test]
    fn test_failed_transaction_rolls_back_every_operation() {
        let mut chain = TestChain::new(0);
        chain.fund_account("alice", 100);
        chain.fund_account("bob", 0);

        let operations: Vec<Operation> = vec![
            transfer("alice", "bob", Asset::steem(60)),
            transfer("alice", "bob", Asset::steem(60)),
        ];
        let block = chain
            .ledger
            .next_block(1)
            .unwrap()
            .with_transaction(Transaction::new(operations));
        let receipt = chain.ledger.apply_block(&block).unwrap();

        assert_eq!(receipt.applied_transactions, 0);
        assert_eq!(chain.balance("alice"), Asset::steem(100));
        assert_eq!(chain.balance("bob"), Asset::steem(0));
    }

    #[test]
    fn test_empty_transaction_is_rejected() {
        let mut chain = TestChain::new(0);
        let block = chain
            .ledger
            .next_block(1)
            .unwrap()
            .with_transaction(Transaction::default());
        let receipt = chain.ledger.apply_block(&block).unwrap();

        assert_eq!(receipt.failed_transactions.len(), 1);
        assert_eq!(chain.head(), 1);
    }

    #[test]
    fn test_pop_blocks_back_to_genesis() {
        let mut chain = TestChain::new(0);
        chain.fund_account("alice", 1_000);
        chain.push(vec![transfer("alice", INIT_MINER_NAME, Asset::steem(250))]);
        assert_eq!(chain.ledger.reversible_blocks(), 2);

        chain.ledger.pop_block().unwrap();
        assert_eq!(chain.balance("alice"), Asset::steem(1_000));
        assert_eq!(chain.head(), 1);

        chain.ledger.pop_block().unwrap();
        assert!(chain.ledger.state().find_account(&"alice".into()).is_none());
        assert_eq!(chain.balance(INIT_MINER_NAME), Asset::steem(INITIAL_SUPPLY));
        assert_eq!(chain.head(), 0);
        assert!(chain.ledger.pop_block().is_err());
    }

    #[test]
    fn test_popped_block_can_be_replaced() {
        let mut chain = TestChain::new(0);
        chain.fund_account("alice", 10);
        chain.ledger.pop_block().unwrap();

        chain.fund_account("bob", 20);
        assert_eq!(chain.head(), 1);
        assert!(chain.ledger.state().find_account(&"alice".into()).is_none());
        assert_eq!(chain.balance("bob"), Asset::steem(20));
    }

    #[test]
    fn test_blocks_past_undo_depth_are_irreversible() {
        let config = LedgerConfig {
            max_undo_depth: 3,
            ..LedgerConfig::default()
        };
        let mut chain = TestChain::with_oracle(config, ScheduledHardforks::up_to(0));
        chain.fund_account("alice", 10);
        chain.push_empty(5);

        assert_eq!(chain.head(), 6);
        assert_eq!(chain.ledger.reversible_blocks(), 3);
        for _ in 0..3 {
            chain.ledger.pop_block().unwrap();
        }
        assert!(chain.ledger.pop_block().is_err());
        // block 1 is committed
        assert_eq!(chain.balance("alice"), Asset::steem(10));
        assert_eq!(chain.head(), 3);
    }

    #[test]
    fn test_receipts_and_sink_agree() {
        let mut chain = TestChain::new(0);
        chain.fund_account("alice", 10);
        chain.push_empty(2);

        assert_eq!(chain.sink.batches(), 3);
    }
}
