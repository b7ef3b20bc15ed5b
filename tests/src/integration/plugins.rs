//! # Plugins and Virtual Operations
//!
//! Custom operations reach registered interpreters; every block's virtual
//! operations reach the sink.

#[cfg(test)]
mod tests {
    use crate::integration::support::{miner, transfer, TestChain};
    use parking_lot::Mutex;
    use qc_ledger::domain::constants::SAVINGS_WITHDRAW_TIME;
    use qc_ledger::domain::{
        Asset, ChainError, CustomJsonOperation, Operation, TransferFromSavingsOperation,
        TransferToSavingsOperation, VirtualOperation,
    };
    use qc_ledger::ports::{CustomOperationInterpreter, CustomPayload};
    use qc_ledger::policies::AccountPolicy;
    use qc_ledger::{ChainState, StateTransitionApi};
    use std::collections::BTreeSet;
    use std::sync::Arc;

    /// Charges the poster one STEEM per follow, paid to the initial miner,
    /// and rejects `"bad"` payloads.
    #[derive(Default)]
    struct FollowPlugin {
        follows: Mutex<Vec<String>>,
    }

    impl CustomOperationInterpreter for FollowPlugin {
        fn apply(&self, state: &mut ChainState, payload: CustomPayload<'_>) -> Result<(), ChainError> {
            let CustomPayload::Json(op) = payload else {
                return Ok(());
            };
            for poster in &op.required_posting_auths {
                state.adjust_balance(poster, -Asset::steem(1))?;
                state.adjust_balance(&miner(), Asset::steem(1))?;
            }
            if op.json == "\"bad\"" {
                return Err(ChainError::rule("unfollowable"));
            }
            self.follows.lock().push(op.json.clone());
            Ok(())
        }
    }

    fn follow(json: &str) -> Operation {
        CustomJsonOperation {
            required_auths: BTreeSet::new(),
            required_posting_auths: ["alice".into()].into_iter().collect(),
            id: "follow".into(),
            json: json.into(),
        }
        .into()
    }

    fn with_plugin() -> (TestChain, Arc<FollowPlugin>) {
        let mut chain = TestChain::new(0);
        let plugin = Arc::new(FollowPlugin::default());
        chain
            .interpreters
            .register("follow", plugin.clone())
            .unwrap();
        chain.fund_account("alice", 10);
        (chain, plugin)
    }

    #[test]
    fn test_interpreter_applies_custom_json() {
        let (mut chain, plugin) = with_plugin();
        let miner_before = chain.balance(miner().as_str());
        let receipt = chain.push(vec![follow("\"bob\"")]);

        assert_eq!(receipt.applied_transactions, 1);
        assert_eq!(*plugin.follows.lock(), vec!["\"bob\"".to_string()]);
        assert_eq!(chain.balance("alice"), Asset::steem(9));
        assert_eq!(
            chain.balance(miner().as_str()),
            Asset::steem(miner_before.amount + 1)
        );
    }

    #[test]
    fn test_interpreter_failure_only_undoes_its_writes() {
        let (mut chain, plugin) = with_plugin();
        let receipt = chain.push(vec![follow("\"bad\""), transfer("alice", "initminer", Asset::steem(2))]);

        assert_eq!(receipt.applied_transactions, 2);
        assert!(plugin.follows.lock().is_empty());
        assert_eq!(chain.balance("alice"), Asset::steem(8));
    }

    #[test]
    fn test_interpreter_failure_drops_transaction_when_producing() {
        let (mut chain, _) = with_plugin();
        let block = chain.block(vec![follow("\"bad\"")]);
        let receipt = chain.ledger.produce_block(&block).unwrap();

        assert_eq!(receipt.applied_transactions, 0);
        assert!(receipt.failed_transactions[0].error.contains("follow"));
        assert_eq!(chain.balance("alice"), Asset::steem(10));
    }

    #[test]
    fn test_unregistered_id_is_ignored() {
        let (mut chain, plugin) = with_plugin();
        chain.interpreters.unregister("follow");
        let receipt = chain.push(vec![follow("\"bob\"")]);

        assert_eq!(receipt.applied_transactions, 1);
        assert!(plugin.follows.lock().is_empty());
    }

    #[test]
    fn test_savings_withdrawal_emits_virtual_operation() {
        let mut chain = TestChain::new(0);
        chain.fund_account("alice", 100);
        chain.push(vec![
            TransferToSavingsOperation {
                from: "alice".into(),
                to: "alice".into(),
                amount: Asset::steem(40),
                memo: String::new(),
            }
            .into(),
            TransferFromSavingsOperation {
                from: "alice".into(),
                request_id: 9,
                to: "alice".into(),
                amount: Asset::steem(40),
                memo: "back".into(),
            }
            .into(),
        ]);
        assert_eq!(chain.savings("alice"), Asset::steem(0));
        assert_eq!(chain.balance("alice"), Asset::steem(60));

        let block = chain.block_at_slot(SAVINGS_WITHDRAW_TIME / 3, Vec::new());
        let receipt = chain.ledger.apply_block(&block).unwrap();

        let expected = VirtualOperation::FillTransferFromSavings {
            from: "alice".into(),
            to: "alice".into(),
            amount: Asset::steem(40),
            request_id: 9,
            memo: "back".into(),
        };
        assert!(receipt.virtual_operations.contains(&expected));
        assert!(chain.sink.operations_for(block.block_num).contains(&expected));
        assert_eq!(chain.balance("alice"), Asset::steem(100));
    }
}
