//! # Hardfork Activation
//!
//! The oracle decides the version of each block; evaluators and
//! maintenance switch behaviour at the first block past an activation time.

#[cfg(test)]
mod tests {
    use crate::integration::support::{genesis, miner, transfer, TestChain};
    use qc_ledger::domain::constants::NULL_ACCOUNT;
    use qc_ledger::domain::hardfork;
    use qc_ledger::domain::{Asset, ChainVersion, CustomBinaryOperation, Timestamp};
    use qc_ledger::{LedgerConfig, ScheduledHardforks, StateTransitionApi};
    use std::collections::BTreeSet;

    /// Everything before `last` active at genesis, `last` itself after
    /// `delay` seconds.
    fn schedule(last: u8, delay: u32) -> ScheduledHardforks {
        let mut activations = vec![Timestamp::MIN; usize::from(last) - 1];
        activations.push(genesis().time.plus(delay));
        ScheduledHardforks::new(activations).unwrap()
    }

    fn binary() -> CustomBinaryOperation {
        CustomBinaryOperation {
            required_owner_auths: BTreeSet::new(),
            required_active_auths: [miner()].into_iter().collect(),
            required_posting_auths: BTreeSet::new(),
            id: "blob".into(),
            data: vec![0xde, 0xad],
        }
    }

    #[test]
    fn test_operation_enabled_at_activation() {
        let mut chain =
            TestChain::with_oracle(LedgerConfig::default(), schedule(hardfork::CUSTOM_BINARY, 9));

        let receipt = chain.push(vec![binary().into()]);
        assert_eq!(
            chain.ledger.state().version(),
            ChainVersion::hardfork(hardfork::CUSTOM_BINARY - 1)
        );
        assert_eq!(receipt.failed_transactions.len(), 1);

        chain.push_empty(1);
        let receipt = chain.push(vec![binary().into()]);
        assert_eq!(
            chain.ledger.state().version(),
            ChainVersion::hardfork(hardfork::CUSTOM_BINARY)
        );
        assert_eq!(receipt.applied_transactions, 1);
    }

    #[test]
    fn test_null_balance_burned_after_activation() {
        let mut chain = TestChain::with_oracle(
            LedgerConfig::default(),
            schedule(hardfork::BURN_NULL_ACCOUNT, 6),
        );
        chain.push(vec![transfer(
            miner().as_str(),
            NULL_ACCOUNT,
            Asset::steem(50),
        )]);
        assert_eq!(chain.balance(NULL_ACCOUNT), Asset::steem(50));

        chain.push_empty(1);
        assert_eq!(chain.balance(NULL_ACCOUNT), Asset::steem(0));
    }

    #[test]
    fn test_reward_funds_created_at_latest() {
        let mut chain = TestChain::new(hardfork::LATEST);
        chain.push_empty(1);

        assert!(chain.ledger.state().has_hardfork(hardfork::REWARD_FUNDS));
        assert!(chain
            .ledger
            .state()
            .db
            .all::<qc_ledger::domain::RewardFund>()
            .next()
            .is_some());
    }
}
