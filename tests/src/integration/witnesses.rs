//! # Witness Governance
//!
//! A funded account registers as a witness, votes itself into the schedule
//! and takes its turn producing blocks.

#[cfg(test)]
mod tests {
    use crate::integration::support::{key, TestChain};
    use qc_ledger::domain::hardfork;
    use qc_ledger::domain::{
        AccountName, AccountWitnessVoteOperation, Asset, ChainProperties,
        TransferToVestingOperation, WitnessUpdateOperation,
    };
    use qc_ledger::policies::WitnessPolicy;
    use qc_ledger::StateTransitionApi;

    fn elect_alice(chain: &mut TestChain) -> AccountName {
        let alice = chain.fund_account("alice", 1_000);
        let receipt = chain.push(vec![
            TransferToVestingOperation {
                from: alice.clone(),
                to: alice.clone(),
                amount: Asset::steem(500),
            }
            .into(),
            WitnessUpdateOperation {
                owner: alice.clone(),
                url: "https://alice.example".into(),
                block_signing_key: key("alice-signing"),
                props: ChainProperties::default(),
                fee: Asset::steem(0),
            }
            .into(),
            AccountWitnessVoteOperation {
                account: alice.clone(),
                witness: alice.clone(),
                approve: true,
            }
            .into(),
        ]);
        assert_eq!(receipt.applied_transactions, 3, "{:?}", receipt.failed_transactions);
        alice
    }

    #[test]
    fn test_vote_weight_follows_vesting() {
        let mut chain = TestChain::new(hardfork::LATEST);
        let alice = elect_alice(&mut chain);

        let state = chain.ledger.state();
        let account = state.account(&alice).unwrap();
        assert_eq!(state.witness(&alice).unwrap().votes, account.witness_vote_weight());
        assert!(account.witness_vote_weight() > 0);
    }

    #[test]
    fn test_elected_witness_joins_schedule_and_produces() {
        let mut chain = TestChain::new(hardfork::LATEST);
        let alice = elect_alice(&mut chain);

        let schedule = chain.ledger.state().witness_schedule().unwrap().clone();
        assert!(schedule.current_shuffled_witnesses.contains(&alice));
        assert_eq!(schedule.current_shuffled_witnesses.len(), 2);

        chain.push_empty(4);
        assert!(chain.ledger.state().witness(&alice).unwrap().last_confirmed_block_num > 0);
    }

    #[test]
    fn test_skipped_slot_charges_scheduled_witness() {
        let mut chain = TestChain::new(hardfork::LATEST);
        elect_alice(&mut chain);

        let state = chain.ledger.state();
        let skipped = state.scheduled_witness(1).unwrap();
        let producer = state.scheduled_witness(2).unwrap();
        let missed_before = state.witness(&skipped).unwrap().total_missed;

        let block = chain.block_at_slot(2, Vec::new());
        assert_eq!(block.witness, producer);
        chain.ledger.apply_block(&block).unwrap();

        let missed_after = chain.ledger.state().witness(&skipped).unwrap().total_missed;
        let expected = if skipped == producer {
            missed_before
        } else {
            missed_before + 1
        };
        assert_eq!(missed_after, expected);
        assert_eq!(chain.ledger.state().props().unwrap().participation_count, 127);
    }

    #[test]
    fn test_unvote_removes_weight() {
        let mut chain = TestChain::new(hardfork::LATEST);
        let alice = elect_alice(&mut chain);

        chain.push(vec![AccountWitnessVoteOperation {
            account: alice.clone(),
            witness: alice.clone(),
            approve: false,
        }
        .into()]);

        assert_eq!(chain.ledger.state().witness(&alice).unwrap().votes, 0);
    }
}
