//! # Internal Market
//!
//! Orders debit the seller when placed and are refunded on cancellation or
//! when block maintenance finds them expired.

#[cfg(test)]
mod tests {
    use crate::integration::support::TestChain;
    use qc_ledger::domain::{Asset, LimitOrderCancelOperation, LimitOrderCreateOperation, Operation};
    use qc_ledger::policies::OrderPolicy;
    use qc_ledger::StateTransitionApi;

    const BLOCK_SECS: u32 = 3;

    /// Sells `steem` for half as much SBD, expiring `ttl` seconds after the
    /// next block.
    fn sell(chain: &TestChain, orderid: u32, steem: i64, ttl: u32, fill_or_kill: bool) -> Operation {
        let next_block_time = chain
            .ledger
            .state()
            .head_block_time()
            .unwrap()
            .plus(BLOCK_SECS);
        LimitOrderCreateOperation {
            owner: "alice".into(),
            orderid,
            amount_to_sell: Asset::steem(steem),
            min_to_receive: Asset::sbd(steem / 2),
            fill_or_kill,
            expiration: next_block_time.plus(ttl),
        }
        .into()
    }

    fn open_order(chain: &TestChain, orderid: u32) -> Option<i64> {
        chain
            .ledger
            .state()
            .find_limit_order(&"alice".into(), orderid)
            .map(|order| order.for_sale)
    }

    #[test]
    fn test_resting_order_holds_funds() {
        let mut chain = TestChain::new(0);
        chain.fund_account("alice", 1_000);

        let op = sell(&chain, 1, 100, 60, false);
        let receipt = chain.push(vec![op]);

        assert_eq!(receipt.applied_transactions, 1);
        assert_eq!(open_order(&chain, 1), Some(100));
        assert_eq!(chain.balance("alice"), Asset::steem(900));
    }

    #[test]
    fn test_cancel_refunds_seller() {
        let mut chain = TestChain::new(0);
        chain.fund_account("alice", 1_000);
        let op = sell(&chain, 7, 400, 600, false);
        chain.push(vec![op]);

        chain.push(vec![LimitOrderCancelOperation {
            owner: "alice".into(),
            orderid: 7,
        }
        .into()]);

        assert_eq!(open_order(&chain, 7), None);
        assert_eq!(chain.balance("alice"), Asset::steem(1_000));
    }

    #[test]
    fn test_expired_order_refunded_by_maintenance() {
        let mut chain = TestChain::new(0);
        chain.fund_account("alice", 1_000);
        let op = sell(&chain, 2, 100, 30, false);
        chain.push(vec![op]);

        chain.push_empty(10);
        assert_eq!(open_order(&chain, 2), Some(100));

        chain.push_empty(1);
        assert_eq!(open_order(&chain, 2), None);
        assert_eq!(chain.balance("alice"), Asset::steem(1_000));
    }

    #[test]
    fn test_unfilled_fill_or_kill_is_dropped() {
        let mut chain = TestChain::new(0);
        chain.fund_account("alice", 1_000);

        let op = sell(&chain, 3, 100, 60, true);
        let receipt = chain.push(vec![op]);

        assert_eq!(receipt.failed_transactions.len(), 1);
        assert_eq!(open_order(&chain, 3), None);
        assert_eq!(chain.balance("alice"), Asset::steem(1_000));
    }

    #[test]
    fn test_duplicate_order_id_rejected() {
        let mut chain = TestChain::new(0);
        chain.fund_account("alice", 1_000);

        let first = sell(&chain, 4, 100, 60, false);
        let second = sell(&chain, 4, 200, 60, false);
        let receipt = chain.push(vec![first, second]);

        assert_eq!(receipt.applied_transactions, 1);
        assert_eq!(open_order(&chain, 4), Some(100));
        assert_eq!(chain.balance("alice"), Asset::steem(900));
    }
}
