//! # Object Database
//!
//! One [`Table`] per object kind plus session bookkeeping. Every table joins
//! every session, so `undo()` reverts the whole database to the state it had
//! when the session started.
//!
//! ## Sessions
//!
//! ```text
//! start_undo_session()  -> revision r
//!     create / modify / remove ...
//! undo()                -> state as of r - 1
//! squash()              -> changes merged into the enclosing session
//! commit(r)             -> history up to r forgotten, changes permanent
//! ```

use super::object::{ChainObject, IndexKey};
use super::table::Table;
use crate::domain::{
    Account, AccountAuthority, AccountRecoveryRequest, ChainError, ChangeRecoveryAccountRequest,
    ConvertRequest, DeclineVotingRightsRequest, DynamicGlobalProperties, Escrow, FeedHistory,
    InternalError, LimitOrder, LiquidityRewardBalance, ObjectId, OwnerAuthorityHistory,
    RewardFund, SavingsWithdraw, VestingDelegation, VestingDelegationExpiration, WithdrawVestingRoute,
    Witness, WitnessSchedule, WitnessVote,
};

/// Typed access from the database to the table holding `Self`.
pub trait Stored: ChainObject {
    fn table(tables: &Tables) -> &Table<Self>;
    fn table_mut(tables: &mut Tables) -> &mut Table<Self>;
}

macro_rules! tables {
    ($($field:ident: $ty:ty,)*) => {
        /// Every table of the chain state.
        #[derive(Debug, Clone, Default)]
        pub struct Tables {
            $(pub $field: Table<$ty>,)*
        }

        impl Tables {
            fn start_undo(&mut self, revision: u64) {
                $(self.$field.start_undo(revision);)*
            }

            fn undo(&mut self) {
                $(self.$field.undo();)*
            }

            fn squash(&mut self) {
                $(self.$field.squash();)*
            }

            fn commit(&mut self, revision: u64) {
                $(self.$field.commit(revision);)*
            }
        }

        $(
            impl Stored for $ty {
                fn table(tables: &Tables) -> &Table<Self> {
                    &tables.$field
                }

                fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
                    &mut tables.$field
                }
            }
        )*
    };
}

tables! {
    dynamic_global_properties: DynamicGlobalProperties,
    feed_history: FeedHistory,
    witness_schedule: WitnessSchedule,
    accounts: Account,
    account_authorities: AccountAuthority,
    owner_authority_history: OwnerAuthorityHistory,
    account_recovery_requests: AccountRecoveryRequest,
    change_recovery_account_requests: ChangeRecoveryAccountRequest,
    witnesses: Witness,
    witness_votes: WitnessVote,
    decline_voting_rights_requests: DeclineVotingRightsRequest,
    limit_orders: LimitOrder,
    convert_requests: ConvertRequest,
    liquidity_reward_balances: LiquidityRewardBalance,
    escrows: Escrow,
    savings_withdraws: SavingsWithdraw,
    withdraw_vesting_routes: WithdrawVestingRoute,
    vesting_delegations: VestingDelegation,
    vesting_delegation_expirations: VestingDelegationExpiration,
    reward_funds: RewardFund,
}

/// Transactional multi-table object store.
#[derive(Debug, Clone, Default)]
pub struct Database {
    tables: Tables,
    /// Revision of the newest open session, or of the last committed state.
    revision: u64,
    /// Revisions of open sessions, oldest first.
    sessions: Vec<u64>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of open undo sessions.
    pub fn undo_depth(&self) -> usize {
        self.sessions.len()
    }

    // =========================================================================
    // SESSIONS
    // =========================================================================

    /// Opens a nested undo session and returns its revision.
    pub fn start_undo_session(&mut self) -> u64 {
        self.revision += 1;
        self.sessions.push(self.revision);
        self.tables.start_undo(self.revision);
        self.revision
    }

    /// Reverts every change made since the newest session started.
    pub fn undo(&mut self) -> Result<(), ChainError> {
        if self.sessions.pop().is_none() {
            return Err(InternalError::NoUndoSession.into());
        }
        self.tables.undo();
        self.revision -= 1;
        Ok(())
    }

    /// Merges the newest session into its parent. Squashing the outermost
    /// session keeps its changes with no way to undo them.
    pub fn squash(&mut self) -> Result<(), ChainError> {
        if self.sessions.pop().is_none() {
            return Err(InternalError::NoUndoSession.into());
        }
        self.tables.squash();
        self.revision -= 1;
        Ok(())
    }

    /// Makes every session with revision `<= revision` permanent.
    pub fn commit(&mut self, revision: u64) {
        self.sessions.retain(|rev| *rev > revision);
        self.tables.commit(revision);
    }

    /// Runs `f` inside a session: squashed into the parent on success,
    /// undone on error.
    pub fn with_session<R, F>(&mut self, f: F) -> Result<R, ChainError>
    where
        F: FnOnce(&mut Self) -> Result<R, ChainError>,
    {
        self.start_undo_session();
        match f(self) {
            Ok(value) => {
                self.squash()?;
                Ok(value)
            }
            Err(err) => {
                self.undo()?;
                Err(err)
            }
        }
    }

    // =========================================================================
    // READS
    // =========================================================================

    pub fn find<T: Stored>(&self, id: ObjectId) -> Option<&T> {
        T::table(&self.tables).get(id)
    }

    pub fn get<T: Stored>(&self, id: ObjectId) -> Result<&T, ChainError> {
        self.find::<T>(id)
            .ok_or_else(|| ChainError::not_found(T::KIND, id))
    }

    /// Exact lookup through a unique index.
    pub fn find_by<T: Stored>(&self, index: usize, key: &IndexKey) -> Option<&T> {
        T::table(&self.tables).find_by(index, key)
    }

    pub fn get_by<T: Stored>(&self, index: usize, key: &IndexKey) -> Result<&T, ChainError> {
        self.find_by::<T>(index, key)
            .ok_or_else(|| ChainError::not_found(T::KIND, describe_key(key)))
    }

    /// Objects in `index` order.
    pub fn iter<T: Stored>(&self, index: usize) -> impl Iterator<Item = &T> + '_ {
        T::table(&self.tables).iter_index(index)
    }

    /// Objects in `index` order starting at the first key `>= start`.
    pub fn range_from<T: Stored>(
        &self,
        index: usize,
        start: IndexKey,
    ) -> impl Iterator<Item = &T> + '_ {
        T::table(&self.tables).range_from(index, start)
    }

    /// Objects whose `index` key starts with `prefix`.
    pub fn prefix<T: Stored>(&self, index: usize, prefix: IndexKey) -> impl Iterator<Item = &T> + '_ {
        T::table(&self.tables).prefix(index, prefix)
    }

    /// All objects in id order.
    pub fn all<T: Stored>(&self) -> impl Iterator<Item = &T> + '_ {
        T::table(&self.tables).iter()
    }

    pub fn count<T: Stored>(&self) -> usize {
        T::table(&self.tables).len()
    }

    /// The single instance of a singleton kind.
    pub fn singleton<T: Stored>(&self) -> Result<&T, ChainError> {
        self.get::<T>(ObjectId(0))
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    pub fn create<T: Stored>(&mut self, value: T) -> Result<ObjectId, ChainError> {
        T::table_mut(&mut self.tables).create(value)
    }

    pub fn modify<T: Stored, F>(&mut self, id: ObjectId, mutator: F) -> Result<(), ChainError>
    where
        F: FnOnce(&mut T),
    {
        T::table_mut(&mut self.tables).modify(id, mutator)
    }

    /// Applies a fallible mutator to a copy and stores it only on success.
    pub fn try_modify<T: Stored, F>(&mut self, id: ObjectId, mutator: F) -> Result<(), ChainError>
    where
        F: FnOnce(&mut T) -> Result<(), ChainError>,
    {
        let mut updated = self.get::<T>(id)?.clone();
        mutator(&mut updated)?;
        self.modify::<T, _>(id, move |object| *object = updated)
    }

    pub fn remove<T: Stored>(&mut self, id: ObjectId) -> Result<T, ChainError> {
        T::table_mut(&mut self.tables).remove(id)
    }

    pub fn modify_singleton<T: Stored, F>(&mut self, mutator: F) -> Result<(), ChainError>
    where
        F: FnOnce(&mut T),
    {
        self.modify::<T, F>(ObjectId(0), mutator)
    }
}

fn describe_key(key: &IndexKey) -> String {
    key.iter()
        .map(|part| format!("{part:?}"))
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::assert_round_trip;
    use crate::domain::{AccountName, Asset, Timestamp};
    use crate::store::KeyPart;

    fn name_key(name: &str) -> IndexKey {
        vec![KeyPart::Name(AccountName::from(name))]
    }

    fn make_account(db: &mut Database, name: &str, balance: i64) -> ObjectId {
        let mut account = Account::new(name.into(), Timestamp::MIN);
        account.balance = Asset::steem(balance);
        db.create(account).unwrap()
    }

    #[test]
    fn test_get_by_name() {
        let mut db = Database::new();
        make_account(&mut db, "alice", 10);
        let alice: &Account = db.get_by(Account::BY_NAME, &name_key("alice")).unwrap();
        assert_eq!(alice.balance, Asset::steem(10));
        let missing = db.get_by::<Account>(Account::BY_NAME, &name_key("bob"));
        assert!(matches!(missing, Err(ChainError::NotFound { kind: "account", .. })));
    }

    #[test]
    fn test_with_session_rolls_back_on_error() {
        let mut db = Database::new();
        let alice = make_account(&mut db, "alice", 10);
        let before = db.tables().accounts.clone();

        let result: Result<(), ChainError> = db.with_session(|db| {
            db.modify::<Account, _>(alice, |a| a.balance = Asset::steem(0))?;
            make_account(db, "bob", 5);
            Err(ChainError::rule("abort"))
        });

        assert!(result.is_err());
        assert_eq!(db.undo_depth(), 0);
        assert_eq!(
            db.all::<Account>().cloned().collect::<Vec<_>>(),
            before.iter().cloned().collect::<Vec<_>>()
        );
        assert!(db.find_by::<Account>(Account::BY_NAME, &name_key("bob")).is_none());
    }

    #[test]
    fn test_try_modify_is_all_or_nothing() {
        let mut db = Database::new();
        let alice = make_account(&mut db, "alice", 10);
        let failed = db.try_modify::<Account, _>(alice, |a| {
            a.balance = Asset::steem(99);
            Err(ChainError::rule("rejected"))
        });
        assert!(failed.is_err());
        assert_eq!(db.get::<Account>(alice).unwrap().balance, Asset::steem(10));

        db.try_modify::<Account, _>(alice, |a| {
            a.balance = a.balance.checked_add(&Asset::steem(5))?;
            Ok(())
        })
        .unwrap();
        assert_eq!(db.get::<Account>(alice).unwrap().balance, Asset::steem(15));
    }

    #[test]
    fn test_nested_sessions_and_commit() {
        let mut db = Database::new();
        let block = db.start_undo_session();
        make_account(&mut db, "alice", 1);
        db.with_session(|db| {
            make_account(db, "bob", 2);
            Ok(())
        })
        .unwrap();
        assert_eq!(db.undo_depth(), 1);
        assert_eq!(db.count::<Account>(), 2);

        db.commit(block);
        assert_eq!(db.undo_depth(), 0);
        assert!(db.undo().is_err());
        assert_eq!(db.count::<Account>(), 2);
    }

    #[test]
    fn test_undone_session_restores_encoded_object() {
        let mut db = Database::new();
        let alice = make_account(&mut db, "alice", 10);
        let encoded = bincode::serialize(db.get::<Account>(alice).unwrap()).unwrap();

        db.start_undo_session();
        let carol = make_account(&mut db, "carol", 3);
        db.modify::<Account, _>(carol, |a| a.balance = Asset::steem(4)).unwrap();
        db.remove::<Account>(carol).unwrap();
        db.modify::<Account, _>(alice, |a| {
            a.balance = Asset::steem(0);
            a.proxy = "carol".into();
        })
        .unwrap();
        db.remove::<Account>(alice).unwrap();
        db.undo().unwrap();

        let restored = db.get::<Account>(alice).unwrap();
        assert_eq!(bincode::serialize(restored).unwrap(), encoded);
        let decoded: Account = bincode::deserialize(&encoded).unwrap();
        assert_eq!(&decoded, restored);
        assert_round_trip(restored);
        assert!(db.find_by::<Account>(Account::BY_NAME, &name_key("carol")).is_none());
        assert_eq!(db.count::<Account>(), 1);
    }

    #[test]
    fn test_undo_block_session() {
        let mut db = Database::new();
        make_account(&mut db, "alice", 1);
        db.start_undo_session();
        make_account(&mut db, "bob", 2);
        db.undo().unwrap();
        assert_eq!(db.count::<Account>(), 1);
        assert_eq!(db.revision(), 0);
    }
}
