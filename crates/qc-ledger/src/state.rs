//! # Chain State
//!
//! The object database plus everything evaluation needs besides it: the
//! active chain version, the pending virtual operations of the current
//! block and the test-network switches.
//!
//! Every policy trait in [`crate::policies`] is implemented for
//! [`ChainState`], so an evaluator holding `&mut ChainState` reaches the
//! whole policy surface through plain method calls.

use crate::domain::hardfork::Hardfork;
use crate::domain::{
    Account, AccountName, ChainError, ChainVersion, DynamicGlobalProperties, FeedHistory,
    ObjectId, Timestamp, VirtualOperation, Witness, WitnessSchedule,
};
use crate::store::{ChainObject, Database, IndexKey, KeyPart};

/// Test-network switches that alter maintenance behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateFlags {
    pub skip_price_feed_limit_check: bool,
    pub liquidity_rewards_enabled: bool,
}

impl Default for StateFlags {
    fn default() -> Self {
        Self {
            skip_price_feed_limit_check: false,
            liquidity_rewards_enabled: true,
        }
    }
}

/// Index key for a lookup by account name.
#[must_use]
pub fn name_key(name: &AccountName) -> IndexKey {
    vec![KeyPart::from(name)]
}

/// Database, active version and pending virtual operations.
#[derive(Debug, Clone)]
pub struct ChainState {
    pub db: Database,
    version: ChainVersion,
    virtual_ops: Vec<VirtualOperation>,
    flags: StateFlags,
}

impl ChainState {
    /// An empty state holding only the singleton objects.
    pub fn new(flags: StateFlags) -> Result<Self, ChainError> {
        let mut db = Database::new();
        db.create(DynamicGlobalProperties::default())?;
        db.create(FeedHistory::default())?;
        db.create(WitnessSchedule::default())?;
        Ok(Self {
            db,
            version: ChainVersion::GENESIS,
            virtual_ops: Vec::new(),
            flags,
        })
    }

    // =========================================================================
    // VERSION
    // =========================================================================

    #[must_use]
    pub fn version(&self) -> ChainVersion {
        self.version
    }

    pub fn set_version(&mut self, version: ChainVersion) {
        self.version = version;
    }

    #[must_use]
    pub fn has_hardfork(&self, hardfork: Hardfork) -> bool {
        self.version.major > 0 || self.version.hardfork >= hardfork
    }

    #[must_use]
    pub fn flags(&self) -> StateFlags {
        self.flags
    }

    // =========================================================================
    // SINGLETONS
    // =========================================================================

    pub fn props(&self) -> Result<&DynamicGlobalProperties, ChainError> {
        self.db.singleton::<DynamicGlobalProperties>()
    }

    pub fn modify_props<F>(&mut self, mutator: F) -> Result<(), ChainError>
    where
        F: FnOnce(&mut DynamicGlobalProperties),
    {
        self.db.modify_singleton::<DynamicGlobalProperties, F>(mutator)
    }

    /// Fallible update of the global properties.
    pub fn update_props<F>(&mut self, mutator: F) -> Result<(), ChainError>
    where
        F: FnOnce(&mut DynamicGlobalProperties) -> Result<(), ChainError>,
    {
        self.db.try_modify::<DynamicGlobalProperties, F>(ObjectId(0), mutator)
    }

    pub fn feed_history(&self) -> Result<&FeedHistory, ChainError> {
        self.db.singleton::<FeedHistory>()
    }

    pub fn witness_schedule(&self) -> Result<&WitnessSchedule, ChainError> {
        self.db.singleton::<WitnessSchedule>()
    }

    pub fn head_block_time(&self) -> Result<Timestamp, ChainError> {
        Ok(self.props()?.head_block_time)
    }

    pub fn head_block_num(&self) -> Result<u32, ChainError> {
        Ok(self.props()?.head_block_number)
    }

    // =========================================================================
    // LOOKUPS
    // =========================================================================

    #[must_use]
    pub fn find_account(&self, name: &AccountName) -> Option<&Account> {
        self.db.find_by::<Account>(Account::BY_NAME, &name_key(name))
    }

    pub fn account(&self, name: &AccountName) -> Result<&Account, ChainError> {
        self.find_account(name)
            .ok_or_else(|| ChainError::not_found(Account::KIND, name))
    }

    /// Fallible update of the account called `name`.
    pub fn update_account<F>(&mut self, name: &AccountName, mutator: F) -> Result<(), ChainError>
    where
        F: FnOnce(&mut Account) -> Result<(), ChainError>,
    {
        let id = self.account(name)?.id;
        self.db.try_modify::<Account, F>(id, mutator)
    }

    #[must_use]
    pub fn find_witness(&self, owner: &AccountName) -> Option<&Witness> {
        self.db.find_by::<Witness>(Witness::BY_NAME, &name_key(owner))
    }

    pub fn witness(&self, owner: &AccountName) -> Result<&Witness, ChainError> {
        self.find_witness(owner)
            .ok_or_else(|| ChainError::not_found(Witness::KIND, owner))
    }

    pub fn update_witness<F>(&mut self, owner: &AccountName, mutator: F) -> Result<(), ChainError>
    where
        F: FnOnce(&mut Witness) -> Result<(), ChainError>,
    {
        let id = self.witness(owner)?.id;
        self.db.try_modify::<Witness, F>(id, mutator)
    }

    // =========================================================================
    // VIRTUAL OPERATIONS
    // =========================================================================

    pub fn push_virtual_operation(&mut self, op: VirtualOperation) {
        tracing::trace!(vop = op.name(), "virtual operation");
        self.virtual_ops.push(op);
    }

    #[must_use]
    pub fn virtual_operations(&self) -> &[VirtualOperation] {
        &self.virtual_ops
    }

    /// Drops virtual operations emitted after the first `len`.
    pub fn truncate_virtual_operations(&mut self, len: usize) {
        self.virtual_ops.truncate(len);
    }

    pub fn take_virtual_operations(&mut self) -> Vec<VirtualOperation> {
        std::mem::take(&mut self.virtual_ops)
    }

    // =========================================================================
    // SESSIONS
    // =========================================================================

    /// Runs `f` in a nested undo session. On error the store is rolled back
    /// and the virtual operations emitted by `f` are dropped.
    pub fn with_session<R, F>(&mut self, f: F) -> Result<R, ChainError>
    where
        F: FnOnce(&mut Self) -> Result<R, ChainError>,
    {
        let mark = self.virtual_ops.len();
        self.db.start_undo_session();
        match f(self) {
            Ok(value) => {
                self.db.squash()?;
                Ok(value)
            }
            Err(err) => {
                self.db.undo()?;
                self.virtual_ops.truncate(mark);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::hardfork;

    #[test]
    fn test_new_state_has_singletons() {
        let state = ChainState::new(StateFlags::default()).unwrap();
        assert_eq!(state.head_block_num().unwrap(), 0);
        assert!(state.feed_history().unwrap().current_median_history.is_null());
        assert!(state.witness_schedule().unwrap().current_shuffled_witnesses.is_empty());
    }

    #[test]
    fn test_has_hardfork_follows_version() {
        let mut state = ChainState::new(StateFlags::default()).unwrap();
        assert!(state.has_hardfork(0));
        assert!(!state.has_hardfork(hardfork::DIRECT_WITNESS_VOTE));
        state.set_version(ChainVersion::hardfork(hardfork::DIRECT_WITNESS_VOTE));
        assert!(state.has_hardfork(hardfork::DIRECT_WITNESS_VOTE));
        assert!(!state.has_hardfork(hardfork::SCHEDULE_TIME_CLAMP));
    }

    #[test]
    fn test_virtual_operation_truncation() {
        let mut state = ChainState::new(StateFlags::default()).unwrap();
        let vop = VirtualOperation::ReturnVestingDelegation {
            account: "alice".into(),
            vesting_shares: crate::domain::Asset::vests(1),
        };
        state.push_virtual_operation(vop.clone());
        state.push_virtual_operation(vop.clone());
        state.truncate_virtual_operations(1);
        assert_eq!(state.take_virtual_operations(), vec![vop]);
        assert!(state.virtual_operations().is_empty());
    }

    #[test]
    fn test_failed_session_drops_changes_and_virtual_operations() {
        let mut state = ChainState::new(StateFlags::default()).unwrap();
        let before = state.db.count::<Account>();
        let result: Result<(), ChainError> = state.with_session(|s| {
            s.db.create(Account::new("alice".into(), Timestamp::MIN))?;
            s.push_virtual_operation(VirtualOperation::Interest {
                owner: "alice".into(),
                interest: crate::domain::Asset::sbd(1),
            });
            Err(ChainError::rule("boom"))
        });

        assert!(result.is_err());
        assert_eq!(state.db.count::<Account>(), before);
        assert!(state.virtual_operations().is_empty());
        assert_eq!(state.db.undo_depth(), 0);
    }
}
