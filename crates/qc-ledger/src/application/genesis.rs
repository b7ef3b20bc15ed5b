//! Initial chain state.

use crate::domain::constants::{INIT_MINER_NAME, NULL_ACCOUNT, TEMP_ACCOUNT};
use crate::domain::{
    Account, AccountAuthority, AccountName, Asset, Authority, ChainError, ObjectId,
    ScheduleSlot, Timestamp, Witness, WitnessSchedule,
};
use crate::state::ChainState;
use serde::{Deserialize, Serialize};

/// Parameters of block zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genesis {
    pub time: Timestamp,
    /// STEEM held by the initial miner.
    pub initial_supply: i64,
    /// Owner, active, posting, memo and signing key of the initial miner.
    pub init_key: String,
}

impl Default for Genesis {
    fn default() -> Self {
        Self {
            time: Timestamp::from_secs(1_458_835_200),
            initial_supply: 0,
            init_key: "STM8GC13uCZbP44HzMLV6zPZGwVQ8Nt4Kji8PapsPiNq1BK153XTX".to_string(),
        }
    }
}

fn authority_with_threshold(threshold: u32) -> Authority {
    Authority {
        weight_threshold: threshold,
        ..Authority::default()
    }
}

fn create_account(
    state: &mut ChainState,
    account: Account,
    authority: Authority,
) -> Result<(), ChainError> {
    state.db.create(AccountAuthority {
        id: ObjectId::default(),
        account: account.name.clone(),
        owner: authority.clone(),
        active: authority.clone(),
        posting: authority,
        last_owner_update: Timestamp::MIN,
    })?;
    state.db.create(account)?;
    Ok(())
}

/// Seeds an empty state: the initial miner holding the whole supply and
/// scheduled alone, plus the null and temp accounts.
pub fn init_genesis(state: &mut ChainState, genesis: &Genesis) -> Result<(), ChainError> {
    let init_miner = AccountName::from(INIT_MINER_NAME);

    create_account(
        state,
        Account::new(NULL_ACCOUNT.into(), genesis.time),
        authority_with_threshold(1),
    )?;
    create_account(
        state,
        Account::new(TEMP_ACCOUNT.into(), genesis.time),
        authority_with_threshold(0),
    )?;

    let mut miner = Account::new(init_miner.clone(), genesis.time);
    miner.memo_key = genesis.init_key.clone();
    miner.balance = Asset::steem(genesis.initial_supply);
    create_account(state, miner, Authority::from_key(genesis.init_key.clone()))?;

    let mut witness = Witness::new(init_miner.clone(), genesis.time);
    witness.signing_key = genesis.init_key.clone();
    witness.schedule = ScheduleSlot::Top;
    state.db.create(witness)?;

    state.modify_props(|p| {
        p.head_block_time = genesis.time;
        p.current_witness = init_miner.clone();
        p.current_supply = Asset::steem(genesis.initial_supply);
        p.virtual_supply = p.current_supply;
    })?;
    state
        .db
        .modify_singleton::<WitnessSchedule, _>(|s| {
            s.current_shuffled_witnesses = vec![init_miner.clone()];
        })?;

    tracing::info!(
        time = %genesis.time,
        initial_supply = genesis.initial_supply,
        "genesis state initialised"
    );
    Ok(())
}
