//! # Operations
//!
//! User operations arrive inside already authority-checked transactions.
//! Each payload carries a stateless `validate()`; stateful checks happen in
//! its evaluator.
//!
//! Virtual operations are never submitted. They record economic side effects
//! for downstream consumers, in application order.

use super::asset::{Asset, Price, Symbol};
use super::constants::{
    MAX_CUSTOM_ID_LENGTH, MAX_MEMO_SIZE, MAX_WITNESS_URL_LENGTH, MIN_BLOCK_SIZE_LIMIT, PERCENT_100,
};
use super::errors::{ensure, ChainError, ValidationError};
use super::value_objects::{AccountName, Authority, ChainProperties, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// =============================================================================
// FIELD CHECKS
// =============================================================================

fn invalid(field: &'static str, reason: impl Into<String>) -> ChainError {
    ValidationError::InvalidField {
        field,
        reason: reason.into(),
    }
    .into()
}

fn check_name(field: &'static str, name: &AccountName) -> Result<(), ChainError> {
    if name.is_valid() {
        Ok(())
    } else {
        Err(invalid(field, format!("Account name {name} is invalid")))
    }
}

fn check_symbol(field: &'static str, amount: &Asset, symbols: &[Symbol]) -> Result<(), ChainError> {
    if symbols.contains(&amount.symbol) {
        Ok(())
    } else {
        Err(invalid(field, format!("{} is not allowed here", amount.symbol)))
    }
}

fn check_positive(field: &'static str, amount: &Asset) -> Result<(), ChainError> {
    if amount.amount > 0 {
        Ok(())
    } else {
        Err(invalid(field, "must be positive"))
    }
}

fn check_non_negative(field: &'static str, amount: &Asset) -> Result<(), ChainError> {
    if amount.amount >= 0 {
        Ok(())
    } else {
        Err(invalid(field, "cannot be negative"))
    }
}

fn check_memo(memo: &str) -> Result<(), ChainError> {
    if memo.len() < MAX_MEMO_SIZE {
        Ok(())
    } else {
        Err(invalid("memo", "Memo is too large"))
    }
}

fn check_json(field: &'static str, json: &str) -> Result<(), ChainError> {
    if json.is_empty() {
        return Ok(());
    }
    serde_json::from_str::<serde_json::Value>(json)
        .map(|_| ())
        .map_err(|err| invalid(field, format!("not valid JSON: {err}")))
}

fn check_custom_id(id: &str) -> Result<(), ChainError> {
    if id.len() <= MAX_CUSTOM_ID_LENGTH {
        Ok(())
    } else {
        Err(invalid("id", "id is too long"))
    }
}

fn check_authority(field: &'static str, authority: &Authority) -> Result<(), ChainError> {
    if authority.is_impossible() {
        return Err(invalid(field, "authority cannot be impossible"));
    }
    for name in authority.account_auths.keys() {
        check_name(field, name)?;
    }
    Ok(())
}

fn check_props(props: &ChainProperties) -> Result<(), ChainError> {
    check_symbol("props.account_creation_fee", &props.account_creation_fee, &[Symbol::Steem])?;
    check_non_negative("props.account_creation_fee", &props.account_creation_fee)?;
    if props.maximum_block_size < MIN_BLOCK_SIZE_LIMIT {
        return Err(invalid("props.maximum_block_size", "below the minimum block size"));
    }
    if props.sbd_interest_rate > PERCENT_100 {
        return Err(invalid("props.sbd_interest_rate", "exceeds 100%"));
    }
    Ok(())
}

fn check_steem_sbd_price(field: &'static str, price: &Price) -> Result<(), ChainError> {
    let market = price.market();
    if market != (Symbol::Steem, Symbol::Sbd) {
        return Err(invalid(field, "Price must be a STEEM/SBD price"));
    }
    price
        .validate()
        .map_err(|err| invalid(field, err.to_string()))
}

// =============================================================================
// TRANSFERS AND VESTING
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub amount: Asset,
    pub memo: String,
}

impl TransferOperation {
    pub fn validate(&self) -> Result<(), ChainError> {
        check_name("from", &self.from)?;
        check_name("to", &self.to)?;
        check_symbol("amount", &self.amount, &[Symbol::Steem, Symbol::Sbd])?;
        check_positive("amount", &self.amount)?;
        check_memo(&self.memo)
    }
}

/// Converts liquid STEEM into vesting shares for `to` (or `from` if empty).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferToVestingOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub amount: Asset,
}

impl TransferToVestingOperation {
    pub fn validate(&self) -> Result<(), ChainError> {
        check_name("from", &self.from)?;
        if !self.to.is_none() {
            check_name("to", &self.to)?;
        }
        check_symbol("amount", &self.amount, &[Symbol::Steem])?;
        check_positive("amount", &self.amount)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawVestingOperation {
    pub account: AccountName,
    pub vesting_shares: Asset,
}

impl WithdrawVestingOperation {
    pub fn validate(&self) -> Result<(), ChainError> {
        check_name("account", &self.account)?;
        check_symbol("vesting_shares", &self.vesting_shares, &[Symbol::Vests])?;
        check_non_negative("vesting_shares", &self.vesting_shares)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetWithdrawVestingRouteOperation {
    pub from_account: AccountName,
    pub to_account: AccountName,
    pub percent: u16,
    pub auto_vest: bool,
}

impl SetWithdrawVestingRouteOperation {
    pub fn validate(&self) -> Result<(), ChainError> {
        check_name("from_account", &self.from_account)?;
        check_name("to_account", &self.to_account)?;
        if self.percent > PERCENT_100 {
            return Err(invalid("percent", "Percent must be valid percent"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateVestingSharesOperation {
    pub delegator: AccountName,
    pub delegatee: AccountName,
    pub vesting_shares: Asset,
}

impl DelegateVestingSharesOperation {
    pub fn validate(&self) -> Result<(), ChainError> {
        check_name("delegator", &self.delegator)?;
        check_name("delegatee", &self.delegatee)?;
        ensure(
            self.delegator != self.delegatee,
            "You cannot delegate VESTS to yourself",
        )?;
        check_symbol("vesting_shares", &self.vesting_shares, &[Symbol::Vests])?;
        check_non_negative("vesting_shares", &self.vesting_shares)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferToSavingsOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub amount: Asset,
    pub memo: String,
}

impl TransferToSavingsOperation {
    pub fn validate(&self) -> Result<(), ChainError> {
        check_name("from", &self.from)?;
        check_name("to", &self.to)?;
        check_symbol("amount", &self.amount, &[Symbol::Steem, Symbol::Sbd])?;
        check_positive("amount", &self.amount)?;
        check_memo(&self.memo)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferFromSavingsOperation {
    pub from: AccountName,
    pub request_id: u32,
    pub to: AccountName,
    pub amount: Asset,
    pub memo: String,
}

impl TransferFromSavingsOperation {
    pub fn validate(&self) -> Result<(), ChainError> {
        check_name("from", &self.from)?;
        check_name("to", &self.to)?;
        check_symbol("amount", &self.amount, &[Symbol::Steem, Symbol::Sbd])?;
        check_positive("amount", &self.amount)?;
        check_memo(&self.memo)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelTransferFromSavingsOperation {
    pub from: AccountName,
    pub request_id: u32,
}

impl CancelTransferFromSavingsOperation {
    pub fn validate(&self) -> Result<(), ChainError> {
        check_name("from", &self.from)
    }
}

// =============================================================================
// MARKET
// =============================================================================

/// Parks SBD for conversion to STEEM at the future median feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertOperation {
    pub owner: AccountName,
    pub requestid: u32,
    pub amount: Asset,
}

impl ConvertOperation {
    pub fn validate(&self) -> Result<(), ChainError> {
        check_name("owner", &self.owner)?;
        check_symbol("amount", &self.amount, &[Symbol::Sbd])?;
        check_positive("amount", &self.amount)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitOrderCreateOperation {
    pub owner: AccountName,
    pub orderid: u32,
    pub amount_to_sell: Asset,
    pub min_to_receive: Asset,
    pub fill_or_kill: bool,
    pub expiration: Timestamp,
}

impl LimitOrderCreateOperation {
    #[must_use]
    pub fn sell_price(&self) -> Price {
        Price {
            base: self.amount_to_sell,
            quote: self.min_to_receive,
        }
    }

    pub fn validate(&self) -> Result<(), ChainError> {
        check_name("owner", &self.owner)?;
        check_steem_sbd_price("amount_to_sell / min_to_receive", &self.sell_price())
    }
}

/// Limit order expressed as an amount and an exchange rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitOrderCreate2Operation {
    pub owner: AccountName,
    pub orderid: u32,
    pub amount_to_sell: Asset,
    pub exchange_rate: Price,
    pub fill_or_kill: bool,
    pub expiration: Timestamp,
}

impl LimitOrderCreate2Operation {
    pub fn validate(&self) -> Result<(), ChainError> {
        check_name("owner", &self.owner)?;
        if self.amount_to_sell.symbol != self.exchange_rate.base.symbol {
            return Err(invalid(
                "exchange_rate",
                "Sell asset must be the base of the price",
            ));
        }
        check_steem_sbd_price("exchange_rate", &self.exchange_rate)?;
        let receives = self
            .amount_to_sell
            .mul_price(&self.exchange_rate)
            .map_err(|err| invalid("amount_to_sell", err.to_string()))?;
        if receives.amount <= 0 {
            return Err(invalid(
                "amount_to_sell",
                "Amount to sell cannot round to 0 when traded",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitOrderCancelOperation {
    pub owner: AccountName,
    pub orderid: u32,
}

impl LimitOrderCancelOperation {
    pub fn validate(&self) -> Result<(), ChainError> {
        check_name("owner", &self.owner)
    }
}

// =============================================================================
// WITNESSES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedPublishOperation {
    pub publisher: AccountName,
    pub exchange_rate: Price,
}

impl FeedPublishOperation {
    pub fn validate(&self) -> Result<(), ChainError> {
        check_name("publisher", &self.publisher)?;
        check_steem_sbd_price("exchange_rate", &self.exchange_rate)
    }
}

/// Creates or updates the witness object owned by `owner`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitnessUpdateOperation {
    pub owner: AccountName,
    pub url: String,
    pub block_signing_key: String,
    pub props: ChainProperties,
    pub fee: Asset,
}

impl WitnessUpdateOperation {
    pub fn validate(&self) -> Result<(), ChainError> {
        check_name("owner", &self.owner)?;
        if self.url.is_empty() {
            return Err(invalid("url", "URL size must be greater than 0"));
        }
        if self.url.len() > MAX_WITNESS_URL_LENGTH {
            return Err(invalid("url", "URL is too long"));
        }
        check_non_negative("fee", &self.fee)?;
        check_props(&self.props)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountWitnessVoteOperation {
    pub account: AccountName,
    pub witness: AccountName,
    pub approve: bool,
}

impl AccountWitnessVoteOperation {
    pub fn validate(&self) -> Result<(), ChainError> {
        check_name("account", &self.account)?;
        check_name("witness", &self.witness)
    }
}

/// Sets (or clears, with an empty `proxy`) the account's voting proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountWitnessProxyOperation {
    pub account: AccountName,
    pub proxy: AccountName,
}

impl AccountWitnessProxyOperation {
    pub fn validate(&self) -> Result<(), ChainError> {
        check_name("account", &self.account)?;
        if !self.proxy.is_none() {
            check_name("proxy", &self.proxy)?;
        }
        ensure(self.proxy != self.account, "Cannot proxy to self")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclineVotingRightsOperation {
    pub account: AccountName,
    pub decline: bool,
}

impl DeclineVotingRightsOperation {
    pub fn validate(&self) -> Result<(), ChainError> {
        check_name("account", &self.account)
    }
}

// =============================================================================
// ESCROW
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowTransferOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub agent: AccountName,
    pub escrow_id: u32,
    pub sbd_amount: Asset,
    pub steem_amount: Asset,
    pub fee: Asset,
    pub ratification_deadline: Timestamp,
    pub escrow_expiration: Timestamp,
    pub json_meta: String,
}

impl EscrowTransferOperation {
    pub fn validate(&self) -> Result<(), ChainError> {
        check_name("from", &self.from)?;
        check_name("to", &self.to)?;
        check_name("agent", &self.agent)?;
        check_non_negative("fee", &self.fee)?;
        check_non_negative("sbd_amount", &self.sbd_amount)?;
        check_non_negative("steem_amount", &self.steem_amount)?;
        ensure(
            self.sbd_amount.amount > 0 || self.steem_amount.amount > 0,
            "escrow must transfer a non-zero amount",
        )?;
        ensure(
            self.from != self.agent && self.to != self.agent,
            "agent must be a third party",
        )?;
        check_symbol("fee", &self.fee, &[Symbol::Steem, Symbol::Sbd])?;
        check_symbol("sbd_amount", &self.sbd_amount, &[Symbol::Sbd])?;
        check_symbol("steem_amount", &self.steem_amount, &[Symbol::Steem])?;
        ensure(
            self.ratification_deadline < self.escrow_expiration,
            "ratification deadline must be before escrow expiration",
        )?;
        check_json("json_meta", &self.json_meta)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowApproveOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub agent: AccountName,
    pub who: AccountName,
    pub escrow_id: u32,
    pub approve: bool,
}

impl EscrowApproveOperation {
    pub fn validate(&self) -> Result<(), ChainError> {
        check_name("from", &self.from)?;
        check_name("to", &self.to)?;
        check_name("agent", &self.agent)?;
        check_name("who", &self.who)?;
        ensure(
            self.who == self.to || self.who == self.agent,
            "to or agent must approve escrow",
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowDisputeOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub agent: AccountName,
    pub who: AccountName,
    pub escrow_id: u32,
}

impl EscrowDisputeOperation {
    pub fn validate(&self) -> Result<(), ChainError> {
        check_name("from", &self.from)?;
        check_name("to", &self.to)?;
        check_name("agent", &self.agent)?;
        check_name("who", &self.who)?;
        ensure(
            self.who == self.from || self.who == self.to,
            "who must be from or to",
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowReleaseOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub agent: AccountName,
    pub who: AccountName,
    pub receiver: AccountName,
    pub escrow_id: u32,
    pub sbd_amount: Asset,
    pub steem_amount: Asset,
}

impl EscrowReleaseOperation {
    pub fn validate(&self) -> Result<(), ChainError> {
        check_name("from", &self.from)?;
        check_name("to", &self.to)?;
        check_name("agent", &self.agent)?;
        check_name("who", &self.who)?;
        check_name("receiver", &self.receiver)?;
        ensure(
            self.who == self.from || self.who == self.to || self.who == self.agent,
            "who must be from or to or agent",
        )?;
        ensure(
            self.receiver == self.from || self.receiver == self.to,
            "receiver must be from or to",
        )?;
        check_non_negative("sbd_amount", &self.sbd_amount)?;
        check_non_negative("steem_amount", &self.steem_amount)?;
        ensure(
            self.sbd_amount.amount > 0 || self.steem_amount.amount > 0,
            "escrow must release a non-zero amount",
        )?;
        check_symbol("sbd_amount", &self.sbd_amount, &[Symbol::Sbd])?;
        check_symbol("steem_amount", &self.steem_amount, &[Symbol::Steem])
    }
}

// =============================================================================
// ACCOUNTS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCreateOperation {
    pub fee: Asset,
    pub creator: AccountName,
    pub new_account_name: AccountName,
    pub owner: Authority,
    pub active: Authority,
    pub posting: Authority,
    pub memo_key: String,
    pub json_metadata: String,
}

impl AccountCreateOperation {
    pub fn validate(&self) -> Result<(), ChainError> {
        check_name("creator", &self.creator)?;
        check_name("new_account_name", &self.new_account_name)?;
        check_symbol("fee", &self.fee, &[Symbol::Steem])?;
        check_non_negative("fee", &self.fee)?;
        check_authority("owner", &self.owner)?;
        check_authority("active", &self.active)?;
        check_authority("posting", &self.posting)?;
        check_json("json_metadata", &self.json_metadata)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountUpdateOperation {
    pub account: AccountName,
    pub owner: Option<Authority>,
    pub active: Option<Authority>,
    pub posting: Option<Authority>,
    pub memo_key: String,
    pub json_metadata: String,
}

impl AccountUpdateOperation {
    pub fn validate(&self) -> Result<(), ChainError> {
        check_name("account", &self.account)?;
        if let Some(owner) = &self.owner {
            check_authority("owner", owner)?;
        }
        if let Some(active) = &self.active {
            check_authority("active", active)?;
        }
        if let Some(posting) = &self.posting {
            check_authority("posting", posting)?;
        }
        check_json("json_metadata", &self.json_metadata)
    }
}

/// Filed by the recovery partner; an empty-threshold authority cancels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestAccountRecoveryOperation {
    pub recovery_account: AccountName,
    pub account_to_recover: AccountName,
    pub new_owner_authority: Authority,
}

impl RequestAccountRecoveryOperation {
    pub fn validate(&self) -> Result<(), ChainError> {
        check_name("recovery_account", &self.recovery_account)?;
        check_name("account_to_recover", &self.account_to_recover)?;
        for name in self.new_owner_authority.account_auths.keys() {
            check_name("new_owner_authority", name)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoverAccountOperation {
    pub account_to_recover: AccountName,
    pub new_owner_authority: Authority,
    pub recent_owner_authority: Authority,
}

impl RecoverAccountOperation {
    pub fn validate(&self) -> Result<(), ChainError> {
        check_name("account_to_recover", &self.account_to_recover)?;
        ensure(
            self.new_owner_authority != self.recent_owner_authority,
            "Cannot set new owner authority to the recent owner authority",
        )?;
        check_authority("new_owner_authority", &self.new_owner_authority)?;
        check_authority("recent_owner_authority", &self.recent_owner_authority)?;
        ensure(
            self.new_owner_authority.weight_threshold > 0,
            "new owner authority cannot be trivial",
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecoveryAccountOperation {
    pub account_to_recover: AccountName,
    pub new_recovery_account: AccountName,
}

impl ChangeRecoveryAccountOperation {
    pub fn validate(&self) -> Result<(), ChainError> {
        check_name("account_to_recover", &self.account_to_recover)?;
        check_name("new_recovery_account", &self.new_recovery_account)
    }
}

// =============================================================================
// CUSTOM
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomJsonOperation {
    pub required_auths: BTreeSet<AccountName>,
    pub required_posting_auths: BTreeSet<AccountName>,
    pub id: String,
    pub json: String,
}

impl CustomJsonOperation {
    pub fn validate(&self) -> Result<(), ChainError> {
        ensure(
            !self.required_auths.is_empty() || !self.required_posting_auths.is_empty(),
            "at least one account must be specified",
        )?;
        check_custom_id(&self.id)?;
        serde_json::from_str::<serde_json::Value>(&self.json)
            .map(|_| ())
            .map_err(|err| invalid("json", format!("not valid JSON: {err}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomBinaryOperation {
    pub required_owner_auths: BTreeSet<AccountName>,
    pub required_active_auths: BTreeSet<AccountName>,
    pub required_posting_auths: BTreeSet<AccountName>,
    pub id: String,
    pub data: Vec<u8>,
}

impl CustomBinaryOperation {
    pub fn validate(&self) -> Result<(), ChainError> {
        ensure(
            !self.required_owner_auths.is_empty()
                || !self.required_active_auths.is_empty()
                || !self.required_posting_auths.is_empty(),
            "at least one account must be specified",
        )?;
        check_custom_id(&self.id)
    }
}

// =============================================================================
// TAGGED UNION
// =============================================================================

/// Implemented by every operation payload so evaluators can extract their
/// concrete type from the [`Operation`] union.
pub trait OperationPayload: Sized {
    const KIND: OperationKind;

    fn extract(op: &Operation) -> Option<&Self>;
}

macro_rules! operations {
    ($($variant:ident($payload:ident) => $name:literal,)*) => {
        /// A user operation.
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum Operation {
            $($variant($payload),)*
        }

        /// Discriminant of [`Operation`], the key of the evaluator registry.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum OperationKind {
            $($variant,)*
        }

        impl OperationKind {
            pub const ALL: &'static [OperationKind] = &[$(OperationKind::$variant,)*];

            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(OperationKind::$variant => $name,)*
                }
            }
        }

        impl Operation {
            #[must_use]
            pub fn kind(&self) -> OperationKind {
                match self {
                    $(Operation::$variant(_) => OperationKind::$variant,)*
                }
            }

            /// Stateless checks of the payload.
            pub fn validate(&self) -> Result<(), ChainError> {
                match self {
                    $(Operation::$variant(op) => op.validate(),)*
                }
            }
        }

        $(
            impl OperationPayload for $payload {
                const KIND: OperationKind = OperationKind::$variant;

                fn extract(op: &Operation) -> Option<&Self> {
                    match op {
                        Operation::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            }

            impl From<$payload> for Operation {
                fn from(op: $payload) -> Self {
                    Operation::$variant(op)
                }
            }
        )*
    };
}

operations! {
    Transfer(TransferOperation) => "transfer",
    TransferToVesting(TransferToVestingOperation) => "transfer_to_vesting",
    WithdrawVesting(WithdrawVestingOperation) => "withdraw_vesting",
    SetWithdrawVestingRoute(SetWithdrawVestingRouteOperation) => "set_withdraw_vesting_route",
    DelegateVestingShares(DelegateVestingSharesOperation) => "delegate_vesting_shares",
    TransferToSavings(TransferToSavingsOperation) => "transfer_to_savings",
    TransferFromSavings(TransferFromSavingsOperation) => "transfer_from_savings",
    CancelTransferFromSavings(CancelTransferFromSavingsOperation) => "cancel_transfer_from_savings",
    Convert(ConvertOperation) => "convert",
    LimitOrderCreate(LimitOrderCreateOperation) => "limit_order_create",
    LimitOrderCreate2(LimitOrderCreate2Operation) => "limit_order_create2",
    LimitOrderCancel(LimitOrderCancelOperation) => "limit_order_cancel",
    FeedPublish(FeedPublishOperation) => "feed_publish",
    WitnessUpdate(WitnessUpdateOperation) => "witness_update",
    AccountWitnessVote(AccountWitnessVoteOperation) => "account_witness_vote",
    AccountWitnessProxy(AccountWitnessProxyOperation) => "account_witness_proxy",
    DeclineVotingRights(DeclineVotingRightsOperation) => "decline_voting_rights",
    EscrowTransfer(EscrowTransferOperation) => "escrow_transfer",
    EscrowApprove(EscrowApproveOperation) => "escrow_approve",
    EscrowDispute(EscrowDisputeOperation) => "escrow_dispute",
    EscrowRelease(EscrowReleaseOperation) => "escrow_release",
    AccountCreate(AccountCreateOperation) => "account_create",
    AccountUpdate(AccountUpdateOperation) => "account_update",
    RequestAccountRecovery(RequestAccountRecoveryOperation) => "request_account_recovery",
    RecoverAccount(RecoverAccountOperation) => "recover_account",
    ChangeRecoveryAccount(ChangeRecoveryAccountOperation) => "change_recovery_account",
    CustomJson(CustomJsonOperation) => "custom_json",
    CustomBinary(CustomBinaryOperation) => "custom_binary",
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// VIRTUAL OPERATIONS
// =============================================================================

/// Audit record of an economic side effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VirtualOperation {
    /// Both legs of one match: the taker's (`current_*`) and the maker's
    /// (`open_*`).
    FillOrder {
        current_owner: AccountName,
        current_orderid: u32,
        current_pays: Asset,
        open_owner: AccountName,
        open_orderid: u32,
        open_pays: Asset,
    },
    Interest {
        owner: AccountName,
        interest: Asset,
    },
    FillVestingWithdraw {
        from_account: AccountName,
        to_account: AccountName,
        withdrawn: Asset,
        deposited: Asset,
    },
    FillConvertRequest {
        owner: AccountName,
        requestid: u32,
        amount_in: Asset,
        amount_out: Asset,
    },
    FillTransferFromSavings {
        from: AccountName,
        to: AccountName,
        amount: Asset,
        request_id: u32,
        memo: String,
    },
    ReturnVestingDelegation {
        account: AccountName,
        vesting_shares: Asset,
    },
    LiquidityReward {
        owner: AccountName,
        payout: Asset,
    },
}

impl VirtualOperation {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            VirtualOperation::FillOrder { .. } => "fill_order",
            VirtualOperation::Interest { .. } => "interest",
            VirtualOperation::FillVestingWithdraw { .. } => "fill_vesting_withdraw",
            VirtualOperation::FillConvertRequest { .. } => "fill_convert_request",
            VirtualOperation::FillTransferFromSavings { .. } => "fill_transfer_from_savings",
            VirtualOperation::ReturnVestingDelegation { .. } => "return_vesting_delegation",
            VirtualOperation::LiquidityReward { .. } => "liquidity_reward",
        }
    }
}
