//! # Evaluators
//!
//! One evaluator per operation kind, resolved by the active chain version.
//!
//! ## Dispatch
//!
//! ```text
//! Operation ──kind()──▶ EvaluatorRegistry ──version──▶ Evaluator::apply
//!                                                        │
//!                        extract payload ◀───────────────┘
//!                        rule checks → store mutation → virtual operations
//! ```
//!
//! Behaviour that changed at a hardfork is registered as separate
//! evaluators over adjacent version ranges. Operations that did not exist
//! before a hardfork get a [`Disabled`] evaluator for the earlier range, so
//! every kind resolves at every version.

pub mod account;
pub mod custom;
pub mod escrow;
pub mod market;
pub mod registry;
pub mod transfer;
pub mod vesting;
pub mod witness;

pub use registry::EvaluatorRegistry;

use crate::domain::{
    AccountName, Asset, ChainError, InternalError, Operation, OperationKind, OperationPayload,
    ValidationError,
};
use crate::ports::InterpreterLookup;
use crate::state::ChainState;

/// Everything an evaluator may touch while applying one operation.
pub struct EvaluationContext<'a> {
    pub state: &'a mut ChainState,
    pub interpreters: &'a dyn InterpreterLookup,
    /// Set while this node is producing the block being applied.
    pub producing: bool,
}

impl<'a> EvaluationContext<'a> {
    #[must_use]
    pub fn new(state: &'a mut ChainState, interpreters: &'a dyn InterpreterLookup) -> Self {
        Self {
            state,
            interpreters,
            producing: false,
        }
    }

    #[must_use]
    pub fn producing(mut self, producing: bool) -> Self {
        self.producing = producing;
        self
    }
}

/// Validates and applies one kind of operation.
pub trait Evaluator: Send + Sync {
    fn kind(&self) -> OperationKind;

    fn apply(&self, ctx: &mut EvaluationContext<'_>, op: &Operation) -> Result<(), ChainError>;
}

/// Typed body of an evaluator.
pub type ApplyFn<P> = fn(&mut EvaluationContext<'_>, &P) -> Result<(), ChainError>;

/// Evaluator backed by a plain function over the concrete payload.
pub struct FnEvaluator<P> {
    apply: ApplyFn<P>,
}

impl<P> FnEvaluator<P> {
    #[must_use]
    pub const fn new(apply: ApplyFn<P>) -> Self {
        Self { apply }
    }
}

impl<P: OperationPayload + 'static> Evaluator for FnEvaluator<P> {
    fn kind(&self) -> OperationKind {
        P::KIND
    }

    fn apply(&self, ctx: &mut EvaluationContext<'_>, op: &Operation) -> Result<(), ChainError> {
        let payload = P::extract(op).ok_or(InternalError::PayloadMismatch {
            expected: P::KIND.name(),
        })?;
        (self.apply)(ctx, payload)
    }
}

/// Rejects an operation that only becomes valid at `required`.
pub struct Disabled {
    pub kind: OperationKind,
    pub required: u8,
}

impl Evaluator for Disabled {
    fn kind(&self) -> OperationKind {
        self.kind
    }

    fn apply(&self, _ctx: &mut EvaluationContext<'_>, _op: &Operation) -> Result<(), ChainError> {
        Err(ValidationError::HardforkNotActive {
            required: self.required,
        }
        .into())
    }
}

/// Fails with [`ValidationError::InsufficientFunds`] unless `available`
/// covers `required`.
pub(crate) fn require_funds(
    account: &AccountName,
    available: Asset,
    required: Asset,
) -> Result<(), ChainError> {
    if available.amount < required.amount {
        return Err(ValidationError::InsufficientFunds {
            account: account.clone(),
            required,
            available,
        }
        .into());
    }
    Ok(())
}

/// Registry holding the evaluator of every supported operation.
pub fn default_registry() -> Result<EvaluatorRegistry, ChainError> {
    let mut registry = EvaluatorRegistry::new();
    transfer::register(&mut registry)?;
    vesting::register(&mut registry)?;
    market::register(&mut registry)?;
    witness::register(&mut registry)?;
    escrow::register(&mut registry)?;
    account::register(&mut registry)?;
    custom::register(&mut registry)?;
    registry.seal()?;
    Ok(registry)
}
