//! Version-ranged evaluator table.

use super::{ApplyFn, EvaluationContext, Evaluator, FnEvaluator};
use crate::domain::{
    ChainError, ChainVersion, InternalError, Operation, OperationKind, OperationPayload,
    VersionRange,
};
use std::collections::BTreeMap;

struct Registration {
    range: VersionRange,
    evaluator: Box<dyn Evaluator>,
}

/// `OperationKind -> [(VersionRange, Evaluator)]`.
///
/// Ranges of one kind never overlap; [`seal`](Self::seal) additionally
/// requires them to run from genesis to an open end without gaps.
#[derive(Default)]
pub struct EvaluatorRegistry {
    entries: BTreeMap<OperationKind, Vec<Registration>>,
}

impl EvaluatorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `evaluator` for the versions in `range`.
    pub fn register<E>(&mut self, range: VersionRange, evaluator: E) -> Result<(), ChainError>
    where
        E: Evaluator + 'static,
    {
        let kind = evaluator.kind();
        let registrations = self.entries.entry(kind).or_default();
        if let Some(existing) = registrations.iter().find(|r| r.range.overlaps(&range)) {
            return Err(InternalError::OverlappingRanges {
                operation: kind.name(),
                first: existing.range,
                second: range,
            }
            .into());
        }

        registrations.push(Registration {
            range,
            evaluator: Box::new(evaluator),
        });
        registrations.sort_by_key(|r| r.range.start);
        Ok(())
    }

    pub fn register_fn<P>(&mut self, range: VersionRange, apply: ApplyFn<P>) -> Result<(), ChainError>
    where
        P: OperationPayload + 'static,
    {
        self.register(range, FnEvaluator::new(apply))
    }

    /// Checks that the ranges of every registered kind start at genesis,
    /// end unbounded and are contiguous in between.
    pub fn seal(&self) -> Result<(), ChainError> {
        for (kind, registrations) in &self.entries {
            if let Some(first) = registrations.first() {
                if first.range.start != ChainVersion::GENESIS {
                    return Err(InternalError::UncoveredVersions {
                        operation: kind.name(),
                        side: "before",
                        range: first.range,
                    }
                    .into());
                }
            }
            if let Some(last) = registrations.last() {
                if last.range.end.is_some() {
                    return Err(InternalError::UncoveredVersions {
                        operation: kind.name(),
                        side: "after",
                        range: last.range,
                    }
                    .into());
                }
            }
            for pair in registrations.windows(2) {
                let (before, after) = (pair[0].range, pair[1].range);
                if before.end != Some(after.start) {
                    return Err(InternalError::RangeGap {
                        operation: kind.name(),
                        before,
                        after,
                    }
                    .into());
                }
            }
        }
        tracing::debug!(kinds = self.entries.len(), "evaluator registry sealed");
        Ok(())
    }

    /// Evaluator for `kind` at `version`.
    pub fn resolve(
        &self,
        kind: OperationKind,
        version: ChainVersion,
    ) -> Result<&dyn Evaluator, ChainError> {
        self.entries
            .get(&kind)
            .and_then(|registrations| {
                registrations
                    .iter()
                    .find(|r| r.range.contains(version))
            })
            .map(|r| r.evaluator.as_ref())
            .ok_or_else(|| {
                InternalError::NoEvaluator {
                    operation: kind.name(),
                    version,
                }
                .into()
            })
    }

    /// Applies `op` with the evaluator of the state's active version.
    pub fn apply(&self, ctx: &mut EvaluationContext<'_>, op: &Operation) -> Result<(), ChainError> {
        let kind = op.kind();
        let evaluator = self.resolve(kind, ctx.state.version())?;
        tracing::debug!(operation = %kind, version = %ctx.state.version(), "applying operation");
        evaluator.apply(ctx, op)
    }
}
