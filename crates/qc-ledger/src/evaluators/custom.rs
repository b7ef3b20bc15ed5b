//! Custom operations, handed to plugin interpreters by id.
//!
//! An id with no registered interpreter is a no-op. Interpreter failures
//! roll back only the interpreter's own writes and are logged, unless this
//! node is producing the block: then the failure aborts the transaction.

use super::{Disabled, EvaluationContext, EvaluatorRegistry};
use crate::domain::hardfork;
use crate::domain::{
    ChainError, ChainVersion, CustomBinaryOperation, CustomJsonOperation, OperationKind,
    VersionRange,
};
use crate::ports::CustomPayload;

pub(super) fn register(registry: &mut EvaluatorRegistry) -> Result<(), ChainError> {
    registry.register_fn(VersionRange::always(), custom_json)?;

    let binary = ChainVersion::hardfork(hardfork::CUSTOM_BINARY);
    registry.register(
        VersionRange::until(binary),
        Disabled {
            kind: OperationKind::CustomBinary,
            required: hardfork::CUSTOM_BINARY,
        },
    )?;
    registry.register_fn(VersionRange::from(binary), custom_binary)?;
    Ok(())
}

fn interpret(ctx: &mut EvaluationContext<'_>, payload: CustomPayload<'_>) -> Result<(), ChainError> {
    let id = payload.id();
    let Some(interpreter) = ctx.interpreters.interpreter(id) else {
        return Ok(());
    };

    match ctx.state.with_session(|state| interpreter.apply(state, payload)) {
        Ok(()) => Ok(()),
        Err(err) if err.is_fatal() => Err(err),
        Err(err) if ctx.producing => Err(ChainError::Interpreter {
            id: id.to_string(),
            message: err.to_string(),
        }),
        Err(err) => {
            tracing::warn!(id, error = %err, "custom operation interpreter failed");
            Ok(())
        }
    }
}

fn custom_json(ctx: &mut EvaluationContext<'_>, op: &CustomJsonOperation) -> Result<(), ChainError> {
    interpret(ctx, CustomPayload::Json(op))
}

fn custom_binary(
    ctx: &mut EvaluationContext<'_>,
    op: &CustomBinaryOperation,
) -> Result<(), ChainError> {
    interpret(ctx, CustomPayload::Binary(op))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ValidationError;
    use crate::evaluators::default_registry;
    use crate::ports::outbound::mocks::{MockInterpreter, NoInterpreters, SingleInterpreter};
    use crate::policies::test_support::state;
    use crate::state::ChainState;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn json(id: &str) -> CustomJsonOperation {
        CustomJsonOperation {
            required_auths: BTreeSet::new(),
            required_posting_auths: ["alice".into()].into_iter().collect(),
            id: id.into(),
            json: "{\"follow\":true}".into(),
        }
    }

    fn run(
        state: &mut ChainState,
        interpreter: Arc<MockInterpreter>,
        producing: bool,
        op: impl Into<crate::domain::Operation>,
    ) -> Result<(), ChainError> {
        let registry = default_registry()?;
        let lookup = SingleInterpreter(interpreter);
        let op = op.into();
        state.with_session(|state| {
            let mut ctx = EvaluationContext::new(state, &lookup).producing(producing);
            registry.apply(&mut ctx, &op)
        })
    }

    fn pow_witnesses(state: &ChainState) -> u32 {
        state.props().unwrap().num_pow_witnesses
    }

    #[test]
    fn test_unknown_id_is_noop() {
        let mut state = state();
        let registry = default_registry().unwrap();
        let op = json("follow").into();
        let mut ctx = EvaluationContext::new(&mut state, &NoInterpreters).producing(true);
        registry.apply(&mut ctx, &op).unwrap();
    }

    #[test]
    fn test_interpreter_sees_payload() {
        let mut state = state();
        let interpreter = Arc::new(MockInterpreter::default());
        run(&mut state, interpreter.clone(), false, json("follow")).unwrap();

        assert_eq!(*interpreter.seen.lock(), vec!["follow".to_string()]);
        assert_eq!(pow_witnesses(&state), 1);
    }

    #[test]
    fn test_failure_swallowed_when_validating() {
        let mut state = state();
        let interpreter = Arc::new(MockInterpreter {
            fail: true,
            ..MockInterpreter::default()
        });
        run(&mut state, interpreter, false, json("follow")).unwrap();
        // the interpreter's own writes are rolled back
        assert_eq!(pow_witnesses(&state), 0);
    }

    #[test]
    fn test_failure_fatal_to_transaction_when_producing() {
        let mut state = state();
        let interpreter = Arc::new(MockInterpreter {
            fail: true,
            ..MockInterpreter::default()
        });
        let err = run(&mut state, interpreter, true, json("follow")).unwrap_err();

        assert!(matches!(err, ChainError::Interpreter { ref id, .. } if id == "follow"));
        assert!(!err.is_fatal());
        assert_eq!(pow_witnesses(&state), 0);
    }

    #[test]
    fn test_binary_gated_by_hardfork() {
        let mut state = state();
        let interpreter = Arc::new(MockInterpreter::default());
        let op = CustomBinaryOperation {
            required_owner_auths: BTreeSet::new(),
            required_active_auths: ["alice".into()].into_iter().collect(),
            required_posting_auths: BTreeSet::new(),
            id: "blob".into(),
            data: vec![1, 2, 3],
        };

        let err = run(&mut state, interpreter.clone(), false, op.clone()).unwrap_err();
        assert_eq!(
            err,
            ChainError::Validation(ValidationError::HardforkNotActive {
                required: hardfork::CUSTOM_BINARY
            })
        );

        state.set_version(ChainVersion::hardfork(hardfork::CUSTOM_BINARY));
        run(&mut state, interpreter.clone(), false, op).unwrap();
        assert_eq!(*interpreter.seen.lock(), vec!["blob".to_string()]);
    }
}
