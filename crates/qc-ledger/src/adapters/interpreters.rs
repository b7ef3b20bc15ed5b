//! Registry of custom operation interpreters.

use crate::domain::ChainError;
use crate::ports::{CustomOperationInterpreter, InterpreterLookup};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Interpreters keyed by custom operation id. Plugins register at startup;
/// evaluators look up on every custom operation.
#[derive(Default)]
pub struct InterpreterRegistry {
    interpreters: RwLock<HashMap<String, Arc<dyn CustomOperationInterpreter>>>,
}

impl InterpreterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `interpreter` for `id`. An id can be claimed only once.
    pub fn register(
        &self,
        id: impl Into<String>,
        interpreter: Arc<dyn CustomOperationInterpreter>,
    ) -> Result<(), ChainError> {
        let id = id.into();
        let mut interpreters = self.interpreters.write();
        if interpreters.contains_key(&id) {
            return Err(ChainError::rule(format!(
                "Custom operation interpreter already registered for '{id}'"
            )));
        }
        tracing::info!(id = %id, "custom operation interpreter registered");
        interpreters.insert(id, interpreter);
        Ok(())
    }

    pub fn unregister(&self, id: &str) -> Option<Arc<dyn CustomOperationInterpreter>> {
        self.interpreters.write().remove(id)
    }

    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.interpreters.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl InterpreterLookup for InterpreterRegistry {
    fn interpreter(&self, id: &str) -> Option<Arc<dyn CustomOperationInterpreter>> {
        self.interpreters.read().get(id).cloned()
    }
}
