//! FailureTracker - consecutive failures per (frontend, domain, scope)
//!
//! Plain read-then-write against the state store. Concurrent updates to one
//! key may race; counts are best-effort.

use std::sync::Arc;

use contracts::{ContractError, FailureKey, StateStore};

/// How one outcome changed a counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureTransition {
    /// Success with no prior failures
    Unchanged,
    /// Success after `previous` failures; counter reset to 0
    Recovered { previous: i64 },
    /// Failure; counter is now `count`
    Failed { count: i64 },
}

#[derive(Clone)]
pub struct FailureTracker {
    state: Arc<dyn StateStore>,
}

impl FailureTracker {
    pub fn new(state: Arc<dyn StateStore>) -> Self {
        Self { state }
    }

    /// Current count for a key (0 when never failed)
    pub fn count(&self, key: &FailureKey) -> Result<i64, ContractError> {
        Ok(self.state.get_or(&key.state_key(), 0)?.max(0))
    }

    /// Apply one dispatch outcome
    pub fn record(&self, key: &FailureKey, ok: bool) -> Result<FailureTransition, ContractError> {
        let state_key = key.state_key();
        let count = self.count(key)?;

        if ok {
            if count > 0 {
                self.state.set(&state_key, serde_json::json!(0))?;
                return Ok(FailureTransition::Recovered { previous: count });
            }
            return Ok(FailureTransition::Unchanged);
        }

        let count = count + 1;
        self.state.set(&state_key, serde_json::json!(count))?;
        Ok(FailureTransition::Failed { count })
    }

    /// Clear a counter
    pub fn reset(&self, key: &FailureKey) -> Result<(), ContractError> {
        self.state.set(&key.state_key(), serde_json::json!(0))
    }
}
