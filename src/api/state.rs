//! Application state for the Payroll Engine API.

use std::sync::Arc;

use crate::config::StatutoryConfig;
use crate::orchestrator::PayrollOrchestrator;
use crate::ports::Notifier;
use crate::store::MemoryStore;

/// Shared application state.
///
/// Handlers only talk to the orchestrator; it owns the storage ports.
#[derive(Clone)]
pub struct AppState {
    orchestrator: PayrollOrchestrator,
}

impl AppState {
    /// Creates a new application state around an orchestrator.
    pub fn new(orchestrator: PayrollOrchestrator) -> Self {
        Self { orchestrator }
    }

    /// Creates a state backed by a single in-memory store.
    pub fn in_memory(
        store: Arc<MemoryStore>,
        notifier: Arc<dyn Notifier>,
        config: StatutoryConfig,
    ) -> Self {
        Self::new(PayrollOrchestrator::new(
            store.clone(),
            store,
            notifier,
            Arc::new(config),
        ))
    }

    /// Returns the orchestrator.
    pub fn orchestrator(&self) -> &PayrollOrchestrator {
        &self.orchestrator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_clone() {
        // Verify AppState can be cloned (required for axum state)
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }
}
