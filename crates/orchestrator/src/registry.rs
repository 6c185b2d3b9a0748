use board_core::WorkerRole;
use std::collections::HashMap;
use std::sync::Arc;

use crate::worker::Worker;

/// Static mapping from role to its worker capability. Holds no per-call
/// state, so one registry is shared across all concurrent passes.
#[derive(Clone, Default)]
pub struct WorkerRegistry {
    workers: HashMap<WorkerRole, Arc<dyn Worker>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, role: WorkerRole, worker: Arc<dyn Worker>) -> Self {
        self.workers.insert(role, worker);
        self
    }

    pub fn resolve(&self, role: WorkerRole) -> Option<Arc<dyn Worker>> {
        self.workers.get(&role).cloned()
    }

    pub fn registered_roles(&self) -> Vec<WorkerRole> {
        self.workers.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::WorkerError;
    use async_trait::async_trait;
    use board_core::WorkerResult;

    struct NoopWorker;

    #[async_trait]
    impl Worker for NoopWorker {
        async fn execute(&self, _description: &str) -> Result<WorkerResult, WorkerError> {
            Ok(WorkerResult::new("ok", 0.5))
        }
    }

    #[test]
    fn test_resolve_registered_role() {
        let registry = WorkerRegistry::new().register(WorkerRole::Cfo, Arc::new(NoopWorker));

        assert!(registry.resolve(WorkerRole::Cfo).is_some());
        assert!(registry.resolve(WorkerRole::Cto).is_none());
        assert_eq!(registry.registered_roles(), vec![WorkerRole::Cfo]);
    }
}
