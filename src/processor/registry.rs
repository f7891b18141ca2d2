//! Live view of runs in progress
//!
//! The processor publishes its run result here after every batch so
//! operators can watch counters move before the run finishes.

use crate::model::{ProviderId, RunResult, RunStatus};
use dashmap::DashMap;
use std::sync::Arc;

/// Latest run result per provider. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct RunRegistry {
    runs: Arc<DashMap<ProviderId, RunResult>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current state of a run, replacing the previous one
    pub fn update(&self, run: &RunResult) {
        self.runs.insert(run.provider_id, run.clone());
    }

    pub fn get(&self, provider: ProviderId) -> Option<RunResult> {
        self.runs.get(&provider).map(|r| r.clone())
    }

    /// Every known run, ordered by provider id
    pub fn snapshot(&self) -> Vec<RunResult> {
        let mut runs: Vec<RunResult> = self.runs.iter().map(|r| r.value().clone()).collect();
        runs.sort_by_key(|run| run.provider_id);
        runs
    }

    pub fn running_count(&self) -> usize {
        self.runs
            .iter()
            .filter(|r| r.status == RunStatus::Running)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_update_wins() {
        let registry = RunRegistry::new();
        let mut run = RunResult::new(ProviderId(2));
        run.transition(RunStatus::Running);
        registry.update(&run);
        assert_eq!(registry.running_count(), 1);

        run.public_count = 10;
        run.transition(RunStatus::Succeeded);
        registry.update(&run);

        let seen = registry.get(ProviderId(2)).unwrap();
        assert_eq!(seen.public_count, 10);
        assert_eq!(seen.status, RunStatus::Succeeded);
        assert_eq!(registry.running_count(), 0);
    }

    #[test]
    fn snapshot_is_ordered() {
        let registry = RunRegistry::new();
        let shared = registry.clone();
        for id in [5, 1, 3] {
            shared.update(&RunResult::new(ProviderId(id)));
        }
        let ids: Vec<u32> = registry.snapshot().iter().map(|r| r.provider_id.0).collect();
        assert_eq!(ids, vec![1, 3, 5]);
    }
}
