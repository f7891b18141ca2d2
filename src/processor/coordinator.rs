//! Runs several providers concurrently
//!
//! Providers share nothing but the read-only reference snapshots and the
//! stores, so each run is an independent task. A semaphore caps how many
//! are in flight.

use super::cancel::CancellationToken;
use super::pipeline::ObservationProcessor;
use crate::model::{DataProvider, ProcessMode, ProviderId, RunResult};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub struct ProcessingCoordinator {
    processor: Arc<ObservationProcessor>,
    semaphore: Arc<Semaphore>,
}

impl ProcessingCoordinator {
    pub fn new(processor: Arc<ObservationProcessor>, max_concurrent: usize) -> Self {
        Self {
            processor,
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub fn processor(&self) -> &ObservationProcessor {
        &self.processor
    }

    /// Process every active provider and return their run results ordered
    /// by provider id. Inactive providers are skipped.
    ///
    /// Every active provider gets a result. A task that panics does not stop
    /// the others; its provider is recorded as `Failed`.
    pub async fn process_providers(
        &self,
        providers: &[DataProvider],
        mode: ProcessMode,
        cancel: &CancellationToken,
    ) -> Vec<RunResult> {
        let mut outstanding: BTreeMap<ProviderId, DataProvider> = BTreeMap::new();
        let mut tasks = JoinSet::new();
        for provider in providers {
            if !provider.is_active {
                tracing::info!(provider = %provider, "provider inactive, skipped");
                continue;
            }
            let processor = self.processor.clone();
            let semaphore = self.semaphore.clone();
            let cancel = cancel.clone();
            let provider = provider.clone();
            outstanding.insert(provider.id, provider.clone());
            tasks.spawn(async move {
                // The semaphore is never closed
                let _permit = semaphore.acquire_owned().await.ok();
                processor.process_observations(&provider, mode, &cancel).await
            });
        }

        let mut results = Vec::with_capacity(tasks.len());
        let mut task_errors = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(run) => {
                    outstanding.remove(&run.provider_id);
                    results.push(run);
                }
                Err(e) => {
                    tracing::error!(error = %e, "provider task ended abnormally");
                    task_errors.push(e.to_string());
                }
            }
        }

        // A join error does not say which provider it belonged to
        for provider in outstanding.values() {
            let message = format!("provider task failed: {}", task_errors.join("; "));
            results.push(self.processor.abandon(provider, message).await);
        }
        results.sort_by_key(|run| run.provider_id);
        results
    }
}
