//! The per-provider processing run
//!
//! Reads a provider's verbatim records page by page, maps each record
//! through the provider's factory, validates, splits the batch into the
//! public and protected partitions and commits both as one unit.

use super::cancel::CancellationToken;
use super::export::ExportSink;
use super::registry::RunRegistry;
use crate::config::{PipelineConfig, RetryPolicy};
use crate::factory::{create_factory, FactoryContext, ObservationFactory};
use crate::model::{
    AccessRights, DataProvider, InvalidObservation, Observation, ProcessMode, RunResult, RunStatus,
    VerbatimRecord,
};
use crate::storage::{retry_with_backoff, IndexBatch, RetryError, Stores};
use crate::validation::{add_invalid_observations_to_db, invalid_observation, ValidationManager};
use std::sync::Arc;
use thiserror::Error;

/// Errors that end a run as `Failed`
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Store(#[from] RetryError),
}

/// Per-run knobs taken from the pipeline configuration
#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    pub batch_size: usize,
    pub diffuse_if_supported: bool,
    pub retry: RetryPolicy,
}

impl From<&PipelineConfig> for ProcessorSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            diffuse_if_supported: config.diffuse_if_supported,
            retry: config.retry.clone(),
        }
    }
}

/// One record's journey through a batch
struct Pending {
    key: String,
    exact: Observation,
    public: Option<Observation>,
}

enum Completion {
    Finished,
    Cancelled,
}

pub struct ObservationProcessor {
    stores: Stores,
    context: FactoryContext,
    validation: ValidationManager,
    settings: ProcessorSettings,
    export: Option<Arc<dyn ExportSink>>,
    registry: RunRegistry,
}

impl ObservationProcessor {
    pub fn new(stores: Stores, context: FactoryContext, config: &PipelineConfig) -> Self {
        Self {
            stores,
            context,
            validation: ValidationManager::new(config.validation.clone()),
            settings: ProcessorSettings::from(config),
            export: None,
            registry: RunRegistry::new(),
        }
    }

    pub fn with_export(mut self, export: Arc<dyn ExportSink>) -> Self {
        self.export = Some(export);
        self
    }

    pub fn with_registry(mut self, registry: RunRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &RunRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &ProcessorSettings {
        &self.settings
    }

    pub fn context(&self) -> &FactoryContext {
        &self.context
    }

    /// Process every staged record of `provider`.
    ///
    /// Never returns an error: the outcome, including failures, is the
    /// returned run result, which is also saved to the harvest-info store.
    pub async fn process_observations(
        &self,
        provider: &DataProvider,
        mode: ProcessMode,
        cancel: &CancellationToken,
    ) -> RunResult {
        let factory = create_factory(provider.clone(), self.context.clone());
        self.process_with_factory(factory.as_ref(), mode, cancel).await
    }

    /// Same as [`process_observations`](Self::process_observations) with a
    /// caller-chosen factory.
    pub async fn process_with_factory(
        &self,
        factory: &dyn ObservationFactory,
        mode: ProcessMode,
        cancel: &CancellationToken,
    ) -> RunResult {
        let provider = factory.provider();
        let mut run = RunResult::new(provider.id);
        run.transition(RunStatus::Running);
        self.registry.update(&run);
        tracing::info!(provider = %provider, ?mode, "processing started");

        match self.run_batches(factory, mode, cancel, &mut run).await {
            Ok(Completion::Finished) => {
                run.transition(RunStatus::Succeeded);
            }
            Ok(Completion::Cancelled) => {
                tracing::warn!(provider = %provider, committed = run.committed_count(), "processing cancelled");
                run.transition(RunStatus::Canceled);
            }
            Err(e) => {
                tracing::error!(provider = %provider, error = %e, "processing failed");
                run.message = Some(e.to_string());
                run.transition(RunStatus::Failed);
            }
        }

        self.save_run(provider, &run).await;

        tracing::info!(
            provider = %provider,
            status = %run.status,
            public = run.public_count,
            protected = run.protected_count,
            invalid = run.invalid_count,
            failed = run.failed_count,
            "processing finished"
        );
        run
    }

    /// Close the run of a provider whose task ended without returning a
    /// result. Counts reported to the registry so far are kept.
    pub async fn abandon(&self, provider: &DataProvider, message: impl Into<String>) -> RunResult {
        let mut run = self
            .registry
            .get(provider.id)
            .filter(|run| !run.status.is_terminal())
            .unwrap_or_else(|| RunResult::new(provider.id));
        run.message = Some(message.into());
        run.transition(RunStatus::Failed);
        tracing::error!(provider = %provider, message = ?run.message, "processing abandoned");
        self.save_run(provider, &run).await;
        run
    }

    async fn save_run(&self, provider: &DataProvider, run: &RunResult) {
        self.registry.update(run);
        if let Err(e) = retry_with_backoff("save run result", &self.settings.retry, || {
            self.stores.harvest_info.upsert_run(run)
        })
        .await
        {
            tracing::error!(provider = %provider, error = %e, "run result could not be saved");
        }
    }

    async fn run_batches(
        &self,
        factory: &dyn ObservationFactory,
        mode: ProcessMode,
        cancel: &CancellationToken,
        run: &mut RunResult,
    ) -> Result<Completion, ProcessError> {
        if cancel.is_cancelled() {
            return Ok(Completion::Cancelled);
        }
        let provider = factory.provider();
        let retry = &self.settings.retry;

        if mode == ProcessMode::Full {
            let removed = retry_with_backoff("delete provider observations", retry, || {
                self.stores.index.delete_provider_data(provider.id)
            })
            .await?;
            let removed_invalid = retry_with_backoff("delete invalid observations", retry, || {
                self.stores.invalid.delete_invalid(provider.id)
            })
            .await?;
            tracing::debug!(provider = %provider, removed, removed_invalid, "previous provider data removed");
        }

        if let Some(export) = &self.export {
            if let Err(e) = export.begin(provider, mode).await {
                tracing::warn!(provider = %provider, error = %e, "export could not be started");
            }
        }

        let mut cursor = retry_with_backoff("open verbatim cursor", retry, || {
            self.stores.verbatim.open_cursor(provider.id)
        })
        .await?;

        let mut batch = 0u64;
        loop {
            if cancel.is_cancelled() {
                return Ok(Completion::Cancelled);
            }
            let page = retry_with_backoff("read verbatim page", retry, || {
                cursor.next_page(self.settings.batch_size)
            })
            .await?;
            if page.is_empty() {
                return Ok(Completion::Finished);
            }
            batch += 1;
            self.process_batch(factory, batch, &page, run).await?;
            self.registry.update(run);
        }
    }

    async fn process_batch(
        &self,
        factory: &dyn ObservationFactory,
        batch: u64,
        page: &[VerbatimRecord],
        run: &mut RunResult,
    ) -> Result<(), ProcessError> {
        let provider = factory.provider();

        let mut pending = Vec::with_capacity(page.len());
        for verbatim in page {
            match factory.create_processed_observation(verbatim, false) {
                Ok(mut exact) => {
                    exact.data_provider_id = provider.id;
                    let public = if exact.is_sensitive() {
                        factory.public_copy(&exact, self.settings.diffuse_if_supported)
                    } else {
                        None
                    };
                    pending.push(Pending {
                        key: verbatim.key.clone(),
                        exact,
                        public,
                    });
                }
                Err(e) => {
                    run.failed_count += 1;
                    tracing::warn!(provider = %provider, key = %verbatim.key, error = %e, "record skipped");
                }
            }
        }

        // A public copy is committed only if its exact twin is valid
        let (valid, rejected) = self.validation.partition(pending, |p| &p.exact);
        let mut changes = IndexBatch::default();
        let mut invalid: Vec<InvalidObservation> = Vec::with_capacity(rejected.len());
        for (p, defects) in rejected {
            withdraw(&mut changes.withdraw_public, &p.exact);
            withdraw(&mut changes.withdraw_protected, &p.exact);
            invalid.push(invalid_observation(&p.exact, defects, Some(&p.key)));
        }

        for Pending { exact, public: copy, .. } in valid {
            if exact.is_sensitive() {
                if copy.is_none() {
                    withdraw(&mut changes.withdraw_public, &exact);
                }
                changes.public.extend(copy.map(publish));
                changes.protected.push(protect(exact));
            } else {
                withdraw(&mut changes.withdraw_protected, &exact);
                changes.public.push(publish(exact));
            }
        }

        retry_with_backoff("commit batch", &self.settings.retry, || {
            self.stores.index.commit_batch(provider.id, &changes)
        })
        .await?;

        run.public_count += changes.public.len() as u64;
        run.protected_count += changes.protected.len() as u64;
        run.invalid_count += invalid.len() as u64;
        tracing::debug!(
            provider = %provider,
            batch,
            public = changes.public.len(),
            protected = changes.protected.len(),
            invalid = invalid.len(),
            withdrawn = changes.withdraw_public.len() + changes.withdraw_protected.len(),
            "batch committed"
        );

        add_invalid_observations_to_db(self.stores.invalid.as_ref(), &invalid, &self.settings.retry).await;

        if let Some(export) = &self.export {
            if let Err(e) = export.write_batch(provider, &changes.public).await {
                tracing::warn!(provider = %provider, batch, error = %e, "export of batch failed");
            }
        }
        Ok(())
    }
}

/// Queue removal of a document an earlier run may have left behind
fn withdraw(ids: &mut Vec<String>, observation: &Observation) {
    let id = observation.occurrence_id();
    if !id.is_empty() {
        ids.push(id.to_string());
    }
}

fn protect(mut observation: Observation) -> Observation {
    observation.protected = true;
    observation.access_rights = AccessRights::NotForPublicUsage;
    observation
}

fn publish(mut observation: Observation) -> Observation {
    observation.protected = false;
    observation.access_rights = AccessRights::FreeUsage;
    observation
}
