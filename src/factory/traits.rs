//! Observation factory contract
//!
//! A factory transforms one provider's verbatim records into canonical
//! observations. The processor only sees `dyn ObservationFactory`.

use crate::diffusion::DiffusionManager;
use crate::model::{DataProvider, Observation, ProviderId, ProviderKind, VerbatimRecord};
use crate::resolve::{AreaEnricher, TaxonContext, VocabularyResolver};
use crate::storage::{AreaRepository, StorageResult, TaxonRepository, VocabularyRepository};
use std::sync::Arc;
use thiserror::Error;

/// Record-level transformation failures. The record is skipped and
/// counted as failed; the run continues.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FactoryError {
    #[error("record '{key}' is not a valid {kind:?} payload: {reason}")]
    InvalidPayload {
        key: String,
        kind: ProviderKind,
        reason: String,
    },

    #[error("record '{key}' belongs to provider {found}, factory serves provider {expected}")]
    ProviderMismatch {
        key: String,
        expected: ProviderId,
        found: ProviderId,
    },
}

/// Read-only snapshots shared by every factory of a run.
///
/// Built once before any provider starts; cloning only bumps reference
/// counts.
#[derive(Debug, Clone)]
pub struct FactoryContext {
    pub taxa: Arc<TaxonContext>,
    pub vocabularies: Arc<VocabularyResolver>,
    pub areas: Arc<AreaEnricher>,
    pub diffusion: Arc<DiffusionManager>,
}

impl FactoryContext {
    pub fn new(
        taxa: Arc<TaxonContext>,
        vocabularies: Arc<VocabularyResolver>,
        areas: Arc<AreaEnricher>,
        diffusion: Arc<DiffusionManager>,
    ) -> Self {
        Self {
            taxa,
            vocabularies,
            areas,
            diffusion,
        }
    }

    /// Load every reference snapshot from its repository
    pub fn load(
        taxa: &dyn TaxonRepository,
        vocabularies: &dyn VocabularyRepository,
        areas: &dyn AreaRepository,
        diffusion: DiffusionManager,
    ) -> StorageResult<Self> {
        let taxa = TaxonContext::build(taxa.load_taxa()?);
        let vocabularies = VocabularyResolver::build(vocabularies.load_vocabularies()?);
        let areas = AreaEnricher::new(areas.load_areas()?);
        tracing::info!(
            taxa = taxa.len(),
            areas = areas.len(),
            taxon_cycles = taxa.cycles().len(),
            "reference data loaded"
        );
        Ok(Self::new(
            Arc::new(taxa),
            Arc::new(vocabularies),
            Arc::new(areas),
            Arc::new(diffusion),
        ))
    }

    /// Diffuse the location and re-derive its areas from the generalized point
    pub fn generalize(&self, observation: &mut Observation) {
        self.diffusion.apply(observation);
        self.areas.enrich(&mut observation.location);
    }
}

/// The contract every provider variant implements.
pub trait ObservationFactory: Send + Sync {
    fn provider(&self) -> &DataProvider;

    fn context(&self) -> &FactoryContext;

    /// Map one verbatim record to its exact canonical observation.
    ///
    /// Deterministic for a given record and context. Missing optional
    /// fields are left empty; values present but unusable become defects.
    fn create_observation(&self, verbatim: &VerbatimRecord) -> Result<Observation, FactoryError>;

    /// Create the observation and, when `diffuse_if_supported` is set and
    /// the provider allows it, return it with a generalized location.
    fn create_processed_observation(
        &self,
        verbatim: &VerbatimRecord,
        diffuse_if_supported: bool,
    ) -> Result<Observation, FactoryError> {
        let mut observation = self.create_observation(verbatim)?;
        if diffuse_if_supported && observation.is_sensitive() && self.provider().supports_diffusion {
            self.context().generalize(&mut observation);
        }
        Ok(observation)
    }

    /// The public-partition version of an exact observation.
    ///
    /// Not-sensitive observations are published as they are. Sensitive
    /// ones are published diffused, or not at all when diffusion is
    /// disabled or the provider does not allow it.
    fn public_copy(&self, exact: &Observation, diffuse_if_supported: bool) -> Option<Observation> {
        if !exact.is_sensitive() {
            return Some(exact.clone());
        }
        if !(diffuse_if_supported && self.provider().supports_diffusion) {
            return None;
        }
        let mut copy = exact.clone();
        self.context().generalize(&mut copy);
        Some(copy)
    }
}
