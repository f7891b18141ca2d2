//! Storage trait definitions
//!
//! Inbound collaborators (verbatim records and reference data) are read
//! only. Outbound collaborators accept committed observations, invalid
//! observations and run results.

use crate::model::{
    Area, InvalidObservation, Observation, ProviderId, RunResult, Taxon, VerbatimRecord,
    VocabularyDefinition,
};
use crate::resolve::MultiPolygon;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// Errors worth retrying: a busy/locked database or an unreachable store
    pub fn is_transient(&self) -> bool {
        match self {
            StorageError::Database(err) => matches!(
                err.sqlite_error_code(),
                Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked)
            ),
            StorageError::Unavailable(_) => true,
            _ => false,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// The two access-scoped views of the observation index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    Public,
    Protected,
}

impl Partition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Public => "public",
            Partition::Protected => "protected",
        }
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Forward-only, paged read over one provider's verbatim records
pub trait VerbatimCursor: Send {
    /// Next page of at most `limit` records; empty once exhausted
    fn next_page(&mut self, limit: usize) -> StorageResult<Vec<VerbatimRecord>>;
}

/// Staging store populated by harvesters. The pipeline never writes to it.
pub trait VerbatimStore: Send + Sync {
    fn open_cursor(&self, provider: ProviderId) -> StorageResult<Box<dyn VerbatimCursor + '_>>;

    fn count_verbatim(&self, provider: ProviderId) -> StorageResult<u64>;
}

pub trait TaxonRepository: Send + Sync {
    fn load_taxa(&self) -> StorageResult<Vec<Taxon>>;
}

pub trait VocabularyRepository: Send + Sync {
    fn load_vocabularies(&self) -> StorageResult<Vec<VocabularyDefinition>>;
}

pub trait AreaRepository: Send + Sync {
    fn load_areas(&self) -> StorageResult<Vec<(Area, MultiPolygon)>>;
}

/// One batch worth of index changes for a single provider.
///
/// Withdrawals remove documents a record may have left behind in an
/// earlier run: the public copy of a record that is now protected only,
/// the protected copy of a record that is no longer sensitive, and both
/// copies of a record that is now invalid.
#[derive(Debug, Clone, Default)]
pub struct IndexBatch {
    pub public: Vec<Observation>,
    pub protected: Vec<Observation>,
    /// Occurrence ids to remove from the public partition
    pub withdraw_public: Vec<String>,
    /// Occurrence ids to remove from the protected partition
    pub withdraw_protected: Vec<String>,
}

impl IndexBatch {
    pub fn is_empty(&self) -> bool {
        self.public.is_empty()
            && self.protected.is_empty()
            && self.withdraw_public.is_empty()
            && self.withdraw_protected.is_empty()
    }
}

/// The dual-partition observation index.
///
/// Documents are keyed by `(partition, provider, occurrence id)`: two
/// providers publishing the same occurrence id keep separate documents.
pub trait ObservationIndex: Send + Sync {
    /// Apply one batch to both partitions as a single unit: either both
    /// partitions receive their part of the batch or neither does.
    fn commit_batch(&self, provider: ProviderId, batch: &IndexBatch) -> StorageResult<()>;

    /// Remove every observation of the provider from both partitions
    fn delete_provider_data(&self, provider: ProviderId) -> StorageResult<u64>;

    fn count(&self, partition: Partition, provider: ProviderId) -> StorageResult<u64>;

    fn get(
        &self,
        partition: Partition,
        provider: ProviderId,
        occurrence_id: &str,
    ) -> StorageResult<Option<Observation>>;

    /// Stored documents as `(occurrence id, serialized observation)`,
    /// ordered by occurrence id
    fn documents(&self, partition: Partition, provider: ProviderId) -> StorageResult<Vec<(String, String)>>;
}

pub trait InvalidObservationStore: Send + Sync {
    fn add_invalid(&self, invalid: &[InvalidObservation]) -> StorageResult<()>;

    fn delete_invalid(&self, provider: ProviderId) -> StorageResult<u64>;

    fn list_invalid(&self, provider: ProviderId) -> StorageResult<Vec<InvalidObservation>>;
}

/// Run results keyed by provider, for operational dashboards
pub trait HarvestInfoStore: Send + Sync {
    fn upsert_run(&self, run: &RunResult) -> StorageResult<()>;

    fn get_run(&self, provider: ProviderId) -> StorageResult<Option<RunResult>>;

    fn list_runs(&self) -> StorageResult<Vec<RunResult>>;
}
