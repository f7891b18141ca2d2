//! Storage collaborators of the pipeline
//!
//! Every collaborator is a trait so runs can be driven against any backend.
//! `SqliteStore` implements all of them over one database file.

mod retry;
mod sqlite;
mod traits;

use std::sync::Arc;

pub use retry::{retry_with_backoff, RetryError};
pub use sqlite::SqliteStore;
pub use traits::{
    AreaRepository, HarvestInfoStore, IndexBatch, InvalidObservationStore, ObservationIndex,
    Partition, StorageError, StorageResult, TaxonRepository, VerbatimCursor, VerbatimStore,
    VocabularyRepository,
};

/// The stores a processing run reads from and writes to.
#[derive(Clone)]
pub struct Stores {
    pub verbatim: Arc<dyn VerbatimStore>,
    pub index: Arc<dyn ObservationIndex>,
    pub invalid: Arc<dyn InvalidObservationStore>,
    pub harvest_info: Arc<dyn HarvestInfoStore>,
}

impl Stores {
    /// Use one SQLite store for every collaborator
    pub fn sqlite(store: Arc<SqliteStore>) -> Self {
        Self {
            verbatim: store.clone(),
            index: store.clone(),
            invalid: store.clone(),
            harvest_info: store,
        }
    }
}
