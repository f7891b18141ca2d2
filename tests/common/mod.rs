//! Shared fixtures for pipeline scenarios
//!
//! Reference data is written to the store and loaded back through the
//! repository traits, the same way the CLI builds its snapshots.

#![allow(dead_code)]

pub mod records;

pub use records::{artportalen, occurrence_id, sighting, undated, unknown_taxon, ARTPORTALEN};

use sightings::model::{Area, AreaType, Taxon, VocabularyDefinition, VocabularyEntry, VocabularyId};
use sightings::resolve::{MultiPolygon, Polygon};
use sightings::{
    CancellationToken, DiffusionManager, FactoryContext, ObservationProcessor, PipelineConfig,
    ProcessMode, RetryPolicy, RunResult, SqliteStore, Stores, VerbatimRecord,
};
use std::sync::Arc;

/// Peregrine falcon: category 3, 200 m disturbance radius
pub const FALCON: i32 = 100024;
/// Northern pike, not sensitive
pub const PIKE: i32 = 200;
/// Not present in the taxon snapshot
pub const MISSING_TAXON: i32 = 999_999;

pub fn taxa() -> Vec<Taxon> {
    vec![
        Taxon::new(FALCON, "Falco peregrinus").with_sensitivity(3, Some(200)).bird(),
        Taxon::new(PIKE, "Esox lucius"),
    ]
}

pub fn vocabularies() -> Vec<VocabularyDefinition> {
    vec![
        VocabularyDefinition::new(
            VocabularyId::Activity,
            vec![VocabularyEntry::new(3, "nest building").with_translation("sv-SE", "bobygge")],
        ),
        VocabularyDefinition::new(
            VocabularyId::Sex,
            vec![
                VocabularyEntry::new(1, "male").with_translation("sv-SE", "hane"),
                VocabularyEntry::new(2, "female").with_translation("sv-SE", "hona"),
            ],
        ),
    ]
}

/// An empty store with taxa, vocabularies and one county staged
pub fn reference_store() -> Arc<SqliteStore> {
    let store = SqliteStore::open_in_memory().unwrap();
    store.save_taxa(&taxa()).unwrap();
    for definition in vocabularies() {
        store.save_vocabulary(&definition).unwrap();
    }
    store
        .save_area(
            &Area::new(AreaType::County, "01", "Stockholm"),
            &MultiPolygon::single(Polygon::rectangle(17.0, 58.5, 19.5, 60.5)),
        )
        .unwrap();
    Arc::new(store)
}

pub fn seeded_store(records: &[VerbatimRecord]) -> Arc<SqliteStore> {
    let store = reference_store();
    store.insert_verbatim(records).unwrap();
    store
}

pub fn config(batch_size: usize) -> PipelineConfig {
    PipelineConfig {
        batch_size,
        retry: RetryPolicy::immediate(3),
        ..PipelineConfig::default()
    }
}

pub fn processor(store: &Arc<SqliteStore>, config: &PipelineConfig) -> ObservationProcessor {
    let context = FactoryContext::load(
        store.as_ref(),
        store.as_ref(),
        store.as_ref(),
        DiffusionManager::new(config.diffusion.clone()),
    )
    .unwrap();
    ObservationProcessor::new(Stores::sqlite(store.clone()), context, config)
}

/// One full run of the Artportalen provider
pub async fn run_full(store: &Arc<SqliteStore>, batch_size: usize) -> RunResult {
    processor(store, &config(batch_size))
        .process_observations(&artportalen(), ProcessMode::Full, &CancellationToken::new())
        .await
}
