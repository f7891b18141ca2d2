//! Sightings: species-observation processing pipeline
//!
//! Turns provider-shaped verbatim records into canonical observations and
//! commits them to a dual-partition index: a public partition anyone may
//! read and a protected partition holding exact locations of sensitive
//! species.
//!
//! # Core Concepts
//!
//! - **Factories**: one per provider kind, mapping verbatim payloads onto the
//!   canonical observation using run-scoped taxon, vocabulary and area snapshots
//! - **Diffusion**: deterministic generalization of sensitive locations before
//!   they are published
//! - **Validation**: a pure partition of each batch into valid and invalid
//!   observations; invalid ones never reach the index
//! - **Processor**: pages through a provider's records batch by batch, with
//!   bounded retries on the stores and cooperative cancellation
//!
//! # Example
//!
//! ```
//! use sightings::PipelineConfig;
//!
//! let config = PipelineConfig::from_yaml_str("batch_size: 500").unwrap();
//! assert_eq!(config.batch_size, 500);
//! ```

pub mod config;
pub mod diffusion;
pub mod factory;
pub mod model;
pub mod processor;
pub mod resolve;
pub mod storage;
pub mod validation;

pub use config::{
    ConfigError, DiffusionConfig, DiffusionMode, DisplacementKey, PipelineConfig, RetryPolicy,
    ValidationConfig,
};
pub use diffusion::DiffusionManager;
pub use factory::{create_factory, FactoryContext, FactoryError, ObservationFactory};
pub use model::{
    DataProvider, Observation, ProcessMode, ProviderId, ProviderKind, RunResult, RunStatus,
    VerbatimRecord,
};
pub use processor::{
    CancellationToken, ExportSink, JsonLinesExporter, ObservationProcessor, ProcessError,
    ProcessingCoordinator, RunRegistry,
};
pub use storage::{Partition, SqliteStore, StorageError, StorageResult, Stores};
pub use validation::ValidationManager;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
