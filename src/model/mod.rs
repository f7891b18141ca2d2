//! Canonical data model
//!
//! Verbatim records and taxa come from outside and are read-only here.
//! Observations are built by factories, generalized by the diffusion
//! manager and frozen once committed to the index.

mod area;
mod observation;
mod provider;
mod run;
mod taxon;
mod verbatim;
mod vocabulary;

pub use area::{Area, AreaType};
pub use observation::{
    AccessRights, DiffusionStatus, Event, Identification, InvalidObservation, Location,
    Observation, ObservationDefect, ObservationTaxon, Occurrence, NOT_SENSITIVE,
};
pub use provider::{DataProvider, ProviderId, ProviderKind};
pub use run::{ProcessMode, RunResult, RunStatus};
pub use taxon::{Taxon, TaxonId};
pub use verbatim::VerbatimRecord;
pub use vocabulary::{
    FallbackPolicy, VocabularyDefinition, VocabularyEntry, VocabularyId, VocabularyTranslation,
    VocabularyValue, VOCABULARY_UNMAPPED_ID,
};
