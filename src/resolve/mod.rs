//! Run-scoped reference snapshots
//!
//! Taxa, vocabularies and administrative areas are loaded once before any
//! worker starts, wrapped in `Arc` and never mutated afterwards. Lookups
//! take `&self` and need no locking.

mod area;
pub mod geometry;
mod taxon;
mod vocabulary;

pub use area::AreaEnricher;
pub use geometry::{BoundingBox, MultiPolygon, Point, Polygon};
pub use taxon::TaxonContext;
pub use vocabulary::{ResolveError, VocabularyResolver};
