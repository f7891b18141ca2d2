//! Observation processing
//!
//! [`ObservationProcessor`] drives one provider's run from verbatim
//! records to the dual-partition index. [`ProcessingCoordinator`] runs
//! many providers at once against the same reference snapshots.

mod cancel;
mod coordinator;
mod export;
mod pipeline;
mod registry;


pub use cancel::CancellationToken;
pub use coordinator::ProcessingCoordinator;
pub use export::{ExportError, ExportSink, JsonLinesExporter};
pub use pipeline::{ObservationProcessor, ProcessError, ProcessorSettings};
pub use registry::RunRegistry;
