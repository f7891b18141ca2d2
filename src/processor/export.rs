//! Interchange export of public observations
//!
//! Export is a side channel: the processor logs a failing sink and keeps
//! going, so a broken export never fails a run.

use crate::model::{DataProvider, Observation, ProcessMode};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Receives committed public observations, batch by batch.
#[async_trait]
pub trait ExportSink: Send + Sync {
    /// Called once before the first batch of a run
    async fn begin(&self, provider: &DataProvider, mode: ProcessMode) -> Result<(), ExportError>;

    async fn write_batch(&self, provider: &DataProvider, observations: &[Observation]) -> Result<(), ExportError>;
}

/// Writes one JSON document per line to `<dir>/<provider identifier>.jsonl`.
///
/// A full run starts the file over; an incremental run appends to it.
#[derive(Debug, Clone)]
pub struct JsonLinesExporter {
    dir: PathBuf,
}

impl JsonLinesExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, provider: &DataProvider) -> PathBuf {
        self.dir.join(format!("{}.jsonl", provider.identifier))
    }
}

#[async_trait]
impl ExportSink for JsonLinesExporter {
    async fn begin(&self, provider: &DataProvider, mode: ProcessMode) -> Result<(), ExportError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        if mode == ProcessMode::Full {
            tokio::fs::File::create(self.path_for(provider)).await?;
        }
        Ok(())
    }

    async fn write_batch(&self, provider: &DataProvider, observations: &[Observation]) -> Result<(), ExportError> {
        if observations.is_empty() {
            return Ok(());
        }
        let mut buf = Vec::new();
        for obs in observations {
            serde_json::to_writer(&mut buf, obs)?;
            buf.push(b'\n');
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(provider))
            .await?;
        file.write_all(&buf).await?;
        file.flush().await?;
        Ok(())
    }
}
