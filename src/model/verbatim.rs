//! Verbatim (provider-shaped) input records

use super::provider::ProviderId;
use serde::{Deserialize, Serialize};

/// A provider's original record as staged by a harvester.
///
/// The payload is opaque to the pipeline; each factory deserializes it
/// into its own provider-specific shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerbatimRecord {
    pub provider_id: ProviderId,
    /// Provider-assigned natural key (e.g. occurrence id)
    pub key: String,
    pub payload: serde_json::Value,
}

impl VerbatimRecord {
    pub fn new(provider_id: ProviderId, key: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            provider_id,
            key: key.into(),
            payload,
        }
    }
}
