//! Pipeline configuration
//!
//! Every field has a default so an empty YAML document is a valid
//! configuration. `validate()` runs on load and rejects settings that
//! would break the diffusion radius ordering.

use crate::model::DataProvider;
use crate::resolve::BoundingBox;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// How a sensitive location is generalized
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffusionMode {
    /// Snap to the centre of a deterministic grid cell
    #[default]
    Grid,
    /// Move by a deterministic pseudo-random offset within the radius
    Displace,
}

/// Secret that keys displacement offsets. Never printed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplacementKey(String);

impl DisplacementKey {
    pub const MIN_LEN: usize = 16;

    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for DisplacementKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DisplacementKey(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffusionConfig {
    pub mode: DiffusionMode,
    /// Minimum generalization radius in metres per sensitivity category.
    /// Categories without an entry use the closest lower one.
    pub category_min_radius_m: BTreeMap<u8, u32>,
    /// Required by `displace` mode
    #[serde(skip_serializing)]
    pub displacement_key: Option<DisplacementKey>,
}

impl Default for DiffusionConfig {
    fn default() -> Self {
        Self {
            mode: DiffusionMode::Grid,
            category_min_radius_m: BTreeMap::from([(2, 1_000), (3, 5_000), (4, 25_000), (5, 50_000)]),
            displacement_key: None,
        }
    }
}

impl DiffusionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mode == DiffusionMode::Displace {
            match &self.displacement_key {
                None => {
                    return Err(ConfigError::Invalid(
                        "diffusion.displacement_key is required in displace mode".into(),
                    ))
                }
                Some(key) if key.expose().len() < DisplacementKey::MIN_LEN => {
                    return Err(ConfigError::Invalid(format!(
                        "diffusion.displacement_key must be at least {} characters",
                        DisplacementKey::MIN_LEN
                    )))
                }
                Some(_) => {}
            }
        }
        if self.category_min_radius_m.is_empty() {
            return Err(ConfigError::Invalid(
                "diffusion.category_min_radius_m needs at least one category".into(),
            ));
        }
        let mut previous = 0u32;
        for (&category, &radius) in &self.category_min_radius_m {
            if category <= 1 {
                return Err(ConfigError::Invalid(format!(
                    "category {} is not sensitive and cannot have a diffusion radius",
                    category
                )));
            }
            if radius == 0 {
                return Err(ConfigError::Invalid(format!(
                    "diffusion radius for category {} must be positive",
                    category
                )));
            }
            if radius < previous {
                return Err(ConfigError::Invalid(format!(
                    "diffusion radius for category {} ({} m) is smaller than for a lower category ({} m)",
                    category, radius, previous
                )));
            }
            previous = radius;
        }
        Ok(())
    }
}

/// Bounded exponential backoff for infrastructure calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 100,
            max_backoff_ms: 5_000,
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts; for tests
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Coordinates outside this box are rejected
    pub extent: Option<BoundingBox>,
    /// Reject observations whose taxon could not be resolved
    pub require_taxon: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub batch_size: usize,
    pub max_concurrent_providers: usize,
    /// Publish diffused copies of sensitive observations for providers
    /// that allow it
    pub diffuse_if_supported: bool,
    pub retry: RetryPolicy,
    pub diffusion: DiffusionConfig,
    pub validation: ValidationConfig,
    /// Directory for the JSON Lines export side-channel
    pub export_dir: Option<PathBuf>,
    pub providers: Vec<DataProvider>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 1_000,
            max_concurrent_providers: 4,
            diffuse_if_supported: true,
            retry: RetryPolicy::default(),
            diffusion: DiffusionConfig::default(),
            validation: ValidationConfig::default(),
            export_dir: None,
            providers: Vec::new(),
        }
    }
}

impl PipelineConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = if yaml.trim().is_empty() {
            PipelineConfig::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be at least 1".into()));
        }
        if self.max_concurrent_providers == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_providers must be at least 1".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be at least 1".into()));
        }
        self.diffusion.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProviderKind;

    #[test]
    fn empty_document_gives_defaults() {
        let config = PipelineConfig::from_yaml_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn parses_yaml_with_providers() {
        let yaml = r#"
batch_size: 250
diffusion:
  mode: displace
  displacement_key: 7c1e0b5a-county-board
  category_min_radius_m:
    2: 500
    3: 500
    5: 10000
validation:
  extent: { min_lon: 10.0, min_lat: 55.0, max_lon: 25.0, max_lat: 69.5 }
providers:
  - id: 1
    identifier: artportalen
    name: Artportalen
    kind: artportalen
  - id: 9
    identifier: shark
    name: SHARK
    kind: shark
    supports_diffusion: false
"#;
        let config = PipelineConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.batch_size, 250);
        assert_eq!(config.diffusion.mode, DiffusionMode::Displace);
        assert_eq!(
            config.diffusion.displacement_key.as_ref().map(|k| k.expose()),
            Some("7c1e0b5a-county-board")
        );
        assert_eq!(config.diffusion.category_min_radius_m[&5], 10_000);
        assert_eq!(config.providers.len(), 2);
        assert_eq!(config.providers[1].kind, ProviderKind::Shark);
        assert!(!config.providers[1].supports_diffusion);
        assert!(config.providers[0].is_active);
        assert!(config.validation.extent.is_some());
    }

    #[test]
    fn decreasing_radii_are_rejected() {
        let yaml = "diffusion:\n  category_min_radius_m:\n    2: 5000\n    3: 1000\n";
        let err = PipelineConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn radius_for_category_one_is_rejected() {
        let mut config = PipelineConfig::default();
        config.diffusion.category_min_radius_m.insert(1, 10);
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_radius_table_is_rejected() {
        let mut config = PipelineConfig::default();
        config.diffusion.category_min_radius_m.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn displace_mode_requires_a_key() {
        let err = PipelineConfig::from_yaml_str("diffusion:\n  mode: displace\n").unwrap_err();
        assert!(err.to_string().contains("displacement_key"));

        let short = "diffusion:\n  mode: displace\n  displacement_key: abc\n";
        assert!(PipelineConfig::from_yaml_str(short).is_err());
    }

    #[test]
    fn displacement_key_is_not_printed_or_serialized() {
        let mut config = PipelineConfig::default();
        config.diffusion.displacement_key = Some(DisplacementKey::new("do-not-leak-this-key"));
        assert!(!format!("{:?}", config).contains("do-not-leak"));
        assert!(!serde_yaml::to_string(&config).unwrap().contains("do-not-leak"));
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        assert!(PipelineConfig::from_yaml_str("batch_size: 0").is_err());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.yaml");
        std::fs::write(&path, "max_concurrent_providers: 2\n").unwrap();
        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.max_concurrent_providers, 2);
    }
}
