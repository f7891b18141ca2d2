//! Data providers

use serde::{Deserialize, Serialize};

/// Numeric identifier of a data provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(pub u32);

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which factory transforms this provider's verbatim records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Artportalen,
    ClamPortal,
    Kul,
    Mvm,
    Nors,
    Sers,
    Shark,
    VirtualHerbarium,
    Dwca,
}

/// An upstream provider of observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataProvider {
    pub id: ProviderId,
    /// Short stable identifier, e.g. "artportalen"
    pub identifier: String,
    pub name: String,
    /// Organization that owns the data, used as the observations' owner
    #[serde(default)]
    pub organization: Option<String>,
    pub kind: ProviderKind,
    /// Whether sensitive observations from this provider may be published
    /// in diffused form
    #[serde(default = "default_true")]
    pub supports_diffusion: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl DataProvider {
    pub fn new(id: u32, identifier: impl Into<String>, kind: ProviderKind) -> Self {
        let identifier = identifier.into();
        Self {
            id: ProviderId(id),
            name: identifier.clone(),
            identifier,
            organization: None,
            kind,
            supports_diffusion: true,
            is_active: true,
        }
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    pub fn with_diffusion(mut self, supported: bool) -> Self {
        self.supports_diffusion = supported;
        self
    }
}

impl std::fmt::Display for DataProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.identifier, self.id)
    }
}
