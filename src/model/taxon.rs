//! Taxon attributes relevant to processing

use serde::{Deserialize, Serialize};

pub type TaxonId = i32;

/// A taxon as supplied by the taxon repository. Immutable for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Taxon {
    pub id: TaxonId,
    pub scientific_name: String,
    #[serde(default)]
    pub vernacular_name: Option<String>,
    /// Ordinal: 1 = not sensitive, higher = more restricted disclosure
    pub sensitivity_category: u8,
    /// Disturbance radius in metres, when the taxon has one
    #[serde(default)]
    pub disturbance_radius_m: Option<u32>,
    #[serde(default)]
    pub protection_level: u8,
    #[serde(default)]
    pub organism_group: Option<String>,
    #[serde(default)]
    pub is_bird: bool,
    #[serde(default)]
    pub parent_id: Option<TaxonId>,
    #[serde(default)]
    pub secondary_parent_ids: Vec<TaxonId>,
}

impl Taxon {
    pub fn new(id: TaxonId, scientific_name: impl Into<String>) -> Self {
        Self {
            id,
            scientific_name: scientific_name.into(),
            vernacular_name: None,
            sensitivity_category: 1,
            disturbance_radius_m: None,
            protection_level: 1,
            organism_group: None,
            is_bird: false,
            parent_id: None,
            secondary_parent_ids: Vec::new(),
        }
    }

    pub fn with_sensitivity(mut self, category: u8, disturbance_radius_m: Option<u32>) -> Self {
        self.sensitivity_category = category.max(1);
        self.protection_level = self.sensitivity_category;
        self.disturbance_radius_m = disturbance_radius_m;
        self
    }

    pub fn with_parent(mut self, parent_id: TaxonId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn bird(mut self) -> Self {
        self.is_bird = true;
        self.organism_group = Some("Fåglar".to_string());
        self
    }

    pub fn is_sensitive(&self) -> bool {
        self.sensitivity_category > 1
    }

    /// Primary and secondary parents, in that order
    pub fn parents(&self) -> impl Iterator<Item = TaxonId> + '_ {
        self.parent_id
            .into_iter()
            .chain(self.secondary_parent_ids.iter().copied())
    }
}
