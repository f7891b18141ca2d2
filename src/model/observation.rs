//! The canonical observation and its invalid counterpart

use super::area::{Area, AreaType};
use super::provider::ProviderId;
use super::taxon::{Taxon, TaxonId};
use super::vocabulary::{VocabularyId, VocabularyValue};
use crate::resolve::Point;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sensitivity category of observations that need no protection
pub const NOT_SENSITIVE: u8 = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffusionStatus {
    #[default]
    NotDiffused,
    Diffused,
}

/// Access scope of a committed observation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessRights {
    #[default]
    FreeUsage,
    NotForPublicUsage,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbatim_event_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub habitat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling_protocol: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identification {
    pub verified: bool,
    pub uncertain_identification: bool,
    pub validation_status: Option<VocabularyValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identified_by: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub decimal_latitude: Option<f64>,
    pub decimal_longitude: Option<f64>,
    pub coordinate_uncertainty_in_meters: Option<u32>,
    /// Radius applied when the location was generalized
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generalization_radius_in_meters: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
    pub county: Option<Area>,
    pub municipality: Option<Area>,
    pub province: Option<Area>,
    pub parish: Option<Area>,
    pub country_region: Option<Area>,
}

impl Location {
    pub fn with_coordinates(lat: f64, lon: f64) -> Self {
        Self {
            decimal_latitude: Some(lat),
            decimal_longitude: Some(lon),
            ..Default::default()
        }
    }

    pub fn point(&self) -> Option<Point> {
        match (self.decimal_longitude, self.decimal_latitude) {
            (Some(lon), Some(lat)) => Some(Point::new(lon, lat)),
            _ => None,
        }
    }

    pub fn area(&self, area_type: AreaType) -> Option<&Area> {
        match area_type {
            AreaType::County => self.county.as_ref(),
            AreaType::Municipality => self.municipality.as_ref(),
            AreaType::Province => self.province.as_ref(),
            AreaType::Parish => self.parish.as_ref(),
            AreaType::CountryRegion => self.country_region.as_ref(),
        }
    }

    pub fn set_area(&mut self, area: Area) {
        let slot = match area.area_type {
            AreaType::County => &mut self.county,
            AreaType::Municipality => &mut self.municipality,
            AreaType::Province => &mut self.province,
            AreaType::Parish => &mut self.parish,
            AreaType::CountryRegion => &mut self.country_region,
        };
        *slot = Some(area);
    }

    pub fn clear_areas(&mut self) {
        self.county = None;
        self.municipality = None;
        self.province = None;
        self.parish = None;
        self.country_region = None;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    pub occurrence_id: String,
    pub catalog_number: Option<String>,
    pub sensitivity_category: u8,
    pub is_positive_observation: bool,
    pub is_never_found_observation: bool,
    pub is_not_rediscovered_observation: bool,
    pub occurrence_status: Option<VocabularyValue>,
    pub recorded_by: Option<String>,
    pub reported_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub individual_count: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organism_quantity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organism_quantity_unit: Option<VocabularyValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<VocabularyValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub life_stage: Option<VocabularyValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<VocabularyValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substrate: Option<VocabularyValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biotope: Option<VocabularyValue>,
    /// Activity id when the activity indicates breeding near a nest, else 0
    pub bird_nest_activity_id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

impl Default for Occurrence {
    fn default() -> Self {
        Self {
            occurrence_id: String::new(),
            catalog_number: None,
            sensitivity_category: NOT_SENSITIVE,
            is_positive_observation: true,
            is_never_found_observation: false,
            is_not_rediscovered_observation: false,
            occurrence_status: None,
            recorded_by: None,
            reported_by: None,
            individual_count: None,
            organism_quantity: None,
            organism_quantity_unit: None,
            activity: None,
            life_stage: None,
            sex: None,
            substrate: None,
            biotope: None,
            bird_nest_activity_id: 0,
            remarks: None,
        }
    }
}

impl Occurrence {
    /// The occurrence field holding values of `vocabulary`, if any
    pub fn vocabulary_field_mut(&mut self, vocabulary: VocabularyId) -> Option<&mut Option<VocabularyValue>> {
        match vocabulary {
            VocabularyId::Activity => Some(&mut self.activity),
            VocabularyId::LifeStage => Some(&mut self.life_stage),
            VocabularyId::Sex => Some(&mut self.sex),
            VocabularyId::Substrate => Some(&mut self.substrate),
            VocabularyId::Biotope => Some(&mut self.biotope),
            VocabularyId::OccurrenceStatus => Some(&mut self.occurrence_status),
            VocabularyId::Unit => Some(&mut self.organism_quantity_unit),
            VocabularyId::ValidationStatus | VocabularyId::Institution | VocabularyId::BasisOfRecord => None,
        }
    }
}

/// Denormalized taxon attributes carried on an observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationTaxon {
    pub id: TaxonId,
    pub scientific_name: String,
    pub vernacular_name: Option<String>,
    pub sensitivity_category: u8,
    pub disturbance_radius_m: Option<u32>,
    pub protection_level: u8,
    pub organism_group: Option<String>,
    pub is_bird: bool,
}

impl From<&Taxon> for ObservationTaxon {
    fn from(taxon: &Taxon) -> Self {
        Self {
            id: taxon.id,
            scientific_name: taxon.scientific_name.clone(),
            vernacular_name: taxon.vernacular_name.clone(),
            sensitivity_category: taxon.sensitivity_category,
            disturbance_radius_m: taxon.disturbance_radius_m,
            protection_level: taxon.protection_level,
            organism_group: taxon.organism_group.clone(),
            is_bird: taxon.is_bird,
        }
    }
}

/// The pipeline's provider-independent output record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub data_provider_id: ProviderId,
    pub dataset_id: Option<String>,
    pub dataset_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_institution_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution: Option<VocabularyValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basis_of_record: Option<VocabularyValue>,
    pub event: Event,
    pub identification: Identification,
    pub location: Location,
    pub occurrence: Occurrence,
    pub taxon: Option<ObservationTaxon>,
    pub diffusion_status: DiffusionStatus,
    pub access_rights: AccessRights,
    /// True for the exact copy stored in the protected partition
    pub protected: bool,
    /// Last modification reported by the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defects: Option<BTreeMap<String, String>>,
}

impl Observation {
    pub fn new(data_provider_id: ProviderId) -> Self {
        Self {
            data_provider_id,
            dataset_id: None,
            dataset_name: None,
            owner_institution_code: None,
            institution: None,
            basis_of_record: None,
            event: Event::default(),
            identification: Identification::default(),
            location: Location::default(),
            occurrence: Occurrence::default(),
            taxon: None,
            diffusion_status: DiffusionStatus::NotDiffused,
            access_rights: AccessRights::FreeUsage,
            protected: false,
            modified: None,
            defects: None,
        }
    }

    pub fn occurrence_id(&self) -> &str {
        &self.occurrence.occurrence_id
    }

    pub fn sensitivity_category(&self) -> u8 {
        self.occurrence.sensitivity_category
    }

    pub fn is_sensitive(&self) -> bool {
        self.occurrence.sensitivity_category > NOT_SENSITIVE
    }

    /// Record a field-level defect. A later defect on the same field wins.
    pub fn add_defect(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.defects
            .get_or_insert_with(BTreeMap::new)
            .insert(field.into(), reason.into());
    }

    pub fn has_defects(&self) -> bool {
        self.defects.as_ref().is_some_and(|d| !d.is_empty())
    }
}

/// A single violated rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationDefect {
    pub field: String,
    pub reason: String,
}

impl ObservationDefect {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for ObservationDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// An observation that failed validation, kept for operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidObservation {
    pub data_provider_id: ProviderId,
    /// Occurrence id, or the verbatim key when the id is missing
    pub occurrence_id: String,
    pub dataset_name: Option<String>,
    pub defects: Vec<ObservationDefect>,
    pub modified_date: DateTime<Utc>,
}
