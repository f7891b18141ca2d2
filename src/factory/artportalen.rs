//! Artportalen: the national citizen-science reporting portal

use super::common::{
    attach_taxon, decode_payload, finish, resolve_code, resolve_occurrence_codes, set_coordinates,
    set_event_dates, set_uncertainty, text, ProviderConstants,
};
use super::traits::{FactoryContext, FactoryError, ObservationFactory};
use crate::model::{
    DataProvider, FallbackPolicy, Observation, TaxonId, VerbatimRecord, VocabularyId,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::ops::RangeInclusive;

/// Activity codes that describe breeding at or near a nest
const BIRD_NEST_ACTIVITY_IDS: RangeInclusive<i32> = 1..=19;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArtportalenSighting {
    sighting_id: i64,
    taxon_id: Option<TaxonId>,
    start_date: Option<String>,
    end_date: Option<String>,
    site: Option<Site>,
    activity_id: Option<i32>,
    stage_id: Option<i32>,
    gender_id: Option<i32>,
    substrate_id: Option<i32>,
    validation_status_id: Option<i32>,
    unit_id: Option<i32>,
    quantity: Option<i64>,
    #[serde(default)]
    unsure_determination: bool,
    #[serde(default)]
    not_present: bool,
    #[serde(default)]
    not_recovered: bool,
    #[serde(default)]
    verified: bool,
    observers: Option<String>,
    reported_by: Option<String>,
    verified_by: Option<String>,
    comment: Option<String>,
    edit_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Site {
    latitude: Option<f64>,
    longitude: Option<f64>,
    accuracy: Option<i64>,
    name: Option<String>,
}

pub struct ArtportalenObservationFactory {
    provider: DataProvider,
    context: FactoryContext,
    constants: ProviderConstants,
}

impl ArtportalenObservationFactory {
    pub fn new(provider: DataProvider, context: FactoryContext) -> Self {
        let constants = ProviderConstants::new(&provider, &context, "Artportalen", "HumanObservation");
        Self {
            provider,
            context,
            constants,
        }
    }
}

impl ObservationFactory for ArtportalenObservationFactory {
    fn provider(&self) -> &DataProvider {
        &self.provider
    }

    fn context(&self) -> &FactoryContext {
        &self.context
    }

    fn create_observation(&self, verbatim: &VerbatimRecord) -> Result<Observation, FactoryError> {
        let sighting: ArtportalenSighting = decode_payload(&self.provider, verbatim)?;
        let vocabularies = &self.context.vocabularies;
        let mut obs = self.constants.observation(&self.provider);

        let occurrence_id = format!("urn:lsid:artportalen.se:Sighting:{}", sighting.sighting_id);
        obs.occurrence.catalog_number = Some(sighting.sighting_id.to_string());
        obs.occurrence.occurrence_id = occurrence_id;
        obs.modified = sighting.edit_date;

        set_event_dates(&mut obs, sighting.start_date.as_deref(), sighting.end_date.as_deref());

        if let Some(site) = &sighting.site {
            set_coordinates(&mut obs, site.latitude, site.longitude);
            set_uncertainty(&mut obs, site.accuracy);
            obs.location.locality = text(site.name.as_deref());
        }

        obs.identification.verified = sighting.verified;
        obs.identification.uncertain_identification = sighting.unsure_determination;
        obs.identification.identified_by = text(sighting.verified_by.as_deref());
        obs.identification.validation_status = resolve_code(
            &mut obs,
            vocabularies,
            VocabularyId::ValidationStatus,
            "identification.validationStatus",
            sighting.validation_status_id,
            FallbackPolicy::Fail,
        );

        let occurrence = &mut obs.occurrence;
        occurrence.is_never_found_observation = sighting.not_present;
        occurrence.is_not_rediscovered_observation = sighting.not_recovered;
        occurrence.is_positive_observation = !(sighting.not_present || sighting.not_recovered);
        occurrence.recorded_by = text(sighting.observers.as_deref());
        occurrence.reported_by = text(sighting.reported_by.as_deref());
        occurrence.organism_quantity = sighting.quantity.map(|q| q.to_string());
        occurrence.individual_count = occurrence.organism_quantity.clone();
        occurrence.remarks = text(sighting.comment.as_deref());

        resolve_occurrence_codes(
            &mut obs,
            vocabularies,
            &[
                (VocabularyId::Activity, sighting.activity_id),
                (VocabularyId::LifeStage, sighting.stage_id),
                (VocabularyId::Sex, sighting.gender_id),
                (VocabularyId::Substrate, sighting.substrate_id),
                (VocabularyId::Unit, sighting.unit_id),
            ],
            FallbackPolicy::UseSourceValue,
        );

        let taxon = attach_taxon(&mut obs, &self.context, sighting.taxon_id);
        obs.occurrence.bird_nest_activity_id = match (taxon, sighting.activity_id) {
            (Some(t), Some(activity)) if t.is_bird && BIRD_NEST_ACTIVITY_IDS.contains(&activity) => {
                activity
            }
            _ => 0,
        };

        finish(&mut obs, &self.context);
        Ok(obs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::test_support::{context, provider};
    use crate::model::{ProviderId, ProviderKind, VOCABULARY_UNMAPPED_ID};
    use serde_json::json;

    fn factory() -> ArtportalenObservationFactory {
        ArtportalenObservationFactory::new(provider(1, ProviderKind::Artportalen), context())
    }

    fn record(payload: serde_json::Value) -> VerbatimRecord {
        VerbatimRecord::new(ProviderId(1), "k", payload)
    }

    #[test]
    fn maps_a_complete_sighting() {
        let obs = factory()
            .create_observation(&record(json!({
                "sightingId": 98765,
                "taxonId": 100024,
                "startDate": "2023-05-14T06:30:00",
                "site": { "latitude": 59.33, "longitude": 18.07, "accuracy": 25, "name": "Tyresta" },
                "activityId": 3,
                "genderId": 1,
                "validationStatusId": 60,
                "quantity": 2,
                "observers": "A. Andersson",
                "unsureDetermination": true
            })))
            .unwrap();

        assert_eq!(obs.occurrence_id(), "urn:lsid:artportalen.se:Sighting:98765");
        assert_eq!(obs.occurrence.catalog_number.as_deref(), Some("98765"));
        assert_eq!(obs.taxon.as_ref().unwrap().id, 100024);
        assert_eq!(obs.sensitivity_category(), 3);
        assert!(obs.identification.uncertain_identification);
        assert_eq!(obs.identification.validation_status.as_ref().unwrap().id, 60);
        assert_eq!(obs.location.coordinate_uncertainty_in_meters, Some(25));
        assert_eq!(obs.location.county.as_ref().unwrap().name, "Stockholm");
        assert_eq!(obs.occurrence.bird_nest_activity_id, 3);
        assert!(obs.occurrence.is_positive_observation);
        assert!(!obs.has_defects());
    }

    #[test]
    fn nest_activity_only_for_birds() {
        let obs = factory()
            .create_observation(&record(json!({ "sightingId": 1, "taxonId": 200, "activityId": 3 })))
            .unwrap();
        assert_eq!(obs.occurrence.bird_nest_activity_id, 0);
    }

    #[test]
    fn not_present_is_never_found() {
        let obs = factory()
            .create_observation(&record(json!({ "sightingId": 2, "taxonId": 200, "notPresent": true })))
            .unwrap();
        assert!(obs.occurrence.is_never_found_observation);
        assert!(!obs.occurrence.is_positive_observation);
    }

    #[test]
    fn unknown_validation_status_is_a_defect() {
        let obs = factory()
            .create_observation(&record(json!({ "sightingId": 3, "taxonId": 200, "validationStatusId": 999 })))
            .unwrap();
        assert!(obs.defects.unwrap().contains_key("identification.validationStatus"));
    }

    #[test]
    fn unmapped_activity_keeps_source_code() {
        let obs = factory()
            .create_observation(&record(json!({ "sightingId": 4, "taxonId": 200, "activityId": 77 })))
            .unwrap();
        let activity = obs.occurrence.activity.unwrap();
        assert_eq!(activity.id, VOCABULARY_UNMAPPED_ID);
        assert_eq!(activity.value.as_deref(), Some("77"));
    }

    #[test]
    fn missing_sighting_id_is_invalid_payload() {
        let err = factory().create_observation(&record(json!({ "taxonId": 1 }))).unwrap_err();
        assert!(matches!(err, FactoryError::InvalidPayload { .. }));
    }

    #[test]
    fn foreign_record_is_rejected() {
        let err = factory()
            .create_observation(&VerbatimRecord::new(ProviderId(2), "k", json!({ "sightingId": 1 })))
            .unwrap_err();
        assert!(matches!(err, FactoryError::ProviderMismatch { .. }));
    }
}
