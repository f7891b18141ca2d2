//! ClamPortal: freshwater pearl mussel and other large-mussel surveys

use super::common::{
    attach_taxon, catalog_number, decode_payload, finish, resolve_occurrence_labels, set_coordinates,
    set_event_dates, set_uncertainty, text, ProviderConstants,
};
use super::traits::{FactoryContext, FactoryError, ObservationFactory};
use crate::model::{DataProvider, FallbackPolicy, Observation, TaxonId, VerbatimRecord, VocabularyId};
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClamObservation {
    occurrence_id: String,
    dyntaxa_taxon_id: Option<TaxonId>,
    observation_date: Option<String>,
    decimal_latitude: Option<f64>,
    decimal_longitude: Option<f64>,
    coordinate_uncertainty_in_meters: Option<i64>,
    locality: Option<String>,
    water_body: Option<String>,
    occurrence_status: Option<String>,
    life_stage: Option<String>,
    individual_count: Option<i64>,
    recorded_by: Option<String>,
    reported_by: Option<String>,
    identification_verification_status: Option<String>,
    occurrence_remarks: Option<String>,
    modified: Option<DateTime<Utc>>,
}

pub struct ClamPortalObservationFactory {
    provider: DataProvider,
    context: FactoryContext,
    constants: ProviderConstants,
}

impl ClamPortalObservationFactory {
    pub fn new(provider: DataProvider, context: FactoryContext) -> Self {
        let constants = ProviderConstants::new(&provider, &context, "ClamPortal", "HumanObservation");
        Self {
            provider,
            context,
            constants,
        }
    }
}

impl ObservationFactory for ClamPortalObservationFactory {
    fn provider(&self) -> &DataProvider {
        &self.provider
    }

    fn context(&self) -> &FactoryContext {
        &self.context
    }

    fn create_observation(&self, verbatim: &VerbatimRecord) -> Result<Observation, FactoryError> {
        let clam: ClamObservation = decode_payload(&self.provider, verbatim)?;
        let vocabularies = &self.context.vocabularies;
        let mut obs = self.constants.observation(&self.provider);

        obs.occurrence.occurrence_id = clam.occurrence_id.trim().to_string();
        obs.occurrence.catalog_number = Some(catalog_number(&obs.occurrence.occurrence_id).to_string());
        obs.modified = clam.modified;

        set_event_dates(&mut obs, clam.observation_date.as_deref(), None);
        set_coordinates(&mut obs, clam.decimal_latitude, clam.decimal_longitude);
        set_uncertainty(&mut obs, clam.coordinate_uncertainty_in_meters);
        // locality falls back to the water body name
        obs.location.locality = text(clam.locality.as_deref()).or_else(|| text(clam.water_body.as_deref()));

        obs.identification.verified = clam
            .identification_verification_status
            .as_deref()
            .is_some_and(|s| s.trim().eq_ignore_ascii_case("verified"));
        obs.identification.validation_status = vocabularies
            .resolve(
                VocabularyId::ValidationStatus,
                clam.identification_verification_status.as_deref(),
                FallbackPolicy::UseSourceValue,
            )
            .ok()
            .flatten();

        resolve_occurrence_labels(
            &mut obs,
            vocabularies,
            &[
                (VocabularyId::OccurrenceStatus, clam.occurrence_status.as_deref()),
                (VocabularyId::LifeStage, clam.life_stage.as_deref()),
            ],
            FallbackPolicy::UseSourceValue,
        );

        let absent = clam
            .occurrence_status
            .as_deref()
            .is_some_and(|s| s.trim().eq_ignore_ascii_case("absent"));
        let occurrence = &mut obs.occurrence;
        occurrence.is_positive_observation = !absent && clam.individual_count != Some(0);
        occurrence.individual_count = clam.individual_count.map(|c| c.to_string());
        occurrence.recorded_by = text(clam.recorded_by.as_deref());
        occurrence.reported_by = text(clam.reported_by.as_deref());
        occurrence.remarks = text(clam.occurrence_remarks.as_deref());

        attach_taxon(&mut obs, &self.context, clam.dyntaxa_taxon_id);
        finish(&mut obs, &self.context);
        Ok(obs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::test_support::{context, provider};
    use crate::model::{ProviderId, ProviderKind};
    use serde_json::json;

    fn create(payload: serde_json::Value) -> Result<Observation, FactoryError> {
        ClamPortalObservationFactory::new(provider(2, ProviderKind::ClamPortal), context())
            .create_observation(&VerbatimRecord::new(ProviderId(2), "k", payload))
    }

    #[test]
    fn maps_a_mussel_survey() {
        let obs = create(json!({
            "occurrenceId": "urn:lsid:clamportal:Occurrence:4411",
            "dyntaxaTaxonId": 200,
            "observationDate": "2019-08-12",
            "decimalLatitude": 59.6,
            "decimalLongitude": 17.2,
            "waterBody": "Fyrisån",
            "occurrenceStatus": "present",
            "individualCount": 14
        }))
        .unwrap();

        assert_eq!(obs.occurrence.catalog_number.as_deref(), Some("4411"));
        assert_eq!(obs.location.locality.as_deref(), Some("Fyrisån"));
        assert_eq!(obs.occurrence.individual_count.as_deref(), Some("14"));
        assert!(obs.occurrence.is_positive_observation);
        assert_eq!(obs.dataset_name.as_deref(), Some("ClamPortal"));
        assert!(obs.event.start_date.is_some());
    }

    #[test]
    fn absent_status_is_negative() {
        let obs = create(json!({
            "occurrenceId": "x:1",
            "dyntaxaTaxonId": 200,
            "occurrenceStatus": "Absent"
        }))
        .unwrap();
        assert!(!obs.occurrence.is_positive_observation);
        assert!(!obs.occurrence.is_never_found_observation);
    }
}
