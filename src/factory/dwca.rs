//! Darwin Core Archive occurrences from any DwC-A publishing provider
//!
//! Terms arrive as text keyed by their Darwin Core names.

use super::common::{
    attach_taxon, catalog_number, decode_payload, finish, parse_taxon_id, resolve_label,
    resolve_occurrence_labels, set_coordinates_from_text, set_event_dates, set_uncertainty_from_text,
    text, ProviderConstants,
};
use super::traits::{FactoryContext, FactoryError, ObservationFactory};
use crate::model::{DataProvider, FallbackPolicy, Observation, VerbatimRecord, VocabularyId};
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DwcOccurrence {
    #[serde(rename = "occurrenceID")]
    occurrence_id: Option<String>,
    catalog_number: Option<String>,
    #[serde(rename = "taxonID")]
    taxon_id: Option<String>,
    event_date: Option<String>,
    decimal_latitude: Option<String>,
    decimal_longitude: Option<String>,
    coordinate_uncertainty_in_meters: Option<String>,
    basis_of_record: Option<String>,
    occurrence_status: Option<String>,
    individual_count: Option<String>,
    organism_quantity: Option<String>,
    organism_quantity_type: Option<String>,
    sex: Option<String>,
    life_stage: Option<String>,
    recorded_by: Option<String>,
    identified_by: Option<String>,
    identification_verification_status: Option<String>,
    #[serde(rename = "datasetID")]
    dataset_id: Option<String>,
    dataset_name: Option<String>,
    institution_code: Option<String>,
    locality: Option<String>,
    habitat: Option<String>,
    sampling_protocol: Option<String>,
    occurrence_remarks: Option<String>,
    modified: Option<String>,
}

pub struct DwcaObservationFactory {
    provider: DataProvider,
    context: FactoryContext,
    constants: ProviderConstants,
}

impl DwcaObservationFactory {
    pub fn new(provider: DataProvider, context: FactoryContext) -> Self {
        let constants = ProviderConstants::new(&provider, &context, &provider.name, "HumanObservation");
        Self {
            provider,
            context,
            constants,
        }
    }
}

impl ObservationFactory for DwcaObservationFactory {
    fn provider(&self) -> &DataProvider {
        &self.provider
    }

    fn context(&self) -> &FactoryContext {
        &self.context
    }

    fn create_observation(&self, verbatim: &VerbatimRecord) -> Result<Observation, FactoryError> {
        let dwc: DwcOccurrence = decode_payload(&self.provider, verbatim)?;
        let vocabularies = &self.context.vocabularies;
        let mut obs = self.constants.observation(&self.provider);

        // A missing occurrenceID stays empty and fails validation
        obs.occurrence.occurrence_id = text(dwc.occurrence_id.as_deref()).unwrap_or_default();
        obs.occurrence.catalog_number = text(dwc.catalog_number.as_deref())
            .or_else(|| {
                let id = &obs.occurrence.occurrence_id;
                (!id.is_empty()).then(|| catalog_number(id).to_string())
            });
        if let Some(id) = text(dwc.dataset_id.as_deref()) {
            obs.dataset_id = Some(id);
        }
        if let Some(name) = text(dwc.dataset_name.as_deref()) {
            obs.dataset_name = Some(name);
        }
        if let Some(code) = text(dwc.institution_code.as_deref()) {
            obs.institution = vocabularies
                .resolve(VocabularyId::Institution, Some(&code), FallbackPolicy::UseSourceValue)
                .ok()
                .flatten();
            obs.owner_institution_code = Some(code);
        }
        if dwc.basis_of_record.is_some() {
            obs.basis_of_record = resolve_label(
                &mut obs,
                vocabularies,
                VocabularyId::BasisOfRecord,
                "basisOfRecord",
                dwc.basis_of_record.as_deref(),
                FallbackPolicy::Fail,
            );
        }
        obs.modified = dwc
            .modified
            .as_deref()
            .and_then(|m| DateTime::parse_from_rfc3339(m.trim()).ok())
            .map(|m| m.with_timezone(&Utc));

        set_event_dates(&mut obs, dwc.event_date.as_deref(), None);
        obs.event.habitat = text(dwc.habitat.as_deref());
        obs.event.sampling_protocol = text(dwc.sampling_protocol.as_deref());

        set_coordinates_from_text(&mut obs, dwc.decimal_latitude.as_deref(), dwc.decimal_longitude.as_deref());
        set_uncertainty_from_text(&mut obs, dwc.coordinate_uncertainty_in_meters.as_deref());
        obs.location.locality = text(dwc.locality.as_deref());

        obs.identification.identified_by = text(dwc.identified_by.as_deref());
        obs.identification.validation_status = vocabularies
            .resolve(
                VocabularyId::ValidationStatus,
                dwc.identification_verification_status.as_deref(),
                FallbackPolicy::UseSourceValue,
            )
            .ok()
            .flatten();
        obs.identification.verified = obs
            .identification
            .validation_status
            .as_ref()
            .is_some_and(|status| !status.is_unmapped());

        resolve_occurrence_labels(
            &mut obs,
            vocabularies,
            &[
                (VocabularyId::OccurrenceStatus, dwc.occurrence_status.as_deref()),
                (VocabularyId::Sex, dwc.sex.as_deref()),
                (VocabularyId::LifeStage, dwc.life_stage.as_deref()),
                (VocabularyId::Unit, dwc.organism_quantity_type.as_deref()),
            ],
            FallbackPolicy::UseSourceValue,
        );

        let absent = dwc
            .occurrence_status
            .as_deref()
            .is_some_and(|s| s.trim().eq_ignore_ascii_case("absent"));
        let occurrence = &mut obs.occurrence;
        occurrence.is_positive_observation = !absent && text(dwc.individual_count.as_deref()).as_deref() != Some("0");
        occurrence.individual_count = text(dwc.individual_count.as_deref());
        occurrence.organism_quantity = text(dwc.organism_quantity.as_deref());
        occurrence.recorded_by = text(dwc.recorded_by.as_deref());
        occurrence.remarks = text(dwc.occurrence_remarks.as_deref());

        attach_taxon(&mut obs, &self.context, dwc.taxon_id.as_deref().and_then(parse_taxon_id));
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

    fn create(payload: serde_json::Value) -> Observation {
        DwcaObservationFactory::new(provider(9, ProviderKind::Dwca), context())
            .create_observation(&VerbatimRecord::new(ProviderId(9), "k", payload))
            .unwrap()
    }

    #[test]
    fn darwin_core_terms_map() {
        let obs = create(json!({
            "occurrenceID": "urn:uuid:6b1f:occ:551",
            "taxonID": "urn:lsid:dyntaxa.se:Taxon:200",
            "eventDate": "2022-04-01/2022-04-03",
            "decimalLatitude": "59.85",
            "decimalLongitude": "17.63",
            "coordinateUncertaintyInMeters": "100",
            "basisOfRecord": "HumanObservation",
            "occurrenceStatus": "present",
            "sex": "male",
            "datasetName": "Bird atlas"
        }));

        assert_eq!(obs.occurrence.catalog_number.as_deref(), Some("551"));
        assert_eq!(obs.taxon.as_ref().unwrap().id, 200);
        assert_eq!(obs.location.coordinate_uncertainty_in_meters, Some(100));
        assert_eq!(obs.basis_of_record.as_ref().unwrap().id, 0);
        assert_eq!(obs.occurrence.sex.as_ref().unwrap().id, 1);
        assert_eq!(obs.dataset_name.as_deref(), Some("Bird atlas"));
        assert!(obs.event.start_date < obs.event.end_date);
        assert!(!obs.has_defects());
    }

    #[test]
    fn missing_occurrence_id_stays_empty() {
        let obs = create(json!({ "taxonID": "200", "eventDate": "2022-04-01" }));
        assert_eq!(obs.occurrence_id(), "");
        assert!(obs.occurrence.catalog_number.is_none());
    }

    #[test]
    fn unknown_basis_of_record_is_a_defect() {
        let obs = create(json!({ "occurrenceID": "a", "basisOfRecord": "Rumour" }));
        assert!(obs.defects.unwrap().contains_key("basisOfRecord"));
    }

    #[test]
    fn unresolved_taxon_is_never_found() {
        let obs = create(json!({ "occurrenceID": "b", "taxonID": "urn:lsid:dyntaxa.se:Taxon:999999" }));
        assert!(obs.taxon.is_none());
        assert!(obs.occurrence.is_never_found_observation);
        assert!(!obs.occurrence.is_positive_observation);
        assert_eq!(obs.sensitivity_category(), 1);
    }
}
