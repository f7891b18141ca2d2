//! SHARK: marine environmental monitoring
//!
//! SHARK exports every column as text, including coordinates written
//! with a decimal comma.

use super::common::{
    attach_taxon, decode_payload, finish, parse_decimal, parse_taxon_id, resolve_occurrence_labels,
    set_coordinates_from_text, set_event_dates, text, ProviderConstants,
};
use super::traits::{FactoryContext, FactoryError, ObservationFactory};
use crate::model::{DataProvider, FallbackPolicy, Observation, VerbatimRecord, VocabularyId};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
struct SharkObservation {
    shark_sample_id_md5: String,
    dyntaxa_id: Option<String>,
    sample_date: Option<String>,
    sample_latitude_dd: Option<String>,
    sample_longitude_dd: Option<String>,
    station_name: Option<String>,
    dataset_name: Option<String>,
    delivery_datatype: Option<String>,
    parameter: Option<String>,
    value: Option<String>,
    unit: Option<String>,
    sampler: Option<String>,
    analysed_by: Option<String>,
    reporting_institute_name_en: Option<String>,
}

pub struct SharkObservationFactory {
    provider: DataProvider,
    context: FactoryContext,
    constants: ProviderConstants,
}

impl SharkObservationFactory {
    pub fn new(provider: DataProvider, context: FactoryContext) -> Self {
        let constants = ProviderConstants::new(&provider, &context, "SHARK", "HumanObservation");
        Self {
            provider,
            context,
            constants,
        }
    }
}

impl ObservationFactory for SharkObservationFactory {
    fn provider(&self) -> &DataProvider {
        &self.provider
    }

    fn context(&self) -> &FactoryContext {
        &self.context
    }

    fn create_observation(&self, verbatim: &VerbatimRecord) -> Result<Observation, FactoryError> {
        let sample: SharkObservation = decode_payload(&self.provider, verbatim)?;
        let mut obs = self.constants.observation(&self.provider);

        let sample_id = sample.shark_sample_id_md5.trim();
        let taxon_id = sample.dyntaxa_id.as_deref().and_then(parse_taxon_id);
        // One sample row per taxon and parameter
        obs.occurrence.occurrence_id = format!(
            "urn:lsid:shark:Sample:{}:{}:{}",
            sample_id,
            taxon_id.map(|id| id.to_string()).unwrap_or_default(),
            sample.parameter.as_deref().unwrap_or_default().trim()
        );
        obs.occurrence.catalog_number = Some(sample_id.to_string());
        if let Some(name) = text(sample.dataset_name.as_deref()) {
            obs.dataset_name = Some(name);
        }
        obs.event.sampling_protocol = text(sample.delivery_datatype.as_deref());

        set_event_dates(&mut obs, sample.sample_date.as_deref(), None);
        set_coordinates_from_text(
            &mut obs,
            sample.sample_latitude_dd.as_deref(),
            sample.sample_longitude_dd.as_deref(),
        );
        obs.location.locality = text(sample.station_name.as_deref());

        resolve_occurrence_labels(
            &mut obs,
            &self.context.vocabularies,
            &[(VocabularyId::Unit, sample.unit.as_deref())],
            FallbackPolicy::UseSourceValue,
        );

        let quantity = sample.value.as_deref().and_then(parse_decimal);
        let occurrence = &mut obs.occurrence;
        occurrence.organism_quantity = text(sample.value.as_deref());
        occurrence.is_positive_observation = quantity.map_or(true, |q| q > 0.0);
        occurrence.recorded_by = text(sample.sampler.as_deref());
        occurrence.reported_by = text(sample.reporting_institute_name_en.as_deref());
        obs.identification.identified_by = text(sample.analysed_by.as_deref());
        obs.identification.verified = true;

        attach_taxon(&mut obs, &self.context, taxon_id);
        finish(&mut obs, &self.context);
        Ok(obs)
    }
}
