//! MVM: freshwater monitoring of benthic fauna and plankton

use super::common::{
    attach_taxon, decode_payload, finish, resolve_occurrence_labels, set_coordinates, set_event_dates,
    set_uncertainty, text, ProviderConstants,
};
use super::traits::{FactoryContext, FactoryError, ObservationFactory};
use crate::model::{DataProvider, FallbackPolicy, Observation, TaxonId, VerbatimRecord, VocabularyId};
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MvmObservation {
    occurrence_id: String,
    catalog_number: Option<String>,
    dyntaxa_taxon_id: Option<TaxonId>,
    start_date: Option<String>,
    end_date: Option<String>,
    decimal_latitude: Option<f64>,
    decimal_longitude: Option<f64>,
    coordinate_uncertainty_in_meters: Option<i64>,
    locality: Option<String>,
    quantity: Option<f64>,
    quantity_unit: Option<String>,
    life_stage: Option<String>,
    substrate: Option<String>,
    #[serde(default = "positive")]
    is_positive_observation: bool,
    recorded_by: Option<String>,
    reported_by: Option<String>,
    project_name: Option<String>,
    modified: Option<DateTime<Utc>>,
}

fn positive() -> bool {
    true
}

pub struct MvmObservationFactory {
    provider: DataProvider,
    context: FactoryContext,
    constants: ProviderConstants,
}

impl MvmObservationFactory {
    pub fn new(provider: DataProvider, context: FactoryContext) -> Self {
        let constants = ProviderConstants::new(&provider, &context, "Miljöövervakningsdata (MVM)", "HumanObservation");
        Self {
            provider,
            context,
            constants,
        }
    }
}

impl ObservationFactory for MvmObservationFactory {
    fn provider(&self) -> &DataProvider {
        &self.provider
    }

    fn context(&self) -> &FactoryContext {
        &self.context
    }

    fn create_observation(&self, verbatim: &VerbatimRecord) -> Result<Observation, FactoryError> {
        let sample: MvmObservation = decode_payload(&self.provider, verbatim)?;
        let mut obs = self.constants.observation(&self.provider);

        obs.occurrence.occurrence_id = sample.occurrence_id.trim().to_string();
        // MVM ships its own catalog numbers
        obs.occurrence.catalog_number = text(sample.catalog_number.as_deref());
        obs.modified = sample.modified;
        if let Some(project) = text(sample.project_name.as_deref()) {
            obs.dataset_name = Some(project);
        }

        set_event_dates(&mut obs, sample.start_date.as_deref(), sample.end_date.as_deref());
        set_coordinates(&mut obs, sample.decimal_latitude, sample.decimal_longitude);
        set_uncertainty(&mut obs, sample.coordinate_uncertainty_in_meters);
        obs.location.locality = text(sample.locality.as_deref());

        resolve_occurrence_labels(
            &mut obs,
            &self.context.vocabularies,
            &[
                (VocabularyId::Unit, sample.quantity_unit.as_deref()),
                (VocabularyId::LifeStage, sample.life_stage.as_deref()),
                (VocabularyId::Substrate, sample.substrate.as_deref()),
            ],
            FallbackPolicy::UseSourceValue,
        );

        let occurrence = &mut obs.occurrence;
        occurrence.organism_quantity = sample.quantity.map(|q| q.to_string());
        occurrence.is_positive_observation = sample.is_positive_observation && sample.quantity != Some(0.0);
        occurrence.recorded_by = text(sample.recorded_by.as_deref());
        occurrence.reported_by = text(sample.reported_by.as_deref());
        obs.identification.verified = true;

        attach_taxon(&mut obs, &self.context, sample.dyntaxa_taxon_id);
        finish(&mut obs, &self.context);
        Ok(obs)
    }
}
