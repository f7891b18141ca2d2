//! NORS: the national register of lake test-fishing

use super::common::{
    attach_taxon, catalog_number, decode_payload, finish, set_coordinates, set_event_dates,
    set_uncertainty, text, ProviderConstants,
};
use super::traits::{FactoryContext, FactoryError, ObservationFactory};
use crate::model::{DataProvider, Observation, TaxonId, VerbatimRecord};
use serde::Deserialize;

const SAMPLING_PROTOCOL: &str = "Provfiske med översiktsnät";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NorsObservation {
    occurrence_id: String,
    dyntaxa_taxon_id: Option<TaxonId>,
    start: Option<String>,
    end: Option<String>,
    decimal_latitude: Option<f64>,
    decimal_longitude: Option<f64>,
    coordinate_uncertainty_in_meters: Option<i64>,
    lake_name: Option<String>,
    individual_count: Option<i64>,
    reported_by: Option<String>,
    recorded_by: Option<String>,
}

pub struct NorsObservationFactory {
    provider: DataProvider,
    context: FactoryContext,
    constants: ProviderConstants,
}

impl NorsObservationFactory {
    pub fn new(provider: DataProvider, context: FactoryContext) -> Self {
        let constants = ProviderConstants::new(&provider, &context, "Sjöprovfiskedatabasen NORS", "HumanObservation");
        Self {
            provider,
            context,
            constants,
        }
    }
}

impl ObservationFactory for NorsObservationFactory {
    fn provider(&self) -> &DataProvider {
        &self.provider
    }

    fn context(&self) -> &FactoryContext {
        &self.context
    }

    fn create_observation(&self, verbatim: &VerbatimRecord) -> Result<Observation, FactoryError> {
        let fishing: NorsObservation = decode_payload(&self.provider, verbatim)?;
        let mut obs = self.constants.observation(&self.provider);

        obs.occurrence.occurrence_id = fishing.occurrence_id.trim().to_string();
        obs.occurrence.catalog_number = Some(catalog_number(&obs.occurrence.occurrence_id).to_string());

        set_event_dates(&mut obs, fishing.start.as_deref(), fishing.end.as_deref());
        obs.event.sampling_protocol = Some(SAMPLING_PROTOCOL.to_string());
        obs.event.habitat = Some("Sjö".to_string());

        set_coordinates(&mut obs, fishing.decimal_latitude, fishing.decimal_longitude);
        set_uncertainty(&mut obs, fishing.coordinate_uncertainty_in_meters);
        obs.location.locality = text(fishing.lake_name.as_deref());

        obs.occurrence.is_positive_observation = fishing.individual_count.map_or(true, |c| c > 0);
        obs.occurrence.individual_count = fishing.individual_count.map(|c| c.to_string());
        obs.occurrence.reported_by = text(fishing.reported_by.as_deref());
        obs.occurrence.recorded_by = text(fishing.recorded_by.as_deref());
        obs.identification.verified = true;

        attach_taxon(&mut obs, &self.context, fishing.dyntaxa_taxon_id);
        finish(&mut obs, &self.context);
        Ok(obs)
    }
}
