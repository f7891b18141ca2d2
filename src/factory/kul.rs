//! KUL: coastal fish monitoring with survey nets

use super::common::{
    attach_taxon, catalog_number, decode_payload, finish, set_coordinates, set_event_dates,
    set_uncertainty, text, ProviderConstants,
};
use super::traits::{FactoryContext, FactoryError, ObservationFactory};
use crate::model::{DataProvider, Observation, TaxonId, VerbatimRecord};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KulObservation {
    occurrence_id: String,
    dyntaxa_taxon_id: Option<TaxonId>,
    start: Option<String>,
    end: Option<String>,
    decimal_latitude: Option<f64>,
    decimal_longitude: Option<f64>,
    coordinate_uncertainty_in_meters: Option<i64>,
    location_id: Option<String>,
    individual_count: Option<i64>,
    gear: Option<String>,
    reported_by: Option<String>,
}

pub struct KulObservationFactory {
    provider: DataProvider,
    context: FactoryContext,
    constants: ProviderConstants,
}

impl KulObservationFactory {
    pub fn new(provider: DataProvider, context: FactoryContext) -> Self {
        let constants = ProviderConstants::new(&provider, &context, "Kustfiskövervakning (KUL)", "HumanObservation");
        Self {
            provider,
            context,
            constants,
        }
    }
}

impl ObservationFactory for KulObservationFactory {
    fn provider(&self) -> &DataProvider {
        &self.provider
    }

    fn context(&self) -> &FactoryContext {
        &self.context
    }

    fn create_observation(&self, verbatim: &VerbatimRecord) -> Result<Observation, FactoryError> {
        let catch: KulObservation = decode_payload(&self.provider, verbatim)?;
        let mut obs = self.constants.observation(&self.provider);

        obs.occurrence.occurrence_id = catch.occurrence_id.trim().to_string();
        obs.occurrence.catalog_number = Some(catalog_number(&obs.occurrence.occurrence_id).to_string());

        set_event_dates(&mut obs, catch.start.as_deref(), catch.end.as_deref());
        obs.event.sampling_protocol = text(catch.gear.as_deref());

        set_coordinates(&mut obs, catch.decimal_latitude, catch.decimal_longitude);
        set_uncertainty(&mut obs, catch.coordinate_uncertainty_in_meters);
        obs.location.locality = text(catch.location_id.as_deref());

        // An empty net is a recorded absence
        obs.occurrence.is_positive_observation = catch.individual_count.map_or(true, |c| c > 0);
        obs.occurrence.individual_count = catch.individual_count.map(|c| c.to_string());
        obs.occurrence.reported_by = text(catch.reported_by.as_deref());
        obs.occurrence.recorded_by = obs.occurrence.reported_by.clone();
        obs.identification.verified = true;

        attach_taxon(&mut obs, &self.context, catch.dyntaxa_taxon_id);
        finish(&mut obs, &self.context);
        Ok(obs)
    }
}
