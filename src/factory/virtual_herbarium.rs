//! Virtual Herbarium: digitized herbarium specimens
//!
//! Collection dates are often partial ("1887" or "1904-06") and cover the
//! whole year or month. The holding institution must resolve against the
//! institution vocabulary.

use super::common::{
    attach_taxon, decode_payload, finish, parse_taxon_id, resolve_label, set_coordinates_from_text,
    set_event_dates, set_uncertainty_from_text, text, ProviderConstants,
};
use super::traits::{FactoryContext, FactoryError, ObservationFactory};
use crate::model::{DataProvider, FallbackPolicy, Observation, VerbatimRecord, VocabularyId};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HerbariumSpecimen {
    accession_no: String,
    institution_code: Option<String>,
    dyntaxa_id: Option<String>,
    date_collected: Option<String>,
    lat: Option<String>,
    long: Option<String>,
    coordinate_precision: Option<String>,
    locality: Option<String>,
    collector: Option<String>,
    notes: Option<String>,
}

pub struct VirtualHerbariumObservationFactory {
    provider: DataProvider,
    context: FactoryContext,
    constants: ProviderConstants,
}

impl VirtualHerbariumObservationFactory {
    pub fn new(provider: DataProvider, context: FactoryContext) -> Self {
        let constants = ProviderConstants::new(&provider, &context, "Virtual Herbarium", "PreservedSpecimen");
        Self {
            provider,
            context,
            constants,
        }
    }
}

impl ObservationFactory for VirtualHerbariumObservationFactory {
    fn provider(&self) -> &DataProvider {
        &self.provider
    }

    fn context(&self) -> &FactoryContext {
        &self.context
    }

    fn create_observation(&self, verbatim: &VerbatimRecord) -> Result<Observation, FactoryError> {
        let specimen: HerbariumSpecimen = decode_payload(&self.provider, verbatim)?;
        let mut obs = self.constants.observation(&self.provider);

        let institution_code = text(specimen.institution_code.as_deref());
        let accession = specimen.accession_no.trim();
        obs.occurrence.occurrence_id = format!(
            "urn:lsid:herbarium.emg.umu.se:{}:{}",
            institution_code.as_deref().unwrap_or("unknown"),
            accession
        );
        obs.occurrence.catalog_number = Some(accession.to_string());
        obs.institution = resolve_label(
            &mut obs,
            &self.context.vocabularies,
            VocabularyId::Institution,
            "institution",
            institution_code.as_deref(),
            FallbackPolicy::Fail,
        );
        obs.owner_institution_code = institution_code;

        set_event_dates(&mut obs, specimen.date_collected.as_deref(), None);
        set_coordinates_from_text(&mut obs, specimen.lat.as_deref(), specimen.long.as_deref());
        set_uncertainty_from_text(&mut obs, specimen.coordinate_precision.as_deref());
        obs.location.locality = text(specimen.locality.as_deref());

        obs.occurrence.recorded_by = text(specimen.collector.as_deref());
        obs.occurrence.remarks = text(specimen.notes.as_deref());
        obs.identification.verified = true;

        attach_taxon(&mut obs, &self.context, specimen.dyntaxa_id.as_deref().and_then(parse_taxon_id));
        finish(&mut obs, &self.context);
        Ok(obs)
    }
}
