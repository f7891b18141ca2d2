//! SERS: the national register of electrofishing in streams

use super::common::{
    attach_taxon, catalog_number, decode_payload, finish, resolve_occurrence_labels, set_coordinates,
    set_event_dates, set_uncertainty, text, ProviderConstants,
};
use super::traits::{FactoryContext, FactoryError, ObservationFactory};
use crate::model::{DataProvider, FallbackPolicy, Observation, TaxonId, VerbatimRecord, VocabularyId};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SersObservation {
    occurrence_id: String,
    dyntaxa_taxon_id: Option<TaxonId>,
    start: Option<String>,
    end: Option<String>,
    decimal_latitude: Option<f64>,
    decimal_longitude: Option<f64>,
    coordinate_uncertainty_in_meters: Option<i64>,
    stream_name: Option<String>,
    /// Age class as reported, e.g. "0+" or ">0+"
    life_stage: Option<String>,
    individual_count: Option<i64>,
    reported_by: Option<String>,
}

pub struct SersObservationFactory {
    provider: DataProvider,
    context: FactoryContext,
    constants: ProviderConstants,
}

impl SersObservationFactory {
    pub fn new(provider: DataProvider, context: FactoryContext) -> Self {
        let constants = ProviderConstants::new(&provider, &context, "Svenskt ElfiskeRegiSter (SERS)", "HumanObservation");
        Self {
            provider,
            context,
            constants,
        }
    }
}

impl ObservationFactory for SersObservationFactory {
    fn provider(&self) -> &DataProvider {
        &self.provider
    }

    fn context(&self) -> &FactoryContext {
        &self.context
    }

    fn create_observation(&self, verbatim: &VerbatimRecord) -> Result<Observation, FactoryError> {
        let survey: SersObservation = decode_payload(&self.provider, verbatim)?;
        let mut obs = self.constants.observation(&self.provider);

        obs.occurrence.occurrence_id = survey.occurrence_id.trim().to_string();
        obs.occurrence.catalog_number = Some(catalog_number(&obs.occurrence.occurrence_id).to_string());

        set_event_dates(&mut obs, survey.start.as_deref(), survey.end.as_deref());
        obs.event.sampling_protocol = Some("Elfiske".to_string());
        obs.event.habitat = Some("Vattendrag".to_string());

        set_coordinates(&mut obs, survey.decimal_latitude, survey.decimal_longitude);
        set_uncertainty(&mut obs, survey.coordinate_uncertainty_in_meters);
        obs.location.locality = text(survey.stream_name.as_deref());

        resolve_occurrence_labels(
            &mut obs,
            &self.context.vocabularies,
            &[(VocabularyId::LifeStage, survey.life_stage.as_deref())],
            FallbackPolicy::UseSourceValue,
        );

        obs.occurrence.is_positive_observation = survey.individual_count.map_or(true, |c| c > 0);
        obs.occurrence.individual_count = survey.individual_count.map(|c| c.to_string());
        obs.occurrence.reported_by = text(survey.reported_by.as_deref());
        obs.identification.verified = true;

        attach_taxon(&mut obs, &self.context, survey.dyntaxa_taxon_id);
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

    #[test]
    fn age_class_is_kept_as_source_value() {
        let obs = SersObservationFactory::new(provider(6, ProviderKind::Sers), context())
            .create_observation(&VerbatimRecord::new(
                ProviderId(6),
                "k",
                json!({
                    "occurrenceId": "sers:2004:114:200:0+",
                    "dyntaxaTaxonId": 200,
                    "start": "2004-09-02",
                    "lifeStage": "0+",
                    "individualCount": 9
                }),
            ))
            .unwrap();

        let stage = obs.occurrence.life_stage.unwrap();
        assert_eq!(stage.id, VOCABULARY_UNMAPPED_ID);
        assert_eq!(stage.value.as_deref(), Some("0+"));
        assert_eq!(obs.occurrence.catalog_number.as_deref(), Some("0+"));
    }

    #[test]
    fn known_life_stage_resolves() {
        let obs = SersObservationFactory::new(provider(6, ProviderKind::Sers), context())
            .create_observation(&VerbatimRecord::new(
                ProviderId(6),
                "k",
                json!({ "occurrenceId": "sers:1", "dyntaxaTaxonId": 200, "lifeStage": "Adult" }),
            ))
            .unwrap();
        assert_eq!(obs.occurrence.life_stage.unwrap().id, 1);
    }
}
