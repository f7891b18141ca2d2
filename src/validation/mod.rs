//! Validation of canonical observations
//!
//! `validate` is a pure partition: it consumes a batch and hands back the
//! valid and the invalid observations as two disjoint collections. Every
//! rule is evaluated for every observation so operators see the complete
//! defect set.

use crate::config::{RetryPolicy, ValidationConfig};
use crate::model::{InvalidObservation, Observation, ObservationDefect};
use crate::storage::{retry_with_backoff, InvalidObservationStore};
use chrono::Utc;

/// Result of validating one batch
#[derive(Debug, Default)]
pub struct ValidationOutcome {
    pub valid: Vec<Observation>,
    pub invalid: Vec<(Observation, InvalidObservation)>,
}

impl ValidationOutcome {
    pub fn invalid_records(&self) -> Vec<InvalidObservation> {
        self.invalid.iter().map(|(_, record)| record.clone()).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationManager {
    config: ValidationConfig,
}

impl ValidationManager {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Every rule the observation violates, in a stable order
    pub fn check(&self, observation: &Observation) -> Vec<ObservationDefect> {
        let mut defects = Vec::new();

        if observation.occurrence.occurrence_id.trim().is_empty() {
            defects.push(ObservationDefect::new("occurrence.occurrenceId", "missing occurrence id"));
        }

        let event = &observation.event;
        match (event.start_date, event.end_date) {
            (None, _) => defects.push(ObservationDefect::new("event.startDate", "missing start date")),
            (Some(start), Some(end)) if start > end => defects.push(ObservationDefect::new(
                "event.endDate",
                format!("start date {} is after end date {}", start.to_rfc3339(), end.to_rfc3339()),
            )),
            _ => {}
        }

        let location = &observation.location;
        match (location.decimal_latitude, location.decimal_longitude) {
            (Some(lat), Some(lon)) => {
                if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
                    defects.push(ObservationDefect::new(
                        "location.decimalLatitude",
                        format!("latitude {} is not a valid coordinate", lat),
                    ));
                }
                if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
                    defects.push(ObservationDefect::new(
                        "location.decimalLongitude",
                        format!("longitude {} is not a valid coordinate", lon),
                    ));
                }
                if let (Some(extent), Some(point)) = (&self.config.extent, location.point()) {
                    if point.is_valid() && !extent.contains(&point) {
                        defects.push(ObservationDefect::new(
                            "location",
                            format!("({}, {}) is outside the supported extent", lat, lon),
                        ));
                    }
                }
            }
            _ => defects.push(ObservationDefect::new("location", "missing coordinates")),
        }

        if self.config.require_taxon && observation.taxon.is_none() {
            defects.push(ObservationDefect::new("taxon", "taxon could not be resolved"));
        }

        // Defects recorded while the factory mapped the record
        if let Some(recorded) = &observation.defects {
            defects.extend(
                recorded
                    .iter()
                    .map(|(field, reason)| ObservationDefect::new(field.as_str(), reason.as_str())),
            );
        }

        defects
    }

    /// Split any batch of items carrying an observation into the items
    /// that pass and the items that fail, with their defects.
    ///
    /// The relative order of each side matches the input.
    pub fn partition<T>(
        &self,
        batch: Vec<T>,
        observation: impl Fn(&T) -> &Observation,
    ) -> (Vec<T>, Vec<(T, Vec<ObservationDefect>)>) {
        let mut valid = Vec::with_capacity(batch.len());
        let mut invalid = Vec::new();
        for item in batch {
            let defects = self.check(observation(&item));
            if defects.is_empty() {
                valid.push(item);
            } else {
                invalid.push((item, defects));
            }
        }
        (valid, invalid)
    }

    /// Partition a batch into valid and invalid observations.
    pub fn validate(&self, batch: Vec<Observation>) -> ValidationOutcome {
        let (valid, invalid) = self.partition(batch, |obs| obs);
        ValidationOutcome {
            valid,
            invalid: invalid
                .into_iter()
                .map(|(obs, defects)| {
                    let record = invalid_observation(&obs, defects, None);
                    (obs, record)
                })
                .collect(),
        }
    }
}

/// The operator-facing record of a failed observation. `fallback_key`
/// stands in for a missing occurrence id.
pub fn invalid_observation(
    observation: &Observation,
    defects: Vec<ObservationDefect>,
    fallback_key: Option<&str>,
) -> InvalidObservation {
    let occurrence_id = match observation.occurrence.occurrence_id.trim() {
        "" => fallback_key.unwrap_or_default().to_string(),
        id => id.to_string(),
    };
    InvalidObservation {
        data_provider_id: observation.data_provider_id,
        occurrence_id,
        dataset_name: observation.dataset_name.clone(),
        defects,
        modified_date: Utc::now(),
    }
}

/// Persist invalid observations for operators.
///
/// Best effort: transient failures are retried under `retry`, anything
/// still failing is logged and the run carries on. Returns whether the
/// records were stored.
pub async fn add_invalid_observations_to_db(
    store: &dyn InvalidObservationStore,
    invalid: &[InvalidObservation],
    retry: &RetryPolicy,
) -> bool {
    if invalid.is_empty() {
        return true;
    }
    match retry_with_backoff("store invalid observations", retry, || store.add_invalid(invalid)).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(count = invalid.len(), error = %e, "failed to store invalid observations");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Location, ProviderId};
    use crate::resolve::BoundingBox;
    use crate::storage::{StorageError, StorageResult};
    use chrono::{Duration, TimeZone};

    fn valid(id: &str) -> Observation {
        let mut obs = Observation::new(ProviderId(1));
        obs.occurrence.occurrence_id = id.to_string();
        let start = Utc.with_ymd_and_hms(2023, 5, 14, 6, 0, 0).unwrap();
        obs.event.start_date = Some(start);
        obs.event.end_date = Some(start + Duration::hours(2));
        obs.location = Location::with_coordinates(59.3, 18.0);
        obs
    }

    fn fields(defects: &[ObservationDefect]) -> Vec<&str> {
        defects.iter().map(|d| d.field.as_str()).collect()
    }

    #[test]
    fn valid_observation_has_no_defects() {
        assert!(ValidationManager::default().check(&valid("a")).is_empty());
    }

    #[test]
    fn every_violated_rule_is_reported() {
        let mut obs = valid("");
        obs.event.end_date = Some(obs.event.start_date.unwrap() - Duration::days(1));
        obs.location.decimal_latitude = Some(123.0);
        obs.add_defect("identification.validationStatus", "no validationStatus entry for '999'");

        let defects = ValidationManager::default().check(&obs);
        assert_eq!(
            fields(&defects),
            vec![
                "occurrence.occurrenceId",
                "event.endDate",
                "location.decimalLatitude",
                "identification.validationStatus",
            ]
        );
    }

    #[test]
    fn missing_parts() {
        let mut obs = valid("b");
        obs.event.start_date = None;
        obs.location = Location::default();
        let defects = ValidationManager::default().check(&obs);
        assert_eq!(fields(&defects), vec!["event.startDate", "location"]);
    }

    #[test]
    fn non_finite_coordinates() {
        let mut obs = valid("c");
        obs.location.decimal_longitude = Some(f64::NAN);
        let defects = ValidationManager::default().check(&obs);
        assert_eq!(fields(&defects), vec!["location.decimalLongitude"]);
    }

    #[test]
    fn extent_and_taxon_rules_are_configurable() {
        let manager = ValidationManager::new(ValidationConfig {
            extent: Some(BoundingBox::new(10.0, 55.0, 25.0, 69.5)),
            require_taxon: true,
        });
        let mut obs = valid("d");
        obs.location = Location::with_coordinates(40.4, -3.7);
        let defects = manager.check(&obs);
        assert_eq!(fields(&defects), vec!["location", "taxon"]);
    }

    #[test]
    fn validate_partitions_without_loss() {
        let batch = vec![valid("1"), valid(""), valid("3")];
        let outcome = ValidationManager::default().validate(batch);
        assert_eq!(outcome.valid.len(), 2);
        assert_eq!(outcome.invalid.len(), 1);
        assert_eq!(outcome.valid[0].occurrence_id(), "1");
        assert_eq!(outcome.valid[1].occurrence_id(), "3");
        assert_eq!(outcome.invalid_records()[0].defects.len(), 1);
    }

    #[test]
    fn partition_keeps_caller_payload() {
        let batch = vec![("k1", valid("1")), ("k2", valid(""))];
        let (ok, failed) = ValidationManager::default().partition(batch, |(_, obs)| obs);
        assert_eq!(ok.len(), 1);
        assert_eq!(failed[0].0 .0, "k2");

        let record = invalid_observation(&failed[0].0 .1, failed[0].1.clone(), Some("k2"));
        assert_eq!(record.occurrence_id, "k2");
    }

    struct BrokenStore;

    impl InvalidObservationStore for BrokenStore {
        fn add_invalid(&self, _: &[InvalidObservation]) -> StorageResult<()> {
            Err(StorageError::Unavailable("down".into()))
        }
        fn delete_invalid(&self, _: ProviderId) -> StorageResult<u64> {
            Ok(0)
        }
        fn list_invalid(&self, _: ProviderId) -> StorageResult<Vec<InvalidObservation>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn store_failure_is_swallowed() {
        let outcome = ValidationManager::default().validate(vec![valid("")]);
        let retry = RetryPolicy::immediate(2);
        assert!(!add_invalid_observations_to_db(&BrokenStore, &outcome.invalid_records(), &retry).await);
        assert!(add_invalid_observations_to_db(&BrokenStore, &[], &retry).await);
    }
}
