//! Helpers shared by the provider factories

use super::traits::{FactoryContext, FactoryError};
use crate::model::{
    DataProvider, FallbackPolicy, Observation, ObservationTaxon, Taxon, TaxonId, VerbatimRecord,
    VocabularyId, VocabularyValue, NOT_SENSITIVE,
};
use crate::resolve::VocabularyResolver;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::de::DeserializeOwned;

/// Check the record's provider and deserialize its payload into the
/// provider's shape.
pub fn decode_payload<T: DeserializeOwned>(
    provider: &DataProvider,
    verbatim: &VerbatimRecord,
) -> Result<T, FactoryError> {
    if verbatim.provider_id != provider.id {
        return Err(FactoryError::ProviderMismatch {
            key: verbatim.key.clone(),
            expected: provider.id,
            found: verbatim.provider_id,
        });
    }
    T::deserialize(&verbatim.payload).map_err(|e| FactoryError::InvalidPayload {
        key: verbatim.key.clone(),
        kind: provider.kind,
        reason: e.to_string(),
    })
}

/// The part of an external id after its last `:`
pub fn catalog_number(external_id: &str) -> &str {
    match external_id.rfind(':') {
        Some(pos) => &external_id[pos + 1..],
        None => external_id,
    }
}

/// Taxon id from a plain number or an LSID such as
/// `urn:lsid:dyntaxa.se:Taxon:100024`
pub fn parse_taxon_id(raw: &str) -> Option<TaxonId> {
    catalog_number(raw.trim()).trim().parse().ok()
}

/// Decimal degrees written with either `.` or `,` as separator
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let value: f64 = raw.trim().replace(',', ".").parse().ok()?;
    value.is_finite().then_some(value)
}

/// Non-empty trimmed text
pub fn text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// The period a date or timestamp covers.
///
/// Timestamps cover an instant. Dates cover the whole day, partial dates
/// the whole month or year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSpan {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

impl DateSpan {
    fn instant(at: DateTime<Utc>) -> Self {
        Self { start: at, end: at }
    }

    fn days(first: NaiveDate, last: NaiveDate) -> Option<Self> {
        let end_of_day = NaiveTime::from_hms_opt(23, 59, 59)?;
        Some(Self {
            start: first.and_time(NaiveTime::MIN).and_utc(),
            end: last.and_time(end_of_day).and_utc(),
        })
    }

    /// Parse the date formats providers actually send. Timestamps without
    /// an offset are taken as UTC. `start/end` intervals are accepted.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if let Some((from, to)) = raw.split_once('/') {
            let start = Self::parse(from)?.start;
            let end = Self::parse(to)?.end;
            return Some(Self { start, end });
        }

        if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
            return Some(Self::instant(at.with_timezone(&Utc)));
        }
        for format in DATETIME_FORMATS {
            if let Ok(at) = NaiveDateTime::parse_from_str(raw, format) {
                return Some(Self::instant(at.and_utc()));
            }
        }
        if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Self::days(day, day);
        }

        let digits = raw.bytes().all(|b| b.is_ascii_digit());
        if digits && raw.len() == 8 {
            let day = NaiveDate::from_ymd_opt(
                raw[..4].parse().ok()?,
                raw[4..6].parse().ok()?,
                raw[6..].parse().ok()?,
            )?;
            return Self::days(day, day);
        }
        if digits && raw.len() == 4 {
            let year: i32 = raw.parse().ok()?;
            return Self::days(
                NaiveDate::from_ymd_opt(year, 1, 1)?,
                NaiveDate::from_ymd_opt(year, 12, 31)?,
            );
        }

        let (year, month) = raw.split_once('-')?;
        if year.len() != 4 {
            return None;
        }
        let year: i32 = year.parse().ok()?;
        let month: u32 = month.parse().ok()?;
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        Self::days(first, next.pred_opt()?)
    }
}

/// Set the event period from the provider's start and end values.
///
/// A missing end falls back to the end of the start period. Values that
/// are present but unparseable become defects.
pub fn set_event_dates(observation: &mut Observation, start: Option<&str>, end: Option<&str>) {
    let start = text(start);
    let end = text(end);

    let start_span = start.as_deref().and_then(DateSpan::parse);
    if let (Some(raw), None) = (&start, &start_span) {
        observation.add_defect("event.startDate", format!("unparseable date '{}'", raw));
    }
    let end_span = end.as_deref().and_then(DateSpan::parse);
    if let (Some(raw), None) = (&end, &end_span) {
        observation.add_defect("event.endDate", format!("unparseable date '{}'", raw));
    }

    observation.event.start_date = start_span.map(|s| s.start);
    observation.event.end_date = end_span.or(start_span).map(|s| s.end);
    observation.event.verbatim_event_date = match (start, end) {
        (Some(s), Some(e)) if s != e => Some(format!("{}/{}", s, e)),
        (Some(s), _) => Some(s),
        (None, e) => e,
    };
}

/// Set coordinates given as numbers
pub fn set_coordinates(observation: &mut Observation, latitude: Option<f64>, longitude: Option<f64>) {
    observation.location.decimal_latitude = latitude;
    observation.location.decimal_longitude = longitude;
}

/// Set coordinates given as text; unparseable values become defects.
pub fn set_coordinates_from_text(
    observation: &mut Observation,
    latitude: Option<&str>,
    longitude: Option<&str>,
) {
    let latitude = parse_text_field(observation, "location.decimalLatitude", latitude);
    let longitude = parse_text_field(observation, "location.decimalLongitude", longitude);
    set_coordinates(observation, latitude, longitude);
}

fn parse_text_field(observation: &mut Observation, field: &str, raw: Option<&str>) -> Option<f64> {
    let raw = text(raw)?;
    let value = parse_decimal(&raw);
    if value.is_none() {
        observation.add_defect(field, format!("unparseable number '{}'", raw));
    }
    value
}

/// Parse a non-negative whole number of metres; anything else is a defect
pub fn set_uncertainty_from_text(observation: &mut Observation, raw: Option<&str>) {
    let Some(value) = parse_text_field(observation, "location.coordinateUncertaintyInMeters", raw) else {
        return;
    };
    if value < 0.0 {
        observation.add_defect(
            "location.coordinateUncertaintyInMeters",
            format!("negative uncertainty {}", value),
        );
        return;
    }
    observation.location.coordinate_uncertainty_in_meters = Some(value.round().min(f64::from(u32::MAX)) as u32);
}

/// Uncertainty sent as a signed integer
pub fn set_uncertainty(observation: &mut Observation, meters: Option<i64>) {
    match meters {
        Some(m) if m < 0 => observation.add_defect(
            "location.coordinateUncertaintyInMeters",
            format!("negative uncertainty {}", m),
        ),
        Some(m) => {
            observation.location.coordinate_uncertainty_in_meters = Some(u32::try_from(m).unwrap_or(u32::MAX))
        }
        None => {}
    }
}

/// Attach the taxon and derive the sensitivity category from it.
///
/// An unresolved taxon leaves the observation without taxon, not
/// sensitive, and flagged as a never-found, non-positive observation.
/// Call this after the provider's own positive/negative rules so the
/// unresolved case always wins.
pub fn attach_taxon<'a>(
    observation: &mut Observation,
    context: &'a FactoryContext,
    taxon_id: Option<TaxonId>,
) -> Option<&'a Taxon> {
    match taxon_id.and_then(|id| context.taxa.get(id)) {
        Some(taxon) => {
            observation.occurrence.sensitivity_category = taxon.sensitivity_category.max(NOT_SENSITIVE);
            observation.taxon = Some(ObservationTaxon::from(taxon));
            Some(taxon)
        }
        None => {
            observation.taxon = None;
            observation.occurrence.sensitivity_category = NOT_SENSITIVE;
            observation.occurrence.is_never_found_observation = true;
            observation.occurrence.is_positive_observation = false;
            None
        }
    }
}

/// Resolve a vocabulary label; a resolution error becomes a defect on `field`.
pub fn resolve_label(
    observation: &mut Observation,
    vocabularies: &VocabularyResolver,
    vocabulary: VocabularyId,
    field: &str,
    source: Option<&str>,
    policy: FallbackPolicy,
) -> Option<VocabularyValue> {
    match vocabularies.resolve(vocabulary, source, policy) {
        Ok(value) => value,
        Err(e) => {
            observation.add_defect(field, e.to_string());
            None
        }
    }
}

/// Resolve a numeric vocabulary code; a resolution error becomes a defect on `field`.
pub fn resolve_code(
    observation: &mut Observation,
    vocabularies: &VocabularyResolver,
    vocabulary: VocabularyId,
    field: &str,
    source: Option<i32>,
    policy: FallbackPolicy,
) -> Option<VocabularyValue> {
    match vocabularies.resolve_id(vocabulary, source, policy) {
        Ok(value) => value,
        Err(e) => {
            observation.add_defect(field, e.to_string());
            None
        }
    }
}

/// Resolve numeric codes into their occurrence fields
pub fn resolve_occurrence_codes(
    observation: &mut Observation,
    vocabularies: &VocabularyResolver,
    codes: &[(VocabularyId, Option<i32>)],
    policy: FallbackPolicy,
) {
    for &(vocabulary, code) in codes {
        let field = format!("occurrence.{}", vocabulary);
        let value = resolve_code(observation, vocabularies, vocabulary, &field, code, policy);
        if let Some(slot) = observation.occurrence.vocabulary_field_mut(vocabulary) {
            *slot = value;
        }
    }
}

/// Resolve labels into their occurrence fields
pub fn resolve_occurrence_labels(
    observation: &mut Observation,
    vocabularies: &VocabularyResolver,
    labels: &[(VocabularyId, Option<&str>)],
    policy: FallbackPolicy,
) {
    for &(vocabulary, label) in labels {
        let field = format!("occurrence.{}", vocabulary);
        let value = resolve_label(observation, vocabularies, vocabulary, &field, label, policy);
        if let Some(slot) = observation.occurrence.vocabulary_field_mut(vocabulary) {
            *slot = value;
        }
    }
}

/// Values every observation of one provider shares, resolved once when
/// the factory is built.
#[derive(Debug, Clone)]
pub struct ProviderConstants {
    pub dataset_id: String,
    pub dataset_name: String,
    pub owner_institution_code: Option<String>,
    pub institution: Option<VocabularyValue>,
    pub basis_of_record: Option<VocabularyValue>,
}

impl ProviderConstants {
    pub fn new(provider: &DataProvider, context: &FactoryContext, dataset_name: &str, basis_of_record: &str) -> Self {
        let vocabularies = &context.vocabularies;
        let organization = provider.organization.as_deref();
        Self {
            dataset_id: format!("urn:lsid:swedishlifewatch.se:dataprovider:{}", provider.identifier),
            dataset_name: dataset_name.to_string(),
            owner_institution_code: organization.map(str::to_string),
            institution: vocabularies
                .resolve(VocabularyId::Institution, organization, FallbackPolicy::UseSourceValue)
                .ok()
                .flatten(),
            basis_of_record: vocabularies
                .resolve(VocabularyId::BasisOfRecord, Some(basis_of_record), FallbackPolicy::UseSourceValue)
                .ok()
                .flatten(),
        }
    }

    /// A fresh observation for `provider` stamped with these constants
    pub fn observation(&self, provider: &DataProvider) -> Observation {
        let mut observation = Observation::new(provider.id);
        observation.dataset_id = Some(self.dataset_id.clone());
        observation.dataset_name = Some(self.dataset_name.clone());
        observation.owner_institution_code = self.owner_institution_code.clone();
        observation.institution = self.institution.clone();
        observation.basis_of_record = self.basis_of_record.clone();
        observation
    }
}

/// Enrich areas from the final exact coordinates
pub fn finish(observation: &mut Observation, context: &FactoryContext) {
    context.areas.enrich(&mut observation.location);
}
