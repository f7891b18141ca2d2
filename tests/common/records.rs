//! Verbatim record builders

use serde_json::json;
use sightings::{DataProvider, ProviderId, ProviderKind, VerbatimRecord};

pub const ARTPORTALEN: u32 = 1;

pub fn artportalen() -> DataProvider {
    DataProvider::new(ARTPORTALEN, "artportalen", ProviderKind::Artportalen)
}

pub fn occurrence_id(sighting: i64) -> String {
    format!("urn:lsid:artportalen.se:Sighting:{}", sighting)
}

pub fn sighting(id: i64, taxon: i32) -> VerbatimRecord {
    VerbatimRecord::new(
        ProviderId(ARTPORTALEN),
        id.to_string(),
        json!({
            "sightingId": id,
            "taxonId": taxon,
            "startDate": "2022-06-02T05:10:00",
            "endDate": "2022-06-02T07:00:00",
            "site": {
                "latitude": 59.1 + (id % 100) as f64 * 0.01,
                "longitude": 18.1 + (id % 37) as f64 * 0.01,
                "accuracy": 15,
                "name": "Tyresta"
            },
            "genderId": 2,
            "activityId": 3,
            "observers": "B. Berg"
        }),
    )
}

/// Structurally invalid: no start date
pub fn undated(id: i64, taxon: i32) -> VerbatimRecord {
    VerbatimRecord::new(
        ProviderId(ARTPORTALEN),
        id.to_string(),
        json!({
            "sightingId": id,
            "taxonId": taxon,
            "site": { "latitude": 59.3, "longitude": 18.0 }
        }),
    )
}

pub fn unknown_taxon(id: i64) -> VerbatimRecord {
    sighting(id, super::MISSING_TAXON)
}
