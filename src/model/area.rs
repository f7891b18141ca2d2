//! Administrative area references

use serde::{Deserialize, Serialize};

/// Kind of administrative region an area belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AreaType {
    County,
    Municipality,
    Province,
    Parish,
    CountryRegion,
}

impl AreaType {
    pub const ALL: [AreaType; 5] = [
        AreaType::County,
        AreaType::Municipality,
        AreaType::Province,
        AreaType::Parish,
        AreaType::CountryRegion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AreaType::County => "county",
            AreaType::Municipality => "municipality",
            AreaType::Province => "province",
            AreaType::Parish => "parish",
            AreaType::CountryRegion => "countryRegion",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        AreaType::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl std::fmt::Display for AreaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reference to an administrative region, attached to a location by
/// spatial lookup. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Area {
    pub feature_id: String,
    pub name: String,
    pub area_type: AreaType,
}

impl Area {
    pub fn new(area_type: AreaType, feature_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            feature_id: feature_id.into(),
            name: name.into(),
            area_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_type_round_trips_through_str() {
        for t in AreaType::ALL {
            assert_eq!(AreaType::parse(t.as_str()), Some(t));
        }
        assert_eq!(AreaType::parse("ocean"), None);
    }
}
