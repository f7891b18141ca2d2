//! Vocabulary values and definitions

use serde::{Deserialize, Serialize};

/// Id used when no vocabulary entry matched and the source value is kept
pub const VOCABULARY_UNMAPPED_ID: i32 = -1;

/// The controlled vocabularies provider codes are mapped onto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VocabularyId {
    Activity,
    LifeStage,
    Sex,
    Substrate,
    ValidationStatus,
    Institution,
    OccurrenceStatus,
    BasisOfRecord,
    Unit,
    Biotope,
}

impl VocabularyId {
    pub const ALL: [VocabularyId; 10] = [
        VocabularyId::Activity,
        VocabularyId::LifeStage,
        VocabularyId::Sex,
        VocabularyId::Substrate,
        VocabularyId::ValidationStatus,
        VocabularyId::Institution,
        VocabularyId::OccurrenceStatus,
        VocabularyId::BasisOfRecord,
        VocabularyId::Unit,
        VocabularyId::Biotope,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VocabularyId::Activity => "activity",
            VocabularyId::LifeStage => "lifeStage",
            VocabularyId::Sex => "sex",
            VocabularyId::Substrate => "substrate",
            VocabularyId::ValidationStatus => "validationStatus",
            VocabularyId::Institution => "institution",
            VocabularyId::OccurrenceStatus => "occurrenceStatus",
            VocabularyId::BasisOfRecord => "basisOfRecord",
            VocabularyId::Unit => "unit",
            VocabularyId::Biotope => "biotope",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        VocabularyId::ALL.into_iter().find(|v| v.as_str() == s)
    }
}

impl std::fmt::Display for VocabularyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved vocabulary value.
///
/// `id` is either a canonical entry id or [`VOCABULARY_UNMAPPED_ID`], in
/// which case `value` carries the original source string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyValue {
    pub id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl VocabularyValue {
    pub fn mapped(id: i32) -> Self {
        Self { id, value: None }
    }

    pub fn unmapped(source: impl Into<String>) -> Self {
        Self {
            id: VOCABULARY_UNMAPPED_ID,
            value: Some(source.into()),
        }
    }

    pub fn is_unmapped(&self) -> bool {
        self.id == VOCABULARY_UNMAPPED_ID
    }
}

/// What to do when a source value has no vocabulary entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Keep the source string under the unmapped id
    UseSourceValue,
    /// Report a resolution error; the caller records a defect
    Fail,
}

/// A localized label for a vocabulary entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyTranslation {
    pub culture: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyEntry {
    pub id: i32,
    /// Non-localized canonical value
    pub value: String,
    #[serde(default)]
    pub translations: Vec<VocabularyTranslation>,
    /// Provider-specific codes that also map to this entry
    #[serde(default)]
    pub source_codes: Vec<String>,
}

impl VocabularyEntry {
    pub fn new(id: i32, value: impl Into<String>) -> Self {
        Self {
            id,
            value: value.into(),
            translations: Vec::new(),
            source_codes: Vec::new(),
        }
    }

    pub fn with_translation(mut self, culture: &str, value: impl Into<String>) -> Self {
        self.translations.push(VocabularyTranslation {
            culture: culture.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn with_source_code(mut self, code: impl Into<String>) -> Self {
        self.source_codes.push(code.into());
        self
    }
}

/// A full vocabulary as supplied by the vocabulary repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyDefinition {
    pub vocabulary: VocabularyId,
    pub entries: Vec<VocabularyEntry>,
}

impl VocabularyDefinition {
    pub fn new(vocabulary: VocabularyId, entries: Vec<VocabularyEntry>) -> Self {
        Self { vocabulary, entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_value_keeps_source() {
        let v = VocabularyValue::unmapped("flygande");
        assert!(v.is_unmapped());
        assert_eq!(v.value.as_deref(), Some("flygande"));
    }

    #[test]
    fn mapped_value_serializes_without_value() {
        let json = serde_json::to_string(&VocabularyValue::mapped(3)).unwrap();
        assert_eq!(json, r#"{"id":3}"#);
    }
}
