//! Vocabulary resolver
//!
//! Maps provider-specific coded values onto canonical vocabulary ids.
//! The lookup tables are built once from the repository's definitions and
//! are immutable afterwards.

use crate::model::{FallbackPolicy, VocabularyDefinition, VocabularyId, VocabularyValue};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResolveError {
    #[error("no {vocabulary} entry for '{value}'")]
    Unmapped { vocabulary: VocabularyId, value: String },
    #[error("vocabulary {0} is not loaded")]
    UnknownVocabulary(VocabularyId),
}

/// Immutable `(vocabulary, source value) → canonical id` snapshot.
///
/// Keys include every entry's canonical value, all localized
/// translations and any provider source codes, compared after trimming
/// and lowercasing.
#[derive(Debug, Default)]
pub struct VocabularyResolver {
    by_source: HashMap<(VocabularyId, String), i32>,
    values: HashMap<(VocabularyId, i32), String>,
    loaded: HashSet<VocabularyId>,
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

impl VocabularyResolver {
    /// Build the lookup. When two entries claim the same source string the
    /// first one wins.
    pub fn build(definitions: impl IntoIterator<Item = VocabularyDefinition>) -> Self {
        let mut resolver = Self::default();
        for definition in definitions {
            let vocabulary = definition.vocabulary;
            resolver.loaded.insert(vocabulary);
            for entry in definition.entries {
                let keys = std::iter::once(entry.value.as_str())
                    .chain(entry.translations.iter().map(|t| t.value.as_str()))
                    .chain(entry.source_codes.iter().map(String::as_str));
                for key in keys {
                    let key = normalize(key);
                    if key.is_empty() {
                        continue;
                    }
                    resolver.by_source.entry((vocabulary, key)).or_insert(entry.id);
                }
                resolver
                    .values
                    .entry((vocabulary, entry.id))
                    .or_insert(entry.value);
            }
        }
        resolver
    }

    pub fn is_loaded(&self, vocabulary: VocabularyId) -> bool {
        self.loaded.contains(&vocabulary)
    }

    /// Resolve a source string.
    ///
    /// Absent or blank input resolves to `None` under either policy.
    pub fn resolve(
        &self,
        vocabulary: VocabularyId,
        source: Option<&str>,
        policy: FallbackPolicy,
    ) -> Result<Option<VocabularyValue>, ResolveError> {
        let Some(source) = source.filter(|s| !s.trim().is_empty()) else {
            return Ok(None);
        };

        if let Some(&id) = self.by_source.get(&(vocabulary, normalize(source))) {
            return Ok(Some(VocabularyValue::mapped(id)));
        }

        match policy {
            FallbackPolicy::UseSourceValue => {
                tracing::debug!(vocabulary = %vocabulary, value = source, "unmapped vocabulary value");
                Ok(Some(VocabularyValue::unmapped(source)))
            }
            FallbackPolicy::Fail if !self.is_loaded(vocabulary) => {
                Err(ResolveError::UnknownVocabulary(vocabulary))
            }
            FallbackPolicy::Fail => Err(ResolveError::Unmapped {
                vocabulary,
                value: source.to_string(),
            }),
        }
    }

    /// Resolve a numeric code some providers ship instead of a label.
    pub fn resolve_id(
        &self,
        vocabulary: VocabularyId,
        id: Option<i32>,
        policy: FallbackPolicy,
    ) -> Result<Option<VocabularyValue>, ResolveError> {
        let Some(id) = id else {
            return Ok(None);
        };
        if self.values.contains_key(&(vocabulary, id)) {
            return Ok(Some(VocabularyValue::mapped(id)));
        }
        match policy {
            FallbackPolicy::UseSourceValue => {
                tracing::debug!(vocabulary = %vocabulary, id, "unmapped vocabulary id");
                Ok(Some(VocabularyValue::unmapped(id.to_string())))
            }
            FallbackPolicy::Fail => Err(ResolveError::Unmapped {
                vocabulary,
                value: id.to_string(),
            }),
        }
    }

    /// Canonical (non-localized) label of an entry
    pub fn value_of(&self, vocabulary: VocabularyId, id: i32) -> Option<&str> {
        self.values.get(&(vocabulary, id)).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{VocabularyEntry, VOCABULARY_UNMAPPED_ID};

    fn resolver() -> VocabularyResolver {
        VocabularyResolver::build(vec![
            VocabularyDefinition::new(
                VocabularyId::Activity,
                vec![
                    VocabularyEntry::new(1, "flying overhead").with_translation("sv-SE", "förbiflygande"),
                    VocabularyEntry::new(17, "nest with eggs")
                        .with_translation("sv-SE", "bo med ägg")
                        .with_source_code("NE"),
                ],
            ),
            VocabularyDefinition::new(
                VocabularyId::LifeStage,
                vec![VocabularyEntry::new(3, "adult").with_translation("sv-SE", "adult")],
            ),
        ])
    }

    #[test]
    fn resolves_canonical_localized_and_source_codes() {
        let r = resolver();
        let p = FallbackPolicy::Fail;
        assert_eq!(r.resolve(VocabularyId::Activity, Some("Flying overhead"), p).unwrap(), Some(VocabularyValue::mapped(1)));
        assert_eq!(r.resolve(VocabularyId::Activity, Some(" förbiflygande "), p).unwrap(), Some(VocabularyValue::mapped(1)));
        assert_eq!(r.resolve(VocabularyId::Activity, Some("ne"), p).unwrap(), Some(VocabularyValue::mapped(17)));
        assert_eq!(r.resolve(VocabularyId::LifeStage, Some("ADULT"), p).unwrap(), Some(VocabularyValue::mapped(3)));
    }

    #[test]
    fn miss_with_source_fallback_keeps_original_string() {
        let r = resolver();
        let v = r
            .resolve(VocabularyId::Activity, Some("Sjungande"), FallbackPolicy::UseSourceValue)
            .unwrap()
            .unwrap();
        assert_eq!(v.id, VOCABULARY_UNMAPPED_ID);
        assert_eq!(v.value.as_deref(), Some("Sjungande"));
    }

    #[test]
    fn miss_with_fail_policy_is_an_error() {
        let r = resolver();
        let err = r
            .resolve(VocabularyId::Activity, Some("Sjungande"), FallbackPolicy::Fail)
            .unwrap_err();
        assert!(matches!(err, ResolveError::Unmapped { vocabulary: VocabularyId::Activity, .. }));
        let err = r
            .resolve(VocabularyId::Substrate, Some("bark"), FallbackPolicy::Fail)
            .unwrap_err();
        assert_eq!(err, ResolveError::UnknownVocabulary(VocabularyId::Substrate));
    }

    #[test]
    fn blank_source_is_none_not_unmapped() {
        let r = resolver();
        for policy in [FallbackPolicy::Fail, FallbackPolicy::UseSourceValue] {
            assert_eq!(r.resolve(VocabularyId::Activity, Some("   "), policy).unwrap(), None);
            assert_eq!(r.resolve(VocabularyId::Activity, None, policy).unwrap(), None);
        }
    }

    #[test]
    fn numeric_codes_resolve_by_id() {
        let r = resolver();
        assert_eq!(
            r.resolve_id(VocabularyId::Activity, Some(17), FallbackPolicy::Fail).unwrap(),
            Some(VocabularyValue::mapped(17))
        );
        let v = r
            .resolve_id(VocabularyId::Activity, Some(404), FallbackPolicy::UseSourceValue)
            .unwrap()
            .unwrap();
        assert!(v.is_unmapped());
        assert_eq!(v.value.as_deref(), Some("404"));
        assert_eq!(r.value_of(VocabularyId::Activity, 17), Some("nest with eggs"));
    }
}
