//! Concept and translation store
//!
//! The catalogue itself is owned by an external import process; this module
//! defines the read-only interface the resolver consumes, plus an in-memory
//! implementation used by tests and batch tooling.

use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

/// Catalogue lifecycle state of a concept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConceptStatus {
    Active,
    Inactive,
}

/// One catalogued concept, keyed by `(code, code_system_oid)`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptRecord {
    pub code: String,
    pub code_system_oid: String,
    pub status: ConceptStatus,
    pub default_display: String,
    /// OID of the value set this concept was imported under, when the
    /// catalogue tracks one. Enables the resolver's cross-reference lookup.
    #[serde(default)]
    pub value_set_oid: Option<String>,
}

/// A localized display for a concept.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptTranslation {
    pub language: String,
    #[serde(default)]
    pub country: Option<String>,
    pub display: String,
}

/// Read-only access to the terminology catalogue.
///
/// Implementations must be safe to call concurrently; the resolver issues
/// lookups from many extraction tasks at once.
#[async_trait]
pub trait ConceptStore: Send + Sync {
    /// Exact dual-key lookup.
    async fn find_concept(
        &self,
        code: &str,
        code_system_oid: &str,
    ) -> StoreResult<Option<ConceptRecord>>;

    /// Localized display for a concept, most specific locale first.
    async fn find_translation(
        &self,
        concept: &ConceptRecord,
        language: &str,
        country: Option<&str>,
    ) -> StoreResult<Option<String>>;

    /// Secondary lookup keyed by a value set's defining OID, for sources
    /// that stamp entries with the value-set identifier instead of the
    /// concept's governing system.
    async fn find_concept_by_value_set(
        &self,
        value_set_oid: &str,
        code: &str,
    ) -> StoreResult<Option<ConceptRecord>>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogueConcept {
    #[serde(flatten)]
    record: ConceptRecord,
    #[serde(default)]
    translations: Vec<ConceptTranslation>,
}

#[derive(Debug, Deserialize)]
struct CatalogueFile {
    concepts: Vec<CatalogueConcept>,
}

/// In-memory catalogue.
///
/// Backing store for tests and for the CLI, which loads a JSON catalogue
/// produced by the external import process.
#[derive(Default)]
pub struct InMemoryConceptStore {
    concepts: HashMap<(String, String), ConceptRecord>,
    translations: HashMap<(String, String), Vec<ConceptTranslation>>,
    value_set_index: HashMap<(String, String), (String, String)>,
}

impl InMemoryConceptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON catalogue document:
    ///
    /// ```json
    /// { "concepts": [ { "code": "...", "codeSystemOid": "...", "status": "active",
    ///                   "defaultDisplay": "...", "valueSetOid": "...",
    ///                   "translations": [ { "language": "pt", "display": "..." } ] } ] }
    /// ```
    pub fn from_json(input: &str) -> StoreResult<Self> {
        let file: CatalogueFile =
            serde_json::from_str(input).map_err(|e| StoreError::Catalogue(e.to_string()))?;

        let mut store = Self::new();
        for concept in file.concepts {
            let translations = concept.translations;
            let record = concept.record;
            for translation in translations {
                store.insert_translation(&record.code, &record.code_system_oid, translation);
            }
            store.insert_concept(record);
        }
        Ok(store)
    }

    pub fn insert_concept(&mut self, record: ConceptRecord) {
        let key = (record.code_system_oid.clone(), record.code.clone());
        if let Some(vs_oid) = &record.value_set_oid {
            self.value_set_index
                .insert((vs_oid.clone(), record.code.clone()), key.clone());
        }
        self.concepts.insert(key, record);
    }

    pub fn insert_translation(
        &mut self,
        code: &str,
        code_system_oid: &str,
        translation: ConceptTranslation,
    ) {
        self.translations
            .entry((code_system_oid.to_string(), code.to_string()))
            .or_default()
            .push(translation);
    }

    pub fn concept_count(&self) -> usize {
        self.concepts.len()
    }
}

#[async_trait]
impl ConceptStore for InMemoryConceptStore {
    async fn find_concept(
        &self,
        code: &str,
        code_system_oid: &str,
    ) -> StoreResult<Option<ConceptRecord>> {
        Ok(self
            .concepts
            .get(&(code_system_oid.to_string(), code.to_string()))
            .cloned())
    }

    async fn find_translation(
        &self,
        concept: &ConceptRecord,
        language: &str,
        country: Option<&str>,
    ) -> StoreResult<Option<String>> {
        let key = (concept.code_system_oid.clone(), concept.code.clone());
        let Some(rows) = self.translations.get(&key) else {
            return Ok(None);
        };

        // Country-specific row wins over a language-wide one.
        if let Some(country) = country {
            let exact = rows.iter().find(|t| {
                t.language.eq_ignore_ascii_case(language)
                    && t.country
                        .as_deref()
                        .is_some_and(|c| c.eq_ignore_ascii_case(country))
            });
            if let Some(row) = exact {
                return Ok(Some(row.display.clone()));
            }
        }

        Ok(rows
            .iter()
            .find(|t| t.language.eq_ignore_ascii_case(language) && t.country.is_none())
            .map(|t| t.display.clone()))
    }

    async fn find_concept_by_value_set(
        &self,
        value_set_oid: &str,
        code: &str,
    ) -> StoreResult<Option<ConceptRecord>> {
        let Some(concept_key) = self
            .value_set_index
            .get(&(value_set_oid.to_string(), code.to_string()))
        else {
            return Ok(None);
        };
        Ok(self.concepts.get(concept_key).cloned())
    }
}
