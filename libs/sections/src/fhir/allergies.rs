//! FHIR AllergyIntolerance extraction
//!
//! `code` names the causative agent; reaction manifestations and severity
//! live under `reaction[]`. Every coding is resolved independently and
//! aggregated on the entry.

use crate::error::Result;
use crate::extractor::{ClinicalDocument, SectionExtractor};
use crate::fhir::{
    concept_text, date_field, expect_fhir, identify, resolve_concept, status_text,
};
use crate::model::{DataSource, NormalizedSection, SectionEntry, SectionId};
use async_trait::async_trait;
use salus_terminology::TerminologyResolver;
use serde_json::Value;
use std::sync::Arc;

pub struct FhirAllergiesExtractor {
    resolver: Arc<TerminologyResolver>,
}

impl FhirAllergiesExtractor {
    pub fn new(resolver: Arc<TerminologyResolver>) -> Self {
        Self { resolver }
    }

    async fn entry_from(&self, resource: &Value) -> Option<SectionEntry> {
        let agent = resource.get("code")?;
        let mut coded_concepts = resolve_concept(&self.resolver, agent).await;

        let display_text = coded_concepts
            .first()
            .map(|term| term.display.clone())
            .or_else(|| concept_text(agent))?;

        let mut severity = None;
        if let Some(reactions) = resource.get("reaction").and_then(Value::as_array) {
            for reaction in reactions {
                if let Some(manifestations) =
                    reaction.get("manifestation").and_then(Value::as_array)
                {
                    for manifestation in manifestations {
                        coded_concepts
                            .extend(resolve_concept(&self.resolver, manifestation).await);
                    }
                }
                if severity.is_none() {
                    severity = reaction
                        .get("severity")
                        .and_then(Value::as_str)
                        .map(str::to_string);
                }
            }
        }

        let category = resource
            .get("category")
            .and_then(Value::as_array)
            .and_then(|arr| arr.first())
            .and_then(Value::as_str)
            .map(str::to_string);

        let (entry_id, source_reference) = identify(resource, "AllergyIntolerance");

        Some(SectionEntry {
            entry_id,
            display_text,
            value_text: None,
            coded_concepts,
            clinical_status: status_text(resource, "clinicalStatus"),
            onset_date: date_field(resource, &["onsetDateTime", "onsetDate"]),
            recorded_date: date_field(resource, &["recordedDate"]),
            severity: severity.or_else(|| {
                resource
                    .get("criticality")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            }),
            category,
            source_reference,
        })
    }
}

#[async_trait]
impl SectionExtractor for FhirAllergiesExtractor {
    fn section_id(&self) -> SectionId {
        SectionId::Allergies
    }

    async fn extract(&self, document: &ClinicalDocument) -> Result<NormalizedSection> {
        let bundle = expect_fhir(document)?;
        let section_id = self.section_id();

        let mut entries = Vec::new();
        for resource in bundle.resources("AllergyIntolerance") {
            match self.entry_from(resource).await {
                Some(built) => entries.push(built),
                None => {
                    tracing::warn!(
                        section = section_id.as_str(),
                        "skipping malformed AllergyIntolerance resource"
                    );
                }
            }
        }

        Ok(NormalizedSection::build(
            section_id,
            DataSource::Fhir,
            entries,
        ))
    }
}
