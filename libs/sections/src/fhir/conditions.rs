//! FHIR Condition extraction

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

pub struct FhirConditionsExtractor {
    resolver: Arc<TerminologyResolver>,
}

impl FhirConditionsExtractor {
    pub fn new(resolver: Arc<TerminologyResolver>) -> Self {
        Self { resolver }
    }

    async fn entry_from(&self, resource: &Value) -> Option<SectionEntry> {
        let code = resource.get("code")?;
        let coded_concepts = resolve_concept(&self.resolver, code).await;

        let display_text = coded_concepts
            .first()
            .map(|term| term.display.clone())
            .or_else(|| concept_text(code))?;

        let severity = match resource.get("severity") {
            Some(concept) => resolve_concept(&self.resolver, concept)
                .await
                .first()
                .map(|term| term.display.clone())
                .or_else(|| concept_text(concept)),
            None => None,
        };

        let category = resource
            .get("category")
            .and_then(Value::as_array)
            .and_then(|arr| arr.first())
            .and_then(concept_text);

        let (entry_id, source_reference) = identify(resource, "Condition");

        Some(SectionEntry {
            entry_id,
            display_text,
            value_text: None,
            coded_concepts,
            clinical_status: status_text(resource, "clinicalStatus"),
            onset_date: date_field(resource, &["onsetDateTime", "onsetDate"]),
            recorded_date: date_field(resource, &["recordedDate"]),
            severity,
            category,
            source_reference,
        })
    }
}

#[async_trait]
impl SectionExtractor for FhirConditionsExtractor {
    fn section_id(&self) -> SectionId {
        SectionId::Conditions
    }

    async fn extract(&self, document: &ClinicalDocument) -> Result<NormalizedSection> {
        let bundle = expect_fhir(document)?;
        let section_id = self.section_id();

        let mut entries = Vec::new();
        for resource in bundle.resources("Condition") {
            match self.entry_from(resource).await {
                Some(built) => entries.push(built),
                None => {
                    tracing::warn!(
                        section = section_id.as_str(),
                        "skipping malformed Condition resource"
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
