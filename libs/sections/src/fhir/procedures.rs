//! FHIR Procedure extraction

use crate::error::Result;
use crate::extractor::{ClinicalDocument, SectionExtractor};
use crate::fhir::{
    concept_text, date_field, expect_fhir, identify, period_start, resolve_concept, status_text,
};
use crate::model::{DataSource, NormalizedSection, SectionEntry, SectionId};
use async_trait::async_trait;
use salus_terminology::TerminologyResolver;
use serde_json::Value;
use std::sync::Arc;

pub struct FhirProceduresExtractor {
    resolver: Arc<TerminologyResolver>,
}

impl FhirProceduresExtractor {
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

        let (entry_id, source_reference) = identify(resource, "Procedure");

        Some(SectionEntry {
            entry_id,
            display_text,
            value_text: None,
            coded_concepts,
            clinical_status: status_text(resource, "status"),
            onset_date: date_field(resource, &["performedDateTime"])
                .or_else(|| period_start(resource, "performedPeriod")),
            recorded_date: None,
            severity: None,
            category: resource.get("category").and_then(concept_text),
            source_reference,
        })
    }
}

#[async_trait]
impl SectionExtractor for FhirProceduresExtractor {
    fn section_id(&self) -> SectionId {
        SectionId::Procedures
    }

    async fn extract(&self, document: &ClinicalDocument) -> Result<NormalizedSection> {
        let bundle = expect_fhir(document)?;
        let section_id = self.section_id();

        let mut entries = Vec::new();
        for resource in bundle.resources("Procedure") {
            match self.entry_from(resource).await {
                Some(built) => entries.push(built),
                None => {
                    tracing::warn!(
                        section = section_id.as_str(),
                        "skipping malformed Procedure resource"
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
