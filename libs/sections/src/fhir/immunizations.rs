//! FHIR Immunization extraction

use crate::error::Result;
use crate::extractor::{ClinicalDocument, SectionExtractor};
use crate::fhir::{concept_text, date_field, expect_fhir, identify, resolve_concept, status_text};
use crate::model::{DataSource, NormalizedSection, SectionEntry, SectionId};
use async_trait::async_trait;
use salus_terminology::TerminologyResolver;
use serde_json::Value;
use std::sync::Arc;

pub struct FhirImmunizationsExtractor {
    resolver: Arc<TerminologyResolver>,
}

impl FhirImmunizationsExtractor {
    pub fn new(resolver: Arc<TerminologyResolver>) -> Self {
        Self { resolver }
    }

    async fn entry_from(&self, resource: &Value) -> Option<SectionEntry> {
        let vaccine = resource.get("vaccineCode")?;
        let coded_concepts = resolve_concept(&self.resolver, vaccine).await;

        let display_text = coded_concepts
            .first()
            .map(|term| term.display.clone())
            .or_else(|| concept_text(vaccine))?;

        let (entry_id, source_reference) = identify(resource, "Immunization");

        Some(SectionEntry {
            entry_id,
            display_text,
            value_text: None,
            coded_concepts,
            clinical_status: status_text(resource, "status"),
            onset_date: date_field(resource, &["occurrenceDateTime"]),
            recorded_date: date_field(resource, &["recorded"]),
            severity: None,
            category: None,
            source_reference,
        })
    }
}

#[async_trait]
impl SectionExtractor for FhirImmunizationsExtractor {
    fn section_id(&self) -> SectionId {
        SectionId::Immunizations
    }

    async fn extract(&self, document: &ClinicalDocument) -> Result<NormalizedSection> {
        let bundle = expect_fhir(document)?;
        let section_id = self.section_id();

        let mut entries = Vec::new();
        for resource in bundle.resources("Immunization") {
            match self.entry_from(resource).await {
                Some(built) => entries.push(built),
                None => {
                    tracing::warn!(
                        section = section_id.as_str(),
                        "skipping malformed Immunization resource"
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
