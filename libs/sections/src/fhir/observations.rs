//! FHIR Observation extraction
//!
//! The result value is polymorphic (`valueQuantity`, `valueCodeableConcept`,
//! `valueString`); whichever variant is present reduces to displayable
//! result text, and coded results additionally join the entry's concepts.

use crate::error::Result;
use crate::extractor::{ClinicalDocument, SectionExtractor};
use crate::fhir::{
    concept_text, date_field, expect_fhir, identify, quantity_text, resolve_concept, status_text,
};
use crate::model::{DataSource, NormalizedSection, SectionEntry, SectionId};
use async_trait::async_trait;
use salus_terminology::TerminologyResolver;
use serde_json::Value;
use std::sync::Arc;

pub struct FhirObservationsExtractor {
    resolver: Arc<TerminologyResolver>,
}

impl FhirObservationsExtractor {
    pub fn new(resolver: Arc<TerminologyResolver>) -> Self {
        Self { resolver }
    }

    async fn entry_from(&self, resource: &Value) -> Option<SectionEntry> {
        let code = resource.get("code")?;
        let mut coded_concepts = resolve_concept(&self.resolver, code).await;

        let display_text = coded_concepts
            .first()
            .map(|term| term.display.clone())
            .or_else(|| concept_text(code))?;

        let mut value_text = None;
        if let Some(quantity) = resource.get("valueQuantity") {
            value_text = quantity_text(quantity);
        } else if let Some(concept) = resource.get("valueCodeableConcept") {
            let terms = resolve_concept(&self.resolver, concept).await;
            value_text = terms
                .first()
                .map(|term| term.display.clone())
                .or_else(|| concept_text(concept));
            coded_concepts.extend(terms);
        } else if let Some(text) = resource.get("valueString").and_then(Value::as_str) {
            value_text = salus_terminology::clean_display(text);
        }

        let category = resource
            .get("category")
            .and_then(Value::as_array)
            .and_then(|arr| arr.first())
            .and_then(concept_text);

        let (entry_id, source_reference) = identify(resource, "Observation");

        Some(SectionEntry {
            entry_id,
            display_text,
            value_text,
            coded_concepts,
            clinical_status: status_text(resource, "status"),
            onset_date: date_field(resource, &["effectiveDateTime"]),
            recorded_date: date_field(resource, &["issued"]),
            severity: None,
            category,
            source_reference,
        })
    }
}

#[async_trait]
impl SectionExtractor for FhirObservationsExtractor {
    fn section_id(&self) -> SectionId {
        SectionId::Observations
    }

    async fn extract(&self, document: &ClinicalDocument) -> Result<NormalizedSection> {
        let bundle = expect_fhir(document)?;
        let section_id = self.section_id();

        let mut entries = Vec::new();
        for resource in bundle.resources("Observation") {
            match self.entry_from(resource).await {
                Some(built) => entries.push(built),
                None => {
                    tracing::warn!(
                        section = section_id.as_str(),
                        "skipping malformed Observation resource"
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
