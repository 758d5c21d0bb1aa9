//! FHIR MedicationStatement / MedicationRequest extraction

use crate::error::Result;
use crate::extractor::{ClinicalDocument, SectionExtractor};
use crate::fhir::{
    concept_text, date_field, expect_fhir, identify, period_start, quantity_text,
    resolve_concept, status_text,
};
use crate::model::{DataSource, NormalizedSection, SectionEntry, SectionId};
use async_trait::async_trait;
use salus_terminology::TerminologyResolver;
use serde_json::Value;
use std::sync::Arc;

pub struct FhirMedicationsExtractor {
    resolver: Arc<TerminologyResolver>,
}

impl FhirMedicationsExtractor {
    pub fn new(resolver: Arc<TerminologyResolver>) -> Self {
        Self { resolver }
    }

    async fn entry_from(&self, resource: &Value, resource_type: &str) -> Option<SectionEntry> {
        let medication = resource.get("medicationCodeableConcept")?;
        let mut coded_concepts = resolve_concept(&self.resolver, medication).await;

        let display_text = coded_concepts
            .first()
            .map(|term| term.display.clone())
            .or_else(|| concept_text(medication))?;

        // Route and dose come from the first dosage element
        // (`dosage` on statements, `dosageInstruction` on requests).
        let dosage = resource
            .get("dosage")
            .or_else(|| resource.get("dosageInstruction"))
            .and_then(Value::as_array)
            .and_then(|arr| arr.first());

        let mut value_text = None;
        if let Some(dosage) = dosage {
            if let Some(route) = dosage.get("route") {
                coded_concepts.extend(resolve_concept(&self.resolver, route).await);
            }
            value_text = dosage
                .get("doseAndRate")
                .and_then(Value::as_array)
                .and_then(|arr| arr.first())
                .and_then(|dr| dr.get("doseQuantity"))
                .and_then(quantity_text);
        }

        let (entry_id, source_reference) = identify(resource, resource_type);

        Some(SectionEntry {
            entry_id,
            display_text,
            value_text,
            coded_concepts,
            clinical_status: status_text(resource, "status"),
            onset_date: date_field(resource, &["effectiveDateTime"])
                .or_else(|| period_start(resource, "effectivePeriod")),
            recorded_date: date_field(resource, &["dateAsserted", "authoredOn"]),
            severity: None,
            category: None,
            source_reference,
        })
    }
}

#[async_trait]
impl SectionExtractor for FhirMedicationsExtractor {
    fn section_id(&self) -> SectionId {
        SectionId::Medications
    }

    async fn extract(&self, document: &ClinicalDocument) -> Result<NormalizedSection> {
        let bundle = expect_fhir(document)?;
        let section_id = self.section_id();

        let mut entries = Vec::new();
        for resource_type in ["MedicationStatement", "MedicationRequest"] {
            for resource in bundle.resources(resource_type) {
                match self.entry_from(resource, resource_type).await {
                    Some(built) => entries.push(built),
                    None => {
                        tracing::warn!(
                            section = section_id.as_str(),
                            resource_type,
                            "skipping malformed medication resource"
                        );
                    }
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
