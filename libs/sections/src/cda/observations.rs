//! CDA diagnostic results (LOINC 30954-2)
//!
//! Result entries arrive either as `organizer` batteries with component
//! observations or as bare `observation` entries; both shapes flatten to
//! one entry per observation.

use crate::cda::{
    code_from, effective_low, entry_id, expect_cda, narrative_reference, quantity_text,
    status_code, template_root, XmlElement,
};
use crate::error::Result;
use crate::extractor::{resolve_code, ClinicalDocument, SectionExtractor};
use crate::model::{DataSource, NormalizedSection, SectionEntry, SectionId};
use async_trait::async_trait;
use salus_terminology::TerminologyResolver;
use std::sync::Arc;

pub struct CdaObservationsExtractor {
    resolver: Arc<TerminologyResolver>,
}

impl CdaObservationsExtractor {
    pub fn new(resolver: Arc<TerminologyResolver>) -> Self {
        Self { resolver }
    }

    async fn entry_from(&self, observation: &XmlElement) -> Option<SectionEntry> {
        let test = observation.child("code").and_then(code_from)?;
        let mut coded_concepts = vec![resolve_code(&self.resolver, &test).await];

        // The value is either a physical quantity, a coded result, or plain
        // text; whichever it is ends up as displayable result text.
        let mut value_text = None;
        if let Some(value) = observation.child("value") {
            if let Some(quantity) = quantity_text(value) {
                value_text = Some(quantity);
            } else if let Some(coded) = code_from(value) {
                let term = resolve_code(&self.resolver, &coded).await;
                value_text = Some(term.display.clone());
                coded_concepts.push(term);
            } else if !value.text().is_empty() {
                value_text = Some(value.text().to_string());
            }
        }

        Some(SectionEntry {
            entry_id: entry_id(observation),
            display_text: coded_concepts[0].display.clone(),
            value_text,
            coded_concepts,
            clinical_status: status_code(observation),
            onset_date: effective_low(observation),
            recorded_date: None,
            severity: None,
            category: None,
            source_reference: narrative_reference(observation),
        })
    }
}

#[async_trait]
impl SectionExtractor for CdaObservationsExtractor {
    fn section_id(&self) -> SectionId {
        SectionId::Observations
    }

    async fn extract(&self, document: &ClinicalDocument) -> Result<NormalizedSection> {
        let doc = expect_cda(document)?;
        let section_id = self.section_id();

        let Some(section) = doc.section(section_id.loinc_code(), template_root(section_id)) else {
            return Ok(NormalizedSection::empty(section_id, DataSource::Cda));
        };

        let mut observations: Vec<&XmlElement> = Vec::new();
        for entry in section.children("entry") {
            if let Some(organizer) = entry.child("organizer") {
                observations.extend(
                    organizer
                        .children("component")
                        .filter_map(|c| c.child("observation")),
                );
            } else if let Some(observation) = entry.child("observation") {
                observations.push(observation);
            }
        }

        let mut entries = Vec::new();
        for observation in observations {
            match self.entry_from(observation).await {
                Some(built) => entries.push(built),
                None => {
                    tracing::warn!(section = section_id.as_str(), "skipping malformed CDA entry");
                }
            }
        }

        Ok(NormalizedSection::build(
            section_id,
            DataSource::Cda,
            entries,
        ))
    }
}
