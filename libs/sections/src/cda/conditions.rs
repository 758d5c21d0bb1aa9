//! CDA current problems (LOINC 11450-4)
//!
//! Problem entries mirror the allergy shape: a problem-concern `act`
//! wrapping a problem `observation` whose `value` carries the condition
//! code.

use crate::cda::{
    code_from, effective_low, entry_id, expect_cda, narrative_reference, status_code,
    template_root, XmlElement,
};
use crate::error::Result;
use crate::extractor::{resolve_code, ClinicalDocument, SectionExtractor};
use crate::model::{DataSource, NormalizedSection, SectionEntry, SectionId};
use async_trait::async_trait;
use salus_terminology::TerminologyResolver;
use std::sync::Arc;

pub struct CdaConditionsExtractor {
    resolver: Arc<TerminologyResolver>,
}

impl CdaConditionsExtractor {
    pub fn new(resolver: Arc<TerminologyResolver>) -> Self {
        Self { resolver }
    }

    async fn entry_from(&self, entry: &XmlElement) -> Option<SectionEntry> {
        let act = entry.child("act")?;
        let observation = act
            .children("entryRelationship")
            .find_map(|rel| rel.child("observation"))?;

        let problem = observation.child("value").and_then(code_from)?;
        let mut coded_concepts = vec![resolve_code(&self.resolver, &problem).await];

        // Some producers add the observation's own code (problem type) as a
        // secondary concept.
        if let Some(kind) = observation.child("code").and_then(code_from) {
            coded_concepts.push(resolve_code(&self.resolver, &kind).await);
        }

        let severity = match severity_code(observation) {
            Some(code) => Some(resolve_code(&self.resolver, &code).await.display),
            None => None,
        };

        Some(SectionEntry {
            entry_id: entry_id(act),
            display_text: coded_concepts[0].display.clone(),
            value_text: None,
            coded_concepts,
            clinical_status: status_code(act).or_else(|| status_code(observation)),
            onset_date: effective_low(observation).or_else(|| effective_low(act)),
            recorded_date: None,
            severity,
            category: None,
            source_reference: narrative_reference(observation),
        })
    }
}

fn severity_code(observation: &XmlElement) -> Option<crate::model::ClinicalCode> {
    observation
        .children("entryRelationship")
        .filter_map(|rel| rel.child("observation"))
        .find(|obs| {
            obs.child("code")
                .and_then(|c| c.attr("code"))
                .is_some_and(|c| c == "SEV")
        })
        .and_then(|obs| obs.child("value"))
        .and_then(code_from)
}

#[async_trait]
impl SectionExtractor for CdaConditionsExtractor {
    fn section_id(&self) -> SectionId {
        SectionId::Conditions
    }

    async fn extract(&self, document: &ClinicalDocument) -> Result<NormalizedSection> {
        let doc = expect_cda(document)?;
        let section_id = self.section_id();

        let Some(section) = doc.section(section_id.loinc_code(), template_root(section_id)) else {
            return Ok(NormalizedSection::empty(section_id, DataSource::Cda));
        };

        let mut entries = Vec::new();
        for entry in section.children("entry") {
            match self.entry_from(entry).await {
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
