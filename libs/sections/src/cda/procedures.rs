//! CDA procedures (LOINC 47519-4)

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

pub struct CdaProceduresExtractor {
    resolver: Arc<TerminologyResolver>,
}

impl CdaProceduresExtractor {
    pub fn new(resolver: Arc<TerminologyResolver>) -> Self {
        Self { resolver }
    }

    async fn entry_from(&self, entry: &XmlElement) -> Option<SectionEntry> {
        let procedure = entry.child("procedure")?;
        let code = procedure.child("code").and_then(code_from)?;

        let coded_concepts = vec![resolve_code(&self.resolver, &code).await];

        Some(SectionEntry {
            entry_id: entry_id(procedure),
            display_text: coded_concepts[0].display.clone(),
            value_text: None,
            coded_concepts,
            clinical_status: status_code(procedure),
            onset_date: effective_low(procedure),
            recorded_date: None,
            severity: None,
            category: None,
            source_reference: narrative_reference(procedure),
        })
    }
}

#[async_trait]
impl SectionExtractor for CdaProceduresExtractor {
    fn section_id(&self) -> SectionId {
        SectionId::Procedures
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
