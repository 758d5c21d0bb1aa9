//! CDA immunizations (LOINC 11369-6)

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

pub struct CdaImmunizationsExtractor {
    resolver: Arc<TerminologyResolver>,
}

impl CdaImmunizationsExtractor {
    pub fn new(resolver: Arc<TerminologyResolver>) -> Self {
        Self { resolver }
    }

    async fn entry_from(&self, entry: &XmlElement) -> Option<SectionEntry> {
        let administration = entry.child("substanceAdministration")?;
        let vaccine = administration
            .child("consumable")
            .and_then(|c| c.path(&["manufacturedProduct", "manufacturedMaterial"]))
            .and_then(|m| m.child("code"))
            .and_then(code_from)?;

        let coded_concepts = vec![resolve_code(&self.resolver, &vaccine).await];

        Some(SectionEntry {
            entry_id: entry_id(administration),
            display_text: coded_concepts[0].display.clone(),
            value_text: None,
            coded_concepts,
            clinical_status: status_code(administration),
            onset_date: effective_low(administration),
            recorded_date: None,
            severity: None,
            category: None,
            source_reference: narrative_reference(administration),
        })
    }
}

#[async_trait]
impl SectionExtractor for CdaImmunizationsExtractor {
    fn section_id(&self) -> SectionId {
        SectionId::Immunizations
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
