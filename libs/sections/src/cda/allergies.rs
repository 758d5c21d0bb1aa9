//! CDA allergies and intolerances (LOINC 48765-2)
//!
//! Entry shape: `entry/act/entryRelationship/observation`, with the
//! causative agent under `participant/participantRole/playingEntity/code`,
//! reaction manifestations under `entryRelationship[@typeCode=MFST]`, and
//! severity in a nested observation coded `SEV`.

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

pub struct CdaAllergiesExtractor {
    resolver: Arc<TerminologyResolver>,
}

impl CdaAllergiesExtractor {
    pub fn new(resolver: Arc<TerminologyResolver>) -> Self {
        Self { resolver }
    }

    async fn entry_from(&self, entry: &XmlElement) -> Option<SectionEntry> {
        let act = entry.child("act")?;
        let observation = act
            .children("entryRelationship")
            .find_map(|rel| rel.child("observation"))?;

        let agent = observation
            .child("participant")
            .and_then(|p| p.path(&["participantRole", "playingEntity"]))
            .and_then(|pe| pe.child("code"))
            .and_then(code_from);
        let propensity = observation.child("value").and_then(code_from);

        // An allergy entry with neither an agent nor a propensity code
        // carries nothing renderable.
        if agent.is_none() && propensity.is_none() {
            return None;
        }

        let mut coded_concepts = Vec::new();
        if let Some(code) = &agent {
            coded_concepts.push(resolve_code(&self.resolver, code).await);
        }
        if let Some(code) = &propensity {
            coded_concepts.push(resolve_code(&self.resolver, code).await);
        }

        for rel in observation.children("entryRelationship") {
            if rel.attr("typeCode") != Some("MFST") {
                continue;
            }
            let Some(manifestation) = rel
                .child("observation")
                .and_then(|o| o.child("value"))
                .and_then(|v| code_from(v))
            else {
                continue;
            };
            coded_concepts.push(resolve_code(&self.resolver, &manifestation).await);
        }

        let severity = match severity_code(observation) {
            Some(code) => Some(resolve_code(&self.resolver, &code).await.display),
            None => None,
        };

        let display_text = coded_concepts
            .first()
            .map(|term| term.display.clone())
            .unwrap_or_default();

        Some(SectionEntry {
            entry_id: entry_id(act),
            display_text,
            value_text: None,
            coded_concepts,
            clinical_status: status_code(act),
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
impl SectionExtractor for CdaAllergiesExtractor {
    fn section_id(&self) -> SectionId {
        SectionId::Allergies
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
