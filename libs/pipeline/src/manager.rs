//! Pipeline manager
//!
//! Owns the extractor registries (one per source format, keyed by section)
//! and drives a full document pass: parse once, extract every domain
//! concurrently, assemble in section-id order. Partial-failure semantics
//! throughout: a failing extractor costs its own section and nothing else.

use futures::future::join_all;
use salus_sections::cda::{
    CdaAllergiesExtractor, CdaConditionsExtractor, CdaDocument, CdaImmunizationsExtractor,
    CdaMedicationsExtractor, CdaObservationsExtractor, CdaProceduresExtractor,
};
use salus_sections::fhir::{
    FhirAllergiesExtractor, FhirBundle, FhirConditionsExtractor, FhirImmunizationsExtractor,
    FhirMedicationsExtractor, FhirObservationsExtractor, FhirProceduresExtractor,
};
use salus_sections::{
    ClinicalDocument, DataSource, NormalizedSection, SectionExtractor, SectionId,
};
use salus_terminology::TerminologyResolver;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Aggregated output of one document pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub sections: Vec<NormalizedSection>,
    pub sections_count: usize,
    pub total_entries: usize,
}

impl PipelineResult {
    pub fn from_sections(mut sections: Vec<NormalizedSection>) -> PipelineResult {
        // Completion order is whatever the executor made of it; output
        // order is contractual.
        sections.sort_by_key(|s| s.section_id);
        let total_entries = sections.iter().map(|s| s.entries.len()).sum();
        PipelineResult {
            sections_count: sections.len(),
            total_entries,
            sections,
        }
    }

    fn empty() -> PipelineResult {
        PipelineResult::from_sections(Vec::new())
    }

    /// Section lookup by id over the sorted section list.
    pub fn section(&self, id: SectionId) -> Option<&NormalizedSection> {
        self.sections
            .binary_search_by_key(&id, |s| s.section_id)
            .ok()
            .map(|idx| &self.sections[idx])
    }
}

/// Runs all registered extractors over one document.
pub struct SectionPipeline {
    cda: BTreeMap<SectionId, Arc<dyn SectionExtractor>>,
    fhir: BTreeMap<SectionId, Arc<dyn SectionExtractor>>,
}

impl SectionPipeline {
    /// Build a pipeline with the standard extractor set for every clinical
    /// domain, all sharing one resolver (and therefore one term cache).
    pub fn new(resolver: Arc<TerminologyResolver>) -> SectionPipeline {
        let cda: Vec<Arc<dyn SectionExtractor>> = vec![
            Arc::new(CdaAllergiesExtractor::new(resolver.clone())),
            Arc::new(CdaConditionsExtractor::new(resolver.clone())),
            Arc::new(CdaImmunizationsExtractor::new(resolver.clone())),
            Arc::new(CdaMedicationsExtractor::new(resolver.clone())),
            Arc::new(CdaObservationsExtractor::new(resolver.clone())),
            Arc::new(CdaProceduresExtractor::new(resolver.clone())),
        ];
        let fhir: Vec<Arc<dyn SectionExtractor>> = vec![
            Arc::new(FhirAllergiesExtractor::new(resolver.clone())),
            Arc::new(FhirConditionsExtractor::new(resolver.clone())),
            Arc::new(FhirImmunizationsExtractor::new(resolver.clone())),
            Arc::new(FhirMedicationsExtractor::new(resolver.clone())),
            Arc::new(FhirObservationsExtractor::new(resolver.clone())),
            Arc::new(FhirProceduresExtractor::new(resolver)),
        ];

        SectionPipeline {
            cda: cda.into_iter().map(|e| (e.section_id(), e)).collect(),
            fhir: fhir.into_iter().map(|e| (e.section_id(), e)).collect(),
        }
    }

    /// Replace (or add) the extractor registered for one section of one
    /// source format. Used for profile-specific overrides and for fault
    /// injection in tests.
    pub fn with_extractor(
        mut self,
        source: DataSource,
        extractor: Arc<dyn SectionExtractor>,
    ) -> SectionPipeline {
        let registry = match source {
            DataSource::Cda => &mut self.cda,
            DataSource::Fhir => &mut self.fhir,
        };
        registry.insert(extractor.section_id(), extractor);
        self
    }

    /// Process one raw document.
    ///
    /// Always returns a result: an unparseable document yields an empty one,
    /// and an extractor that errors is logged and its section omitted while
    /// every other extractor still runs to completion.
    pub async fn process(&self, raw: &str, source_type: DataSource) -> PipelineResult {
        let document = match parse_document(raw, source_type) {
            Ok(document) => document,
            Err(error) => {
                tracing::warn!(?source_type, %error, "document failed to parse, returning empty result");
                return PipelineResult::empty();
            }
        };

        let registry = match source_type {
            DataSource::Cda => &self.cda,
            DataSource::Fhir => &self.fhir,
        };

        // Extraction across domains has no ordering dependency; run every
        // extractor concurrently against the shared parse.
        let document = &document;
        let runs = registry.values().map(|extractor| async move {
            (extractor.section_id(), extractor.extract(document).await)
        });

        let mut sections = Vec::with_capacity(registry.len());
        for (section_id, outcome) in join_all(runs).await {
            match outcome {
                Ok(section) => sections.push(section),
                Err(error) => {
                    tracing::warn!(
                        section = section_id.as_str(),
                        %error,
                        "extractor failed, omitting section"
                    );
                }
            }
        }

        PipelineResult::from_sections(sections)
    }
}

fn parse_document(
    raw: &str,
    source_type: DataSource,
) -> salus_sections::Result<ClinicalDocument> {
    match source_type {
        DataSource::Cda => Ok(ClinicalDocument::Cda(CdaDocument::parse(raw)?)),
        DataSource::Fhir => Ok(ClinicalDocument::Fhir(FhirBundle::parse(raw)?)),
    }
}
