//! Extractor interface
//!
//! One implementation per (clinical domain × source format) pair, dispatched
//! through a registry map rather than inheritance. Each implementation walks
//! its source elements, applies the source-display priority rule per code,
//! and emits the canonical [`NormalizedSection`] shape.

use crate::cda::CdaDocument;
use crate::error::Result;
use crate::fhir::FhirBundle;
use crate::model::{ClinicalCode, NormalizedSection, SectionId};
use async_trait::async_trait;
use salus_terminology::{clean_display, Provenance, ResolvedTerm, TerminologyResolver};

/// A parsed source document, tagged by format.
///
/// Parsing happens exactly once per pipeline run; the parsed tree is shared
/// by every extractor working the document.
pub enum ClinicalDocument {
    Cda(CdaDocument),
    Fhir(FhirBundle),
}

/// Contract implemented once per clinical domain and source format.
#[async_trait]
pub trait SectionExtractor: Send + Sync {
    fn section_id(&self) -> SectionId;

    /// Extract this domain's section from the document.
    ///
    /// A document that simply carries no data for the domain yields an empty
    /// section; `Err` is reserved for genuine failures (wrong document
    /// format handed in, structurally unusable tree). Malformed individual
    /// entries are skipped and logged, never escalated.
    async fn extract(&self, document: &ClinicalDocument) -> Result<NormalizedSection>;
}

/// The display priority rule, applied for every embedded code.
///
/// A non-blank source display wins verbatim (after sanitization) and the
/// resolver is not consulted; the resolver only serves codes the source
/// left blank. This is the single canonical order for both source formats.
pub async fn resolve_code(resolver: &TerminologyResolver, code: &ClinicalCode) -> ResolvedTerm {
    if let Some(display) = code.source_display().and_then(clean_display) {
        return ResolvedTerm {
            code: code.code().to_string(),
            code_system_oid: code.code_system_oid().to_string(),
            display,
            provenance: Provenance::SourceDisplay,
        };
    }

    resolver.resolve(code.code(), code.code_system_oid()).await
}
