//! Resolved term with provenance

use serde::Serialize;

/// Where a display string came from.
///
/// Carried on every resolution result for audit/debugging; `Fallback` marks
/// a code the catalogue could not resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Provenance {
    SourceDisplay,
    Translation,
    DefaultDisplay,
    Fallback,
}

/// A clinical code with displayable text.
///
/// `display` is never empty and never contains raw markup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTerm {
    pub code: String,
    pub code_system_oid: String,
    pub display: String,
    pub provenance: Provenance,
}

impl ResolvedTerm {
    /// Whether the catalogue (or the source document) produced the display,
    /// as opposed to the synthetic fallback string.
    pub fn is_resolved(&self) -> bool {
        self.provenance != Provenance::Fallback
    }
}
