//! Canonical, source-agnostic section model
//!
//! The structures here are the engine's output contract. Both extractor
//! families emit them with the identical field set, so rendering never needs
//! to know which wire format a fact arrived through. Serialization keeps
//! every key present (absent values serialize as `null`) to preserve that
//! schema parity on the JSON surface as well.

use chrono::NaiveDate;
use salus_terminology::ResolvedTerm;
use serde::Serialize;

/// The clinical domains the engine normalizes.
///
/// Variants are declared in section-id order; the pipeline's deterministic
/// output ordering derives from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionId {
    Allergies,
    Conditions,
    Immunizations,
    Medications,
    Observations,
    Procedures,
}

impl SectionId {
    pub fn all() -> [SectionId; 6] {
        [
            SectionId::Allergies,
            SectionId::Conditions,
            SectionId::Immunizations,
            SectionId::Medications,
            SectionId::Observations,
            SectionId::Procedures,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionId::Allergies => "allergies",
            SectionId::Conditions => "conditions",
            SectionId::Immunizations => "immunizations",
            SectionId::Medications => "medications",
            SectionId::Observations => "observations",
            SectionId::Procedures => "procedures",
        }
    }

    /// Canonical section title shown by presentation layers.
    pub fn title(&self) -> &'static str {
        match self {
            SectionId::Allergies => "Allergies and Intolerances",
            SectionId::Conditions => "Current Problems",
            SectionId::Immunizations => "Immunizations",
            SectionId::Medications => "Medication Summary",
            SectionId::Observations => "Diagnostic Results",
            SectionId::Procedures => "Procedures",
        }
    }

    /// LOINC code identifying this section in CDA documents.
    pub fn loinc_code(&self) -> &'static str {
        match self {
            SectionId::Allergies => "48765-2",
            SectionId::Conditions => "11450-4",
            SectionId::Immunizations => "11369-6",
            SectionId::Medications => "10160-0",
            SectionId::Observations => "30954-2",
            SectionId::Procedures => "47519-4",
        }
    }

    /// Column keys rendered for this domain. Shared by both extractor
    /// families so the table shape cannot diverge per source format.
    pub fn columns(&self) -> Vec<String> {
        let keys: &[&str] = match self {
            SectionId::Allergies => &["agent", "reaction", "severity", "status", "onset"],
            SectionId::Conditions => &["problem", "status", "severity", "onset"],
            SectionId::Immunizations => &["vaccine", "status", "date"],
            SectionId::Medications => &["medication", "route", "dose", "status", "start"],
            SectionId::Observations => &["test", "result", "date"],
            SectionId::Procedures => &["procedure", "status", "date"],
        };
        keys.iter().map(|k| k.to_string()).collect()
    }

    pub fn display_config(&self) -> DisplayConfig {
        let (primary_column, empty_message) = match self {
            SectionId::Allergies => ("agent", "No known allergies recorded"),
            SectionId::Conditions => ("problem", "No problems recorded"),
            SectionId::Immunizations => ("vaccine", "No immunizations recorded"),
            SectionId::Medications => ("medication", "No medications recorded"),
            SectionId::Observations => ("test", "No results recorded"),
            SectionId::Procedures => ("procedure", "No procedures recorded"),
        };
        DisplayConfig {
            primary_column: primary_column.to_string(),
            empty_message: empty_message.to_string(),
        }
    }
}

/// Which wire format a section was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataSource {
    Cda,
    Fhir,
}

/// Rendering hints attached to every section.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayConfig {
    pub primary_column: String,
    pub empty_message: String,
}

/// A coded value exactly as found in the source document.
///
/// Immutable once parsed: the dual key (`code`, `code_system_oid`) is what
/// the resolver and any audit trail operate on, so nothing may rewrite it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalCode {
    code: String,
    code_system_oid: String,
    source_display: Option<String>,
}

impl ClinicalCode {
    /// Build a code from source fields. Returns `None` when the code or the
    /// system identifier is blank; such elements count as malformed and are
    /// skipped by extractors.
    pub fn new(
        code: impl Into<String>,
        code_system_id: impl Into<String>,
        source_display: Option<String>,
    ) -> Option<ClinicalCode> {
        let code = code.into().trim().to_string();
        let system = code_system_id.into().trim().to_string();
        if code.is_empty() || system.is_empty() {
            return None;
        }
        Some(ClinicalCode {
            code,
            code_system_oid: salus_terminology::registry::normalize_system_id(&system),
            source_display,
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn code_system_oid(&self) -> &str {
        &self.code_system_oid
    }

    pub fn source_display(&self) -> Option<&str> {
        self.source_display.as_deref()
    }
}

/// One clinical fact inside a section.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionEntry {
    pub entry_id: String,
    pub display_text: String,
    /// Free-standing measured or administered value ("7.2 mmol/L",
    /// "500 mg"); null for domains without one.
    pub value_text: Option<String>,
    pub coded_concepts: Vec<ResolvedTerm>,
    pub clinical_status: Option<String>,
    pub onset_date: Option<NaiveDate>,
    pub recorded_date: Option<NaiveDate>,
    pub severity: Option<String>,
    pub category: Option<String>,
    pub source_reference: Option<String>,
}

/// A fully normalized clinical section.
///
/// Constructed through [`NormalizedSection::build`] only, which derives the
/// aggregate fields; extractors cannot produce structurally divergent
/// sections.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedSection {
    pub section_id: SectionId,
    pub title: String,
    pub section_code: String,
    pub has_entries: bool,
    pub entries: Vec<SectionEntry>,
    pub columns: Vec<String>,
    pub display_config: DisplayConfig,
    pub coded_concepts: Vec<ResolvedTerm>,
    pub is_coded_section: bool,
    pub data_source: DataSource,
}

impl NormalizedSection {
    pub fn build(
        section_id: SectionId,
        data_source: DataSource,
        entries: Vec<SectionEntry>,
    ) -> NormalizedSection {
        let coded_concepts: Vec<ResolvedTerm> = entries
            .iter()
            .flat_map(|e| e.coded_concepts.iter().cloned())
            .collect();

        NormalizedSection {
            section_id,
            title: section_id.title().to_string(),
            section_code: section_id.loinc_code().to_string(),
            has_entries: !entries.is_empty(),
            entries,
            columns: section_id.columns(),
            display_config: section_id.display_config(),
            is_coded_section: !coded_concepts.is_empty(),
            coded_concepts,
            data_source,
        }
    }

    /// An empty section for a document that carries no data for this domain.
    pub fn empty(section_id: SectionId, data_source: DataSource) -> NormalizedSection {
        NormalizedSection::build(section_id, data_source, Vec::new())
    }
}
