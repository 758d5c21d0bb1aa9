//! CDA document extraction
//!
//! Sections are located by LOINC section code (template id as fallback)
//! inside the structured body; entries are the usual deeply nested
//! act/observation/substanceAdministration shapes of the EU patient-summary
//! CDA profiles. Every coded element funnels through the shared
//! source-display priority rule before the resolver sees it.

mod allergies;
mod conditions;
mod dom;
mod immunizations;
mod medications;
mod observations;
mod procedures;

pub use allergies::CdaAllergiesExtractor;
pub use conditions::CdaConditionsExtractor;
pub use dom::{CdaDocument, XmlElement};
pub use immunizations::CdaImmunizationsExtractor;
pub use medications::CdaMedicationsExtractor;
pub use observations::CdaObservationsExtractor;
pub use procedures::CdaProceduresExtractor;

use crate::dates::parse_clinical_date;
use crate::error::{ExtractError, Result};
use crate::extractor::ClinicalDocument;
use crate::model::{ClinicalCode, SectionId};
use chrono::NaiveDate;

/// Section template roots used by the EU patient-summary CDA profiles,
/// matched when a producer omits the LOINC code element.
pub(crate) fn template_root(section: SectionId) -> &'static str {
    match section {
        SectionId::Allergies => "1.3.6.1.4.1.12559.11.10.1.3.1.2.2",
        SectionId::Medications => "1.3.6.1.4.1.12559.11.10.1.3.1.2.3",
        SectionId::Immunizations => "1.3.6.1.4.1.12559.11.10.1.3.1.2.4",
        SectionId::Conditions => "1.3.6.1.4.1.12559.11.10.1.3.1.2.5",
        SectionId::Procedures => "1.3.6.1.4.1.12559.11.10.1.3.1.2.6",
        SectionId::Observations => "1.3.6.1.4.1.12559.11.10.1.3.1.2.7",
    }
}

pub(crate) fn expect_cda(document: &ClinicalDocument) -> Result<&CdaDocument> {
    match document {
        ClinicalDocument::Cda(doc) => Ok(doc),
        ClinicalDocument::Fhir(_) => Err(ExtractError::WrongFormat { expected: "CDA" }),
    }
}

/// Read a coded element (`code`, `value`, `routeCode`, …) into a
/// [`ClinicalCode`]. Elements flagged `nullFlavor` or missing the dual key
/// yield `None` and are treated as malformed by callers.
pub(crate) fn code_from(el: &XmlElement) -> Option<ClinicalCode> {
    if el.attr("nullFlavor").is_some() && el.attr("code").is_none() {
        return None;
    }
    let code = el.attr("code")?;
    let system = el.attr("codeSystem")?;

    let display = el
        .attr("displayName")
        .map(str::to_string)
        .or_else(|| {
            el.child("originalText")
                .map(|t| t.text().to_string())
                .filter(|t| !t.is_empty())
        });

    ClinicalCode::new(code, system, display)
}

/// Stable entry identifier: `root^extension` from the element's `<id>`,
/// minted when the source carries none.
pub(crate) fn entry_id(el: &XmlElement) -> String {
    let Some(id) = el.child("id") else {
        return uuid::Uuid::new_v4().to_string();
    };
    match (id.attr("root"), id.attr("extension")) {
        (Some(root), Some(ext)) => format!("{}^{}", root, ext),
        (Some(root), None) => root.to_string(),
        (None, Some(ext)) => ext.to_string(),
        (None, None) => uuid::Uuid::new_v4().to_string(),
    }
}

pub(crate) fn status_code(el: &XmlElement) -> Option<String> {
    el.child("statusCode")
        .and_then(|s| s.attr("code"))
        .map(str::to_string)
}

/// `effectiveTime` start: the `low` boundary of an interval, or the point
/// value itself.
pub(crate) fn effective_low(el: &XmlElement) -> Option<NaiveDate> {
    let time = el.child("effectiveTime")?;
    time.child("low")
        .and_then(|l| l.attr("value"))
        .or_else(|| time.attr("value"))
        .and_then(parse_clinical_date)
}

/// Narrative reference (`<text><reference value="#..."/></text>`) used as
/// the entry's pointer back into the source document.
pub(crate) fn narrative_reference(el: &XmlElement) -> Option<String> {
    el.child("text")
        .and_then(|t| t.child("reference"))
        .and_then(|r| r.attr("value"))
        .map(str::to_string)
}

/// Render a `PQ` quantity ("500 mg") from `@value`/`@unit`.
pub(crate) fn quantity_text(el: &XmlElement) -> Option<String> {
    let value = el.attr("value")?;
    match el.attr("unit").filter(|u| *u != "1") {
        Some(unit) => Some(format!("{} {}", value, unit)),
        None => Some(value.to_string()),
    }
}
