//! FHIR R4 Bundle extraction
//!
//! Resources are located by `resourceType` inside the Bundle's entries and
//! mapped field by field into the canonical section shape. Every element of
//! a `coding` array is resolved independently; system URIs normalize onto
//! the same dual key the CDA side derives from OIDs.

mod allergies;
mod bundle;
mod conditions;
mod immunizations;
mod medications;
mod observations;
mod procedures;

pub use allergies::FhirAllergiesExtractor;
pub use bundle::FhirBundle;
pub use conditions::FhirConditionsExtractor;
pub use immunizations::FhirImmunizationsExtractor;
pub use medications::FhirMedicationsExtractor;
pub use observations::FhirObservationsExtractor;
pub use procedures::FhirProceduresExtractor;

use crate::dates::parse_clinical_date;
use crate::error::{ExtractError, Result};
use crate::extractor::{resolve_code, ClinicalDocument};
use crate::model::ClinicalCode;
use chrono::NaiveDate;
use salus_terminology::{ResolvedTerm, TerminologyResolver};
use serde_json::Value;

pub(crate) fn expect_fhir(document: &ClinicalDocument) -> Result<&FhirBundle> {
    match document {
        ClinicalDocument::Fhir(bundle) => Ok(bundle),
        ClinicalDocument::Cda(_) => Err(ExtractError::WrongFormat { expected: "FHIR" }),
    }
}

/// Read a CodeableConcept's `coding` array into [`ClinicalCode`]s. Codings
/// missing the dual key are dropped.
pub(crate) fn codings(concept: &Value) -> Vec<ClinicalCode> {
    let Some(arr) = concept.get("coding").and_then(Value::as_array) else {
        return Vec::new();
    };

    arr.iter()
        .filter_map(|coding| {
            let code = coding.get("code").and_then(Value::as_str)?;
            let system = coding.get("system").and_then(Value::as_str)?;
            let display = coding
                .get("display")
                .and_then(Value::as_str)
                .map(str::to_string);
            ClinicalCode::new(code, system, display)
        })
        .collect()
}

/// Resolve every coding of a CodeableConcept independently.
pub(crate) async fn resolve_concept(
    resolver: &TerminologyResolver,
    concept: &Value,
) -> Vec<ResolvedTerm> {
    let mut terms = Vec::new();
    for code in codings(concept) {
        terms.push(resolve_code(resolver, &code).await);
    }
    terms
}

/// The CodeableConcept's free-text label, if any.
pub(crate) fn concept_text(concept: &Value) -> Option<String> {
    concept
        .get("text")
        .and_then(Value::as_str)
        .and_then(salus_terminology::clean_display)
}

/// Status fields come in two shapes: a plain code string (`status`) or a
/// CodeableConcept (`clinicalStatus`); both reduce to the code.
pub(crate) fn status_text(resource: &Value, field: &str) -> Option<String> {
    let value = resource.get(field)?;
    if let Some(code) = value.as_str() {
        return Some(code.to_string());
    }
    value
        .get("coding")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
        .and_then(|coding| coding.get("code"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// First parseable date among the given fields.
pub(crate) fn date_field(resource: &Value, fields: &[&str]) -> Option<NaiveDate> {
    fields
        .iter()
        .filter_map(|f| resource.get(*f).and_then(Value::as_str))
        .find_map(parse_clinical_date)
}

/// Start of a `Period`-typed field.
pub(crate) fn period_start(resource: &Value, field: &str) -> Option<NaiveDate> {
    resource
        .get(field)
        .and_then(|p| p.get("start"))
        .and_then(Value::as_str)
        .and_then(parse_clinical_date)
}

/// Entry identifier and source reference from the resource's logical id.
pub(crate) fn identify(resource: &Value, resource_type: &str) -> (String, Option<String>) {
    match resource.get("id").and_then(Value::as_str) {
        Some(id) => (
            id.to_string(),
            Some(format!("{}/{}", resource_type, id)),
        ),
        None => (uuid::Uuid::new_v4().to_string(), None),
    }
}

/// Render a `Quantity` ("7.2 mmol/L") from `value`/`unit`/`code`.
pub(crate) fn quantity_text(quantity: &Value) -> Option<String> {
    let value = quantity.get("value")?;
    let rendered = if let Some(n) = value.as_f64() {
        // Trim the trailing ".0" serde_json gives round floats.
        if n.fract() == 0.0 && n.abs() < 1e15 {
            format!("{}", n as i64)
        } else {
            format!("{}", n)
        }
    } else {
        value.as_str()?.to_string()
    };

    let unit = quantity
        .get("unit")
        .or_else(|| quantity.get("code"))
        .and_then(Value::as_str);

    Some(match unit {
        Some(unit) if unit != "1" => format!("{} {}", rendered, unit),
        _ => rendered,
    })
}
