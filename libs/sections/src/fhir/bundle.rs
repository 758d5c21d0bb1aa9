//! FHIR Bundle wrapper

use crate::error::{ExtractError, Result};
use serde_json::Value;

/// A parsed FHIR R4 Bundle.
///
/// Holds the raw JSON tree; extractors navigate it directly rather than
/// deserializing into typed resources, because source systems populate the
/// resources too inconsistently for rigid models to survive contact.
#[derive(Debug)]
pub struct FhirBundle {
    root: Value,
}

impl FhirBundle {
    pub fn parse(input: &str) -> Result<FhirBundle> {
        FhirBundle::from_value(serde_json::from_str(input)?)
    }

    pub fn from_value(value: Value) -> Result<FhirBundle> {
        let obj = value.as_object().ok_or(ExtractError::ExpectedObject)?;
        let resource_type = obj
            .get("resourceType")
            .and_then(Value::as_str)
            .ok_or(ExtractError::MissingResourceType)?;
        if resource_type != "Bundle" {
            return Err(ExtractError::NotABundle(resource_type.to_string()));
        }
        Ok(FhirBundle { root: value })
    }

    /// All entry resources of the given type, in bundle order.
    pub fn resources(&self, resource_type: &str) -> Vec<&Value> {
        let Some(entries) = self.root.get("entry").and_then(Value::as_array) else {
            return Vec::new();
        };

        entries
            .iter()
            .filter_map(|entry| entry.get("resource"))
            .filter(|resource| {
                resource.get("resourceType").and_then(Value::as_str) == Some(resource_type)
            })
            .collect()
    }
}
