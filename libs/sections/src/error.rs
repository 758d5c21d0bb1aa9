//! Error types for document extraction

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Extraction failures.
///
/// These never escape the pipeline: a failing extractor is logged and its
/// section omitted. Malformed individual entries are not errors at all;
/// they are skipped inside the extractor.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON object for the resource")]
    ExpectedObject,

    #[error("missing resourceType property")]
    MissingResourceType,

    #[error("expected a Bundle, found resourceType {0}")]
    NotABundle(String),

    #[error("expected a {expected} document")]
    WrongFormat { expected: &'static str },

    #[error("extractor failure: {0}")]
    Failed(String),
}
