//! Error types for the terminology layer

use thiserror::Error;

/// Result alias for concept-store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failures surfaced by a concept/translation store backend.
///
/// The resolver absorbs every variant into the fallback path; store errors
/// never propagate past [`crate::TerminologyResolver::resolve`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("store backend failure: {0}")]
    Backend(String),

    #[error("catalogue parse error: {0}")]
    Catalogue(String),
}
