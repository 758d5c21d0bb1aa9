//! Canonical clinical sections and their extractors
//!
//! One extractor per clinical domain and source format (CDA XML, FHIR R4
//! JSON). Every extractor emits the same source-agnostic
//! [`NormalizedSection`] shape, which is the sole contract handed to
//! presentation layers; nothing downstream ever sees XML or JSON again.

mod dates;
mod error;
mod extractor;
mod model;

pub mod cda;
pub mod fhir;

pub use dates::parse_clinical_date;
pub use error::{ExtractError, Result};
pub use extractor::{resolve_code, ClinicalDocument, SectionExtractor};
pub use model::{
    ClinicalCode, DataSource, DisplayConfig, NormalizedSection, SectionEntry, SectionId,
};

pub use salus_terminology::{Provenance, ResolvedTerm};
