//! Section extraction pipeline
//!
//! Runs every registered extractor over one document, isolates per-extractor
//! failures, and assembles a deterministic [`PipelineResult`] that is always
//! returned, no matter how badly the source document misbehaves. A quality
//! assessor scores the aggregate resolution coverage of a run.

mod manager;
mod quality;

pub use manager::{PipelineResult, SectionPipeline};
pub use quality::{assess, QualityLevel, QualityScore};
