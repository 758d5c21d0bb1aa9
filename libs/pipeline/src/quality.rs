//! Translation quality assessment
//!
//! Scores how much of a pipeline run's coded content actually resolved to
//! catalogue or source text, as opposed to degrading to fallback strings.

use crate::manager::PipelineResult;
use serde::Serialize;
use std::fmt;

/// Coverage classification of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QualityLevel {
    Excellent,
    Good,
    Fair,
    Poor,
    #[serde(rename = "No codes")]
    NoCodes,
}

impl fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            QualityLevel::Excellent => "Excellent",
            QualityLevel::Good => "Good",
            QualityLevel::Fair => "Fair",
            QualityLevel::Poor => "Poor",
            QualityLevel::NoCodes => "No codes",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityScore {
    pub level: QualityLevel,
    pub percentage: f64,
    pub resolved: usize,
    pub total: usize,
}

/// Score a pipeline run.
///
/// A document without a single coded concept scores `NoCodes` rather than
/// tripping over the zero denominator.
pub fn assess(result: &PipelineResult) -> QualityScore {
    let total: usize = result
        .sections
        .iter()
        .map(|s| s.coded_concepts.len())
        .sum();
    let resolved: usize = result
        .sections
        .iter()
        .flat_map(|s| s.coded_concepts.iter())
        .filter(|term| term.is_resolved())
        .count();

    if total == 0 {
        return QualityScore {
            level: QualityLevel::NoCodes,
            percentage: 0.0,
            resolved: 0,
            total: 0,
        };
    }

    let percentage = (resolved as f64 / total as f64) * 100.0;
    let level = if percentage >= 90.0 {
        QualityLevel::Excellent
    } else if percentage >= 70.0 {
        QualityLevel::Good
    } else if percentage >= 50.0 {
        QualityLevel::Fair
    } else {
        QualityLevel::Poor
    };

    QualityScore {
        level,
        percentage,
        resolved,
        total,
    }
}
