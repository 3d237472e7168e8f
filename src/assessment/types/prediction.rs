use serde::{Deserialize, Serialize};

use super::SeverityGrade;

/// One classifier vote after label normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityPrediction {
    pub label: SeverityGrade,
    pub confidence: f32,
    pub source: String,
    pub raw_label: String,
}

impl SeverityPrediction {
    pub fn new(
        label: SeverityGrade,
        confidence: f32,
        source: impl Into<String>,
        raw_label: impl Into<String>,
    ) -> Self {
        Self {
            label,
            confidence: confidence.clamp(0.0, 1.0),
            source: source.into(),
            raw_label: raw_label.into(),
        }
    }
}

/// Raw `(label, score)` pair as returned by a classifier backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub label: String,
    pub score: f32,
}

impl Candidate {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}
