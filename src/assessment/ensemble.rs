//! Ordinal fusion of heterogeneous severity classifiers.
use image::RgbImage;
use indexmap::IndexMap;
use tracing::{info, warn};

use super::classifier::{ClassifierSource, SourceKind};
use super::types::{SeverityGrade, SeverityPrediction, UsedSources};

/// Known label vocabularies, matched on the trimmed lowercase label. The canonical
/// "very severe" sits here because the scale-order substring scan stops at "severe".
const LABEL_ALIASES: [(&str, SeverityGrade); 11] = [
    ("level -1", SeverityGrade::Clear),
    ("level0", SeverityGrade::Clear),
    ("level 0", SeverityGrade::Mild),
    ("level0_mild", SeverityGrade::Mild),
    ("level 1", SeverityGrade::Moderate),
    ("level1", SeverityGrade::Moderate),
    ("level 2", SeverityGrade::Severe),
    ("level2", SeverityGrade::Severe),
    ("level 3", SeverityGrade::VerySevere),
    ("level3", SeverityGrade::VerySevere),
    ("very severe", SeverityGrade::VerySevere),
];

/// Grade for labels nobody recognizes.
pub const UNMAPPED_LABEL_GRADE: SeverityGrade = SeverityGrade::Moderate;

/// Weight floor so a zero-confidence vote still counts in the denominator.
const MIN_WEIGHT: f32 = 1e-3;
const MAX_FUSED_CONFIDENCE: f32 = 0.99;
const MAX_HEURISTIC_CONFIDENCE: f32 = 0.95;

/// Map any classifier label onto the five-point scale: alias table, then substring
/// match on the canonical names, then the conservative Moderate default.
pub fn normalize_label(raw: &str) -> SeverityGrade {
    let key = raw.trim().to_lowercase();
    if let Some((_, grade)) = LABEL_ALIASES.iter().find(|(alias, _)| *alias == key) {
        return *grade;
    }

    // First grade in scale order whose name appears in the label.
    SeverityGrade::SCALE
        .iter()
        .copied()
        .find(|grade| key.contains(&grade.name().to_lowercase()))
        .unwrap_or(UNMAPPED_LABEL_GRADE)
}

/// Confidence-weighted mean of ordinal positions, rounded half-to-even onto the scale.
/// Returns `None` for an empty prediction set.
pub fn fuse(predictions: &[SeverityPrediction]) -> Option<(SeverityGrade, f32)> {
    if predictions.is_empty() {
        return None;
    }

    let (weighted, total_weight) =
        predictions
            .iter()
            .fold((0.0f64, 0.0f64), |(weighted, total), p| {
                let weight = p.confidence.max(MIN_WEIGHT) as f64;
                (weighted + p.label.index() as f64 * weight, total + weight)
            });

    let aggregate = weighted / total_weight;
    let index = aggregate.round_ties_even().clamp(0.0, 4.0) as usize;
    let confidence =
        ((total_weight / predictions.len() as f64) as f32).min(MAX_FUSED_CONFIDENCE);

    Some((SeverityGrade::from_index(index), confidence))
}

/// Redness-only fallback used when no classifier produced a vote.
pub fn heuristic_grade(redness_pct: f32) -> (SeverityGrade, f32) {
    let grade = if redness_pct < 3.0 {
        SeverityGrade::Clear
    } else if redness_pct < 10.0 {
        SeverityGrade::Mild
    } else if redness_pct < 20.0 {
        SeverityGrade::Moderate
    } else {
        SeverityGrade::Severe
    };
    let confidence = (0.5 + redness_pct / 100.0).min(MAX_HEURISTIC_CONFIDENCE);
    (grade, confidence)
}

/// Outcome of one ensemble pass over an image.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleVerdict {
    pub grade: SeverityGrade,
    pub confidence: f32,
    pub trace: Vec<SeverityPrediction>,
    pub errors: IndexMap<String, String>,
    pub used: UsedSources,
}

pub struct ClassifierEnsemble {
    sources: Vec<ClassifierSource>,
}

impl ClassifierEnsemble {
    pub fn new(sources: Vec<ClassifierSource>) -> Self {
        Self { sources }
    }

    pub fn sources(&self) -> &[ClassifierSource] {
        &self.sources
    }

    /// Query every source, absorbing failures, and fuse the survivors. Falls back to
    /// the redness heuristic when nothing voted.
    pub fn evaluate(&self, image: &RgbImage, redness_pct: f32) -> EnsembleVerdict {
        let mut trace = Vec::new();
        let mut errors = IndexMap::new();
        let mut used = UsedSources::default();

        for source in &self.sources {
            match source.query(image) {
                Ok(Some(prediction)) => {
                    match source.kind() {
                        SourceKind::Onnx => used.onnx_used = true,
                        SourceKind::HuggingFace => used.hf_used = true,
                        SourceKind::Custom => {}
                    }
                    trace.push(prediction);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Classifier source {} skipped: {}", source.id(), e);
                    errors.insert(source.id().to_string(), e.reason().to_string());
                }
            }
        }

        let (grade, confidence) = match fuse(&trace) {
            Some(fused) => fused,
            None => {
                used.heuristic_used = true;
                let (grade, confidence) = heuristic_grade(redness_pct);
                info!(
                    "No classifier votes, heuristic grade {} from redness {:.2}%",
                    grade, redness_pct
                );
                (grade, confidence)
            }
        };

        EnsembleVerdict {
            grade,
            confidence,
            trace,
            errors,
            used,
        }
    }
}
