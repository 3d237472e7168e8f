use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{DetectedLesion, InflammationRegion, SeverityGrade, SeverityPrediction};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsedSources {
    pub onnx_used: bool,
    pub hf_used: bool,
    pub heuristic_used: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectorStatus {
    pub error: Option<String>,
    pub model_id: Option<String>,
    pub count: usize,
}

/// Everything the engine knows about one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub final_grade: SeverityGrade,
    pub confidence: f32,
    pub inflamed_area_pct: f32,
    pub used_sources: UsedSources,
    pub ensemble_trace: Vec<SeverityPrediction>,
    /// Source id -> error string, in query order.
    pub source_errors: IndexMap<String, String>,
    pub regions: Vec<InflammationRegion>,
    pub detections: Vec<DetectedLesion>,
    pub texture_score: f32,
    pub pore_proxy: f32,
    pub detector_status: DetectorStatus,
}
