use serde::{Deserialize, Serialize};

/// Detector output in pixel space, before normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    /// `[x1, y1, x2, y2]` in pixels.
    pub bbox: [f32; 4],
    pub confidence: f32,
    pub class_id: u32,
}

impl RawDetection {
    pub fn new(bbox: [f32; 4], confidence: f32, class_id: u32) -> Self {
        Self {
            bbox,
            confidence,
            class_id,
        }
    }
}

/// Typed lesion region reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedLesion {
    pub label: String,
    pub confidence: f32,
    /// `[x1, y1, x2, y2]` normalized to [0, 1].
    pub bbox: [f32; 4],
    pub bbox_absolute: [f32; 4],
    pub area_pct: f32,
    pub class_id: u32,
}
