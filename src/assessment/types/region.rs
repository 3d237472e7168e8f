use serde::{Deserialize, Serialize};

/// Red/inflamed area found by color segmentation. Coordinates are relative to the image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InflammationRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub area_pct: f32,
}
