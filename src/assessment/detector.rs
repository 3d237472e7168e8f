//! Adapter around an optional lesion object-detection backend.
use std::sync::Arc;

use image::RgbImage;
use tracing::{debug, info, warn};

use super::handle::LazyHandle;
use super::types::{DetectedLesion, DetectorStatus, RawDetection};
use crate::config::EngineConfig;
use crate::error::BackendError;

/// Class names used when the backend does not expose its own table.
pub const FALLBACK_CLASS_NAMES: [&str; 17] = [
    "Acne",
    "Blackheads",
    "Dark-Spots",
    "Dry-Skin",
    "Englarged-Pores",
    "Eyebags",
    "Nodules",
    "Normal-Skin",
    "Oily-Skin",
    "Papules",
    "Skin-Redness",
    "Whiteheads",
    "Wrinkles",
    "acne marks",
    "acne scar",
    "burned-skin",
    "pustules",
];

/// A loaded detection backend.
pub trait LesionDetectorBackend: Send + Sync {
    fn predict(
        &self,
        image: &RgbImage,
        confidence_threshold: f32,
        input_size: u32,
        max_detections: usize,
    ) -> Result<Vec<RawDetection>, BackendError>;

    /// Backend-provided class table, if any.
    fn class_names(&self) -> Option<Vec<String>> {
        None
    }

    /// Identifier of the loaded weights, reported in `DetectorStatus`.
    fn model_id(&self) -> Option<String> {
        None
    }
}

pub trait DetectorLoader: Send + Sync {
    fn load(&self) -> Result<Arc<dyn LesionDetectorBackend>, BackendError>;
}

impl<F> DetectorLoader for F
where
    F: Fn() -> Result<Arc<dyn LesionDetectorBackend>, BackendError> + Send + Sync,
{
    fn load(&self) -> Result<Arc<dyn LesionDetectorBackend>, BackendError> {
        self()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DetectorSettings {
    pub confidence_threshold: f32,
    pub input_size: u32,
    pub max_detections: usize,
    pub keep: usize,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.45,
            input_size: 1024,
            max_detections: 150,
            keep: 10,
        }
    }
}

impl From<&EngineConfig> for DetectorSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            confidence_threshold: config.detector_conf,
            input_size: config.detector_size,
            max_detections: config.detector_max_det,
            keep: config.detection_limit,
        }
    }
}

pub struct LesionDetector {
    loader: Option<Box<dyn DetectorLoader>>,
    handle: LazyHandle<dyn LesionDetectorBackend>,
    settings: DetectorSettings,
}

impl LesionDetector {
    pub fn new(loader: Option<Box<dyn DetectorLoader>>, settings: DetectorSettings) -> Self {
        Self {
            loader,
            handle: LazyHandle::new(),
            settings,
        }
    }

    /// Adapter with no backend; every call reports the detector as unavailable.
    pub fn disabled(settings: DetectorSettings) -> Self {
        Self::new(None, settings)
    }

    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }

    fn backend(&self) -> Result<Arc<dyn LesionDetectorBackend>, BackendError> {
        self.handle.get_or_load(|| match &self.loader {
            Some(loader) => {
                info!("Loading lesion detector backend");
                loader.load()
            }
            None => Err(BackendError::unavailable("detector backend not configured")),
        })
    }

    /// Detect lesions. Never fails: backend problems are reported in the status.
    pub fn detect(&self, image: &RgbImage) -> (Vec<DetectedLesion>, DetectorStatus) {
        let backend = match self.backend() {
            Ok(backend) => backend,
            Err(e) => {
                debug!("Lesion detector unavailable: {}", e);
                return (
                    Vec::new(),
                    DetectorStatus {
                        error: Some(e.reason().to_string()),
                        model_id: None,
                        count: 0,
                    },
                );
            }
        };

        let model_id = backend.model_id();
        let raw = match backend.predict(
            image,
            self.settings.confidence_threshold,
            self.settings.input_size,
            self.settings.max_detections,
        ) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Lesion detector inference failed: {}", e);
                return (
                    Vec::new(),
                    DetectorStatus {
                        error: Some(e.reason().to_string()),
                        model_id,
                        count: 0,
                    },
                );
            }
        };

        let class_names = backend.class_names();
        let detections = self.postprocess(raw, class_names.as_deref(), image.dimensions());

        let status = DetectorStatus {
            error: None,
            model_id,
            count: detections.len(),
        };
        (detections, status)
    }

    /// Filter, label, normalize and truncate raw backend output.
    pub fn postprocess(
        &self,
        mut raw: Vec<RawDetection>,
        class_names: Option<&[String]>,
        (width, height): (u32, u32),
    ) -> Vec<DetectedLesion> {
        if width == 0 || height == 0 {
            return Vec::new();
        }
        raw.truncate(self.settings.max_detections);

        let (w, h) = (width as f32, height as f32);
        let image_area = w * h;

        let mut detections: Vec<DetectedLesion> = raw
            .into_iter()
            .filter(|d| {
                d.confidence.is_finite()
                    && d.bbox.iter().all(|v| v.is_finite())
                    && d.confidence >= self.settings.confidence_threshold
            })
            .map(|d| {
                let [x1, y1, x2, y2] = d.bbox;
                let bbox = [
                    (x1 / w).clamp(0.0, 1.0),
                    (y1 / h).clamp(0.0, 1.0),
                    (x2 / w).clamp(0.0, 1.0),
                    (y2 / h).clamp(0.0, 1.0),
                ];
                // Area of the part inside the image, consistent with `bbox`.
                let area = ((bbox[2] - bbox[0]) * w * (bbox[3] - bbox[1]) * h).max(0.0);
                DetectedLesion {
                    label: class_label(d.class_id, class_names),
                    confidence: d.confidence.clamp(0.0, 1.0),
                    bbox,
                    bbox_absolute: d.bbox,
                    area_pct: area / image_area * 100.0,
                    class_id: d.class_id,
                }
            })
            .collect();

        detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        detections.truncate(self.settings.keep);
        detections
    }
}

fn class_label(class_id: u32, class_names: Option<&[String]>) -> String {
    let index = class_id as usize;
    match class_names {
        Some(names) => names.get(index).cloned(),
        None => FALLBACK_CLASS_NAMES.get(index).map(|s| s.to_string()),
    }
    .unwrap_or_else(|| format!("cls_{class_id}"))
}

/// Draw each detection's box on a copy of the image.
#[cfg(feature = "vision")]
pub fn render_detection_overlay(image: &RgbImage, detections: &[DetectedLesion]) -> RgbImage {
    use image::Rgb;
    use imageproc::drawing::draw_hollow_rect_mut;
    use imageproc::rect::Rect;

    let mut canvas = image.clone();
    let (w, h) = (image.width() as f32, image.height() as f32);
    for detection in detections {
        let [x1, y1, x2, y2] = detection.bbox;
        let left = (x1 * w) as i32;
        let top = (y1 * h) as i32;
        let width = (((x2 - x1) * w) as u32).max(1);
        let height = (((y2 - y1) * h) as u32).max(1);
        draw_hollow_rect_mut(
            &mut canvas,
            Rect::at(left, top).of_size(width, height),
            Rgb([255, 64, 64]),
        );
    }
    canvas
}
