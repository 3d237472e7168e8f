use std::time::Instant;

use image::{DynamicImage, RgbImage};
use indexmap::IndexMap;
use tracing::{debug, info};

use super::classifier::{ClassifierLoader, ClassifierSource};
use super::detector::{DetectorLoader, DetectorSettings, LesionDetector};
use super::ensemble::ClassifierEnsemble;
use super::features::FeatureExtractor;
use super::types::AssessmentResult;
use crate::config::EngineConfig;
use crate::error::EngineError;

/// Decode an uploaded image into RGB8. The only request-fatal failure in the engine.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, EngineError> {
    if bytes.is_empty() {
        return Err(EngineError::MalformedInput("empty image payload".to_string()));
    }
    let image = image::load_from_memory(bytes)
        .map_err(|e| EngineError::MalformedInput(e.to_string()))?;
    to_rgb(&image)
}

fn to_rgb(image: &DynamicImage) -> Result<RgbImage, EngineError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(EngineError::MalformedInput(format!(
            "image has zero size ({}x{})",
            image.width(),
            image.height()
        )));
    }
    Ok(image.to_rgb8())
}

/// Long-lived assessment context. Owns every backend handle; share it behind an `Arc`.
pub struct AssessmentEngine {
    features: FeatureExtractor,
    ensemble: ClassifierEnsemble,
    detector: LesionDetector,
}

impl AssessmentEngine {
    pub fn builder(config: EngineConfig) -> AssessmentEngineBuilder {
        AssessmentEngineBuilder::new(config)
    }

    /// Engine with no optional backends: heuristic grading, no detections.
    pub fn heuristic_only(config: &EngineConfig) -> Self {
        Self::builder(config.clone()).build()
    }

    pub fn ensemble(&self) -> &ClassifierEnsemble {
        &self.ensemble
    }

    /// Assess one image. Backend failures degrade the result but never fail the call.
    pub fn assess(&self, image: &RgbImage) -> AssessmentResult {
        let start = Instant::now();

        let features = self.features.extract(image);
        let verdict = self.ensemble.evaluate(image, features.redness_pct);
        let (detections, detector_status) = self.detector.detect(image);

        info!(
            "Assessment completed in {}us: {} ({:.2}) from {} votes, {} detections",
            start.elapsed().as_micros(),
            verdict.grade,
            verdict.confidence,
            verdict.trace.len(),
            detections.len()
        );

        AssessmentResult {
            final_grade: verdict.grade,
            confidence: verdict.confidence,
            inflamed_area_pct: features.redness_pct,
            used_sources: verdict.used,
            ensemble_trace: verdict.trace,
            source_errors: verdict.errors,
            regions: features.regions,
            detections,
            texture_score: features.texture_score,
            pore_proxy: features.pore_proxy,
            detector_status,
        }
    }

    pub fn assess_bytes(&self, bytes: &[u8]) -> Result<AssessmentResult, EngineError> {
        Ok(self.assess(&decode_image(bytes)?))
    }
}

pub struct AssessmentEngineBuilder {
    config: EngineConfig,
    classifiers: IndexMap<String, Box<dyn ClassifierLoader>>,
    detector: Option<Box<dyn DetectorLoader>>,
}

impl AssessmentEngineBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            classifiers: IndexMap::new(),
            detector: None,
        }
    }

    /// Register the backend for a source id. Only ids in the configured source list are queried.
    pub fn with_classifier(
        mut self,
        id: impl Into<String>,
        loader: impl ClassifierLoader + 'static,
    ) -> Self {
        self.classifiers.insert(id.into(), Box::new(loader));
        self
    }

    pub fn with_detector(mut self, loader: impl DetectorLoader + 'static) -> Self {
        self.detector = Some(Box::new(loader));
        self
    }

    pub fn build(mut self) -> AssessmentEngine {
        let mut sources = Vec::new();
        for id in self.config.sources() {
            if sources.iter().any(|s: &ClassifierSource| s.id() == id) {
                continue;
            }
            let source = match self.classifiers.shift_remove(id) {
                Some(loader) => ClassifierSource::new(id.clone(), loader),
                None => ClassifierSource::unregistered(id.clone()),
            };
            sources.push(source);
        }

        for id in self.classifiers.keys() {
            debug!("Classifier {} registered but not configured, ignoring", id);
        }

        AssessmentEngine {
            features: FeatureExtractor::new(self.config.max_regions),
            ensemble: ClassifierEnsemble::new(sources),
            detector: LesionDetector::new(self.detector, DetectorSettings::from(&self.config)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::backends::{severity_model_loader, SEVERITY_SOURCE_ID};
    use crate::assessment::classifier::SeverityClassifier;
    use crate::assessment::types::{Candidate, SeverityGrade};
    use crate::error::BackendError;
    use image::{ImageBuffer, ImageFormat, Rgb};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Fixed(&'static str, f32);

    impl SeverityClassifier for Fixed {
        fn predict(&self, _image: &RgbImage) -> Result<Vec<Candidate>, BackendError> {
            Ok(vec![Candidate::new(self.0, self.1)])
        }
    }

    fn fixed(
        label: &'static str,
        score: f32,
    ) -> impl Fn() -> Result<Arc<dyn SeverityClassifier>, BackendError> + Send + Sync {
        move || Ok(Arc::new(Fixed(label, score)) as Arc<dyn SeverityClassifier>)
    }

    fn gray_image() -> RgbImage {
        ImageBuffer::from_pixel(64, 64, Rgb([128, 128, 128]))
    }

    fn config(sources: &[&str]) -> EngineConfig {
        EngineConfig {
            classifier_sources: sources.iter().map(|s| s.to_string()).collect(),
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_no_backends_uses_heuristic() {
        let engine = AssessmentEngine::heuristic_only(&EngineConfig::default());
        let result = engine.assess(&gray_image());

        assert_eq!(result.final_grade, SeverityGrade::Clear);
        assert!(result.used_sources.heuristic_used);
        assert!(!result.used_sources.onnx_used && !result.used_sources.hf_used);
        assert!(result.ensemble_trace.is_empty());
        assert!(result.detections.is_empty());
        assert_eq!(result.source_errors.len(), 3);
        assert_eq!(
            result.detector_status.error.as_deref(),
            Some("detector backend not configured")
        );
    }

    #[test]
    fn test_two_sources_fuse_to_moderate() {
        let engine = AssessmentEngine::builder(config(&["onnx::a", "hf::b"]))
            .with_classifier("onnx::a", fixed("Moderate", 0.9))
            .with_classifier("hf::b", fixed("Severe", 0.3))
            .build();
        let result = engine.assess(&gray_image());

        assert_eq!(result.final_grade, SeverityGrade::Moderate);
        assert!((result.confidence - 0.6).abs() < 1e-6);
        assert!(result.used_sources.onnx_used);
        assert!(result.used_sources.hf_used);
        assert!(!result.used_sources.heuristic_used);
        assert_eq!(result.ensemble_trace.len(), 2);
        assert!(result.source_errors.is_empty());
    }

    #[test]
    fn test_failing_source_is_recorded_not_fatal() {
        let engine = AssessmentEngine::builder(config(&["hf::ok", "hf::broken"]))
            .with_classifier("hf::ok", fixed("level 2", 0.8))
            .with_classifier(
                "hf::broken",
                || -> Result<Arc<dyn SeverityClassifier>, BackendError> {
                    Err(BackendError::unavailable("model download failed"))
                },
            )
            .build();
        let result = engine.assess(&gray_image());

        assert_eq!(result.final_grade, SeverityGrade::Severe);
        assert_eq!(
            result.source_errors.get("hf::broken").map(String::as_str),
            Some("model download failed")
        );
    }

    #[test]
    fn test_missing_severity_weights_fall_back() {
        let models = tempfile::tempdir().unwrap();
        let engine = AssessmentEngine::builder(config(&[SEVERITY_SOURCE_ID]))
            .with_classifier(SEVERITY_SOURCE_ID, severity_model_loader(models.path()))
            .build();
        let result = engine.assess(&gray_image());

        assert!(result.used_sources.heuristic_used);
        assert!(!result.used_sources.onnx_used);
        assert_eq!(
            result.source_errors.get(SEVERITY_SOURCE_ID).map(String::as_str),
            Some("severity_cls.onnx not found")
        );
    }

    #[test]
    fn test_unconfigured_classifier_ignored() {
        let engine = AssessmentEngine::builder(config(&[]))
            .with_classifier("hf::extra", fixed("Severe", 0.9))
            .build();
        let result = engine.assess(&gray_image());
        assert!(result.used_sources.heuristic_used);
        assert!(engine.ensemble().sources().is_empty());
    }

    #[test]
    fn test_concurrent_assess_loads_each_source_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let engine = AssessmentEngine::builder(config(&["onnx::slow"]))
            .with_classifier(
                "onnx::slow",
                move || -> Result<Arc<dyn SeverityClassifier>, BackendError> {
                    counter.fetch_add(1, Ordering::SeqCst);
                    std::thread::sleep(std::time::Duration::from_millis(20));
                    Ok(Arc::new(Fixed("Mild", 0.7)))
                },
            )
            .build();
        let image = gray_image();

        std::thread::scope(|scope| {
            for _ in 0..6 {
                scope.spawn(|| {
                    let result = engine.assess(&image);
                    assert_eq!(result.final_grade, SeverityGrade::Mild);
                });
            }
        });

        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_image(b"not an image"),
            Err(EngineError::MalformedInput(_))
        ));
        assert!(matches!(decode_image(&[]), Err(EngineError::MalformedInput(_))));
    }

    #[test]
    fn test_assess_bytes_round_trip() {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(gray_image())
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();

        let engine = AssessmentEngine::heuristic_only(&EngineConfig::default());
        let result = engine.assess_bytes(&bytes).unwrap();
        assert_eq!(result.final_grade, SeverityGrade::Clear);
    }
}
