//! Helpers for plugging raw model runtimes into the ensemble.
//!
//! A runtime only needs to turn a preprocessed tensor into logits; `LogitsClassifier`
//! handles resizing, softmax and labeling.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::imageops::FilterType;
use image::RgbImage;

use super::classifier::SeverityClassifier;
use super::types::{Candidate, SeverityGrade};
use crate::error::BackendError;

pub const CLASSIFIER_INPUT_SIZE: u32 = 224;

/// Source id served by the bundled severity model.
pub const SEVERITY_SOURCE_ID: &str = "onnx::severity_cls";
pub const SEVERITY_MODEL_FILE: &str = "severity_cls.onnx";

/// Loader for `<models_dir>/severity_cls.onnx`. Missing weights, or a build without the
/// `onnx` runtime, report the source as unavailable.
pub fn severity_model_loader(
    models_dir: &Path,
) -> impl Fn() -> Result<Arc<dyn SeverityClassifier>, BackendError> + Send + Sync {
    let path: PathBuf = models_dir.join(SEVERITY_MODEL_FILE);
    move || {
        if !path.is_file() {
            return Err(BackendError::unavailable(format!(
                "{SEVERITY_MODEL_FILE} not found"
            )));
        }
        load_severity_model(&path)
    }
}

#[cfg(feature = "onnx")]
fn load_severity_model(path: &Path) -> Result<Arc<dyn SeverityClassifier>, BackendError> {
    let classifier = super::onnx::severity_classifier(path, CLASSIFIER_INPUT_SIZE)?;
    Ok(Arc::new(classifier))
}

#[cfg(not(feature = "onnx"))]
fn load_severity_model(_path: &Path) -> Result<Arc<dyn SeverityClassifier>, BackendError> {
    Err(BackendError::unavailable("onnxruntime not available"))
}

/// Resize to a square and lay out as NCHW `f32` in [0, 1].
pub fn to_nchw(image: &RgbImage, size: u32) -> Vec<f32> {
    let resized = image::imageops::resize(image, size, size, FilterType::Triangle);
    let plane = (size * size) as usize;
    let mut tensor = vec![0.0f32; plane * 3];

    for (i, pixel) in resized.pixels().enumerate() {
        for c in 0..3 {
            tensor[c * plane + i] = pixel.0[c] as f32 / 255.0;
        }
    }
    tensor
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum <= 0.0 || !sum.is_finite() {
        return vec![0.0; logits.len()];
    }
    exps.into_iter().map(|e| e / sum).collect()
}

type LogitsFn = dyn Fn(&[f32]) -> Result<Vec<f32>, BackendError> + Send + Sync;

/// Classifier over a function producing one logit per class.
pub struct LogitsClassifier {
    labels: Vec<String>,
    input_size: u32,
    run: Box<LogitsFn>,
}

impl LogitsClassifier {
    pub fn new<F>(labels: Vec<String>, run: F) -> Self
    where
        F: Fn(&[f32]) -> Result<Vec<f32>, BackendError> + Send + Sync + 'static,
    {
        Self {
            labels,
            input_size: CLASSIFIER_INPUT_SIZE,
            run: Box::new(run),
        }
    }

    /// Classes are the five grades in ordinal order.
    pub fn over_severity_scale<F>(run: F) -> Self
    where
        F: Fn(&[f32]) -> Result<Vec<f32>, BackendError> + Send + Sync + 'static,
    {
        let labels = SeverityGrade::SCALE
            .iter()
            .map(|g| g.name().to_string())
            .collect();
        Self::new(labels, run)
    }

    pub fn with_input_size(mut self, size: u32) -> Self {
        self.input_size = size;
        self
    }
}

impl SeverityClassifier for LogitsClassifier {
    fn predict(&self, image: &RgbImage) -> Result<Vec<Candidate>, BackendError> {
        let tensor = to_nchw(image, self.input_size);
        let logits = (self.run)(&tensor)?;
        if logits.is_empty() {
            return Err(BackendError::inference("model returned no logits"));
        }

        Ok(softmax(&logits)
            .into_iter()
            .enumerate()
            .map(|(i, p)| {
                let label = self
                    .labels
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("class_{i}"));
                Candidate::new(label, p)
            })
            .collect())
    }
}
