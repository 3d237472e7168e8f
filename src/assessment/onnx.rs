//! onnxruntime-backed severity classifier.
use std::fmt::Display;
use std::path::Path;
use std::sync::Mutex;

use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use tracing::info;

use super::backends::LogitsClassifier;
use crate::error::BackendError;

fn unavailable(e: impl Display) -> BackendError {
    BackendError::unavailable(e.to_string())
}

fn inference(e: impl Display) -> BackendError {
    BackendError::inference(e.to_string())
}

pub fn load_session(path: &Path) -> Result<Session, BackendError> {
    let session = Session::builder()
        .map_err(unavailable)?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(unavailable)?
        .commit_from_file(path)
        .map_err(unavailable)?;
    info!("Loaded ONNX session from {}", path.display());
    Ok(session)
}

/// Five-way severity model taking a `1x3xNxN` float image and returning one logit per grade.
pub fn severity_classifier(path: &Path, input_size: u32) -> Result<LogitsClassifier, BackendError> {
    let session = Mutex::new(load_session(path)?);
    let side = input_size as usize;

    let classifier = LogitsClassifier::over_severity_scale(move |tensor: &[f32]| {
        let input =
            Tensor::from_array(([1usize, 3, side, side], tensor.to_vec())).map_err(inference)?;
        let mut session = session
            .lock()
            .map_err(|_| BackendError::inference("session lock poisoned"))?;
        let outputs = session.run(ort::inputs![input]).map_err(inference)?;
        let (_, logits) = outputs[0].try_extract_tensor::<f32>().map_err(inference)?;
        Ok(logits.to_vec())
    });

    Ok(classifier.with_input_size(input_size))
}
