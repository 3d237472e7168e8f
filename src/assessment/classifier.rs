use std::fmt;
use std::sync::Arc;

use image::RgbImage;
use tracing::{debug, info};

use super::ensemble::normalize_label;
use super::handle::LazyHandle;
use super::types::{Candidate, SeverityPrediction};
use crate::error::BackendError;

/// A loaded severity classifier backend.
pub trait SeverityClassifier: Send + Sync {
    fn predict(&self, image: &RgbImage) -> Result<Vec<Candidate>, BackendError>;
}

/// Builds a classifier on first use. Called at most once per source per process.
pub trait ClassifierLoader: Send + Sync {
    fn load(&self) -> Result<Arc<dyn SeverityClassifier>, BackendError>;
}

impl<F> ClassifierLoader for F
where
    F: Fn() -> Result<Arc<dyn SeverityClassifier>, BackendError> + Send + Sync,
{
    fn load(&self) -> Result<Arc<dyn SeverityClassifier>, BackendError> {
        self()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Onnx,
    HuggingFace,
    Custom,
}

impl SourceKind {
    pub fn from_source_id(id: &str) -> Self {
        if id.starts_with("onnx::") {
            SourceKind::Onnx
        } else if id.starts_with("hf::") {
            SourceKind::HuggingFace
        } else {
            SourceKind::Custom
        }
    }
}

/// One configured ensemble member: identity, optional loader, and its cached handle.
pub struct ClassifierSource {
    id: String,
    kind: SourceKind,
    loader: Option<Box<dyn ClassifierLoader>>,
    handle: LazyHandle<dyn SeverityClassifier>,
}

impl ClassifierSource {
    pub fn new(id: impl Into<String>, loader: Box<dyn ClassifierLoader>) -> Self {
        let id = id.into();
        Self {
            kind: SourceKind::from_source_id(&id),
            id,
            loader: Some(loader),
            handle: LazyHandle::new(),
        }
    }

    /// A configured source nobody registered a backend for.
    pub fn unregistered(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            kind: SourceKind::from_source_id(&id),
            id,
            loader: None,
            handle: LazyHandle::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    fn classifier(&self) -> Result<Arc<dyn SeverityClassifier>, BackendError> {
        self.handle.get_or_load(|| match &self.loader {
            Some(loader) => {
                info!("Loading classifier source {}", self.id);
                loader.load()
            }
            None => Err(BackendError::unavailable("no backend registered")),
        })
    }

    /// Run the source and keep its single most confident candidate.
    pub fn query(&self, image: &RgbImage) -> Result<Option<SeverityPrediction>, BackendError> {
        let classifier = self.classifier()?;
        let candidates = classifier.predict(image)?;

        let best = candidates
            .into_iter()
            .filter(|c| c.score.is_finite())
            .reduce(|best, c| if c.score > best.score { c } else { best });

        Ok(best.map(|c| {
            let label = normalize_label(&c.label);
            debug!("{}: '{}' -> {} ({:.3})", self.id, c.label, label, c.score);
            SeverityPrediction::new(label, c.score, self.id.clone(), c.label)
        }))
    }
}

impl fmt::Debug for ClassifierSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifierSource")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("registered", &self.loader.is_some())
            .field("initialized", &self.handle.is_initialized())
            .finish()
    }
}
