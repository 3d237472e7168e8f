pub mod backends;
pub mod classifier;
pub mod detector;
pub mod engine;
pub mod ensemble;
pub mod features;
pub mod handle;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod service;
pub mod types;

pub use backends::{severity_model_loader, LogitsClassifier, SEVERITY_SOURCE_ID};
pub use classifier::{ClassifierLoader, ClassifierSource, SeverityClassifier, SourceKind};
pub use detector::{DetectorLoader, DetectorSettings, LesionDetector, LesionDetectorBackend};
pub use engine::{decode_image, AssessmentEngine, AssessmentEngineBuilder};
pub use ensemble::{fuse, heuristic_grade, normalize_label, ClassifierEnsemble, EnsembleVerdict};
pub use features::{FeatureExtractor, ImageFeatures};
pub use handle::LazyHandle;
pub use service::AssessmentService;
pub use types::{
    AssessmentResult, Candidate, DetectedLesion, DetectorStatus, InflammationRegion,
    RawDetection, SeverityGrade, SeverityPrediction, UsedSources,
};
