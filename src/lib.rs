pub mod assessment;
pub mod config;
pub mod error;
pub mod recommend;

pub use error::{BackendError, EngineError};

pub use assessment::engine::{AssessmentEngine, AssessmentEngineBuilder};
pub use assessment::service::AssessmentService;
pub use assessment::types::{AssessmentResult, SeverityGrade};
pub use config::EngineConfig;
pub use recommend::catalog::RemedyCatalog;
pub use recommend::profile::Profile;
pub use recommend::ranker::{Recommendation, RemedyRanker};
