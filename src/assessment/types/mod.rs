mod lesion;
mod prediction;
mod region;
mod result;
mod severity;

pub use lesion::{DetectedLesion, RawDetection};
pub use prediction::{Candidate, SeverityPrediction};
pub use region::InflammationRegion;
pub use result::{AssessmentResult, DetectorStatus, UsedSources};
pub use severity::SeverityGrade;
