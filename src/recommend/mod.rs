pub mod catalog;
pub mod plan;
pub mod profile;
pub mod ranker;
pub mod similarity;

pub use catalog::{Remedy, RemedyCatalog, SourceLink};
pub use plan::{build_plan, CarePlan};
pub use profile::{Diet, HormonalStatus, HydrationLevel, LifestyleTrigger, Profile, StressLevel};
pub use ranker::{
    community_highlights, derive_concerns, safety_alerts, RankedRemedy, Recommendation,
    RemedyRanker,
};
pub use similarity::{tokenize, LexicalIndex, TermVector};
