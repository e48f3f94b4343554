pub mod rate_tracker;
pub mod scorer;

pub use rate_tracker::RateTracker;
pub use scorer::{EngagementVerdict, RelevanceScorer, ScoreReason};
