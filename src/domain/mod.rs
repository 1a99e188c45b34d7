//! Domain layer - Pure types and planning arithmetic.

pub mod job;
pub mod keys;
pub mod segments;
pub mod time_range;

pub use job::{Job, JobReport, JobRequest, JobState, SegmentArtifact, Track};
pub use keys::KeyRecord;
pub use segments::Segment;
pub use time_range::TimeRange;
