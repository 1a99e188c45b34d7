//! Error taxonomy for recording jobs.

use crate::domain::{JobState, Track};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Boxed error returned by port implementations.
pub type PortError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("decryption key unavailable: {0}")]
    KeyUnavailable(String),
    #[error("{track} download failed: {reason}")]
    DownloadFailed { track: Track, reason: String },
    #[error("decrypt/merge failed: {0}")]
    MergeFailed(String),
    #[error("concatenation failed: {0}")]
    ConcatenationFailed(String),
    #[error("final artifact is {size} bytes, allowed range is {min}..={max}")]
    SizeOutOfBounds { size: u64, min: u64, max: u64 },
    #[error("delivery failed after {attempts} attempts: {reason}")]
    DeliveryFailed { attempts: u32, reason: String },
    #[error("precondition violated: {0}")]
    PreconditionViolation(String),
    #[error("job cancelled")]
    Cancelled,
    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Terminal failure of a job, tagged with the stage it failed in.
#[derive(Debug)]
pub struct JobFailure {
    pub stage: JobState,
    /// 1-based segment ordinal when the failure happened inside a segment.
    pub segment: Option<usize>,
    pub error: RecorderError,
}

impl JobFailure {
    pub fn new(stage: JobState, error: RecorderError) -> Self {
        let segment = match stage {
            JobState::Running { segment } => Some(segment),
            _ => None,
        };
        Self {
            stage,
            segment,
            error,
        }
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.segment {
            Some(segment) => write!(
                f,
                "job failed at segment {} ({}): {}",
                segment, self.stage, self.error
            ),
            None => write!(f, "job failed while {}: {}", self.stage, self.error),
        }
    }
}

impl std::error::Error for JobFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
