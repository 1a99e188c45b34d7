use super::segments::Segment;
use super::time_range::{file_stamp, format_with, TimeRange};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Elementary stream selected from the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    Video,
    Audio,
}

impl Track {
    /// Downloader format selector (`bv` = best video, `ba` = best audio).
    pub fn format_selector(&self) -> &'static str {
        match self {
            Track::Video => "bv",
            Track::Audio => "ba",
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Track::Video => write!(f, "video"),
            Track::Audio => write!(f, "audio"),
        }
    }
}

/// Lifecycle of a job. `Failed` is reachable from every state except `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    Planning,
    Running { segment: usize },
    Concatenating,
    Validating,
    Delivering,
    Done,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Planning => write!(f, "planning"),
            JobState::Running { segment } => write!(f, "running segment {}", segment),
            JobState::Concatenating => write!(f, "concatenating"),
            JobState::Validating => write!(f, "validating"),
            JobState::Delivering => write!(f, "delivering"),
            JobState::Done => write!(f, "done"),
            JobState::Failed => write!(f, "failed"),
        }
    }
}

/// Files produced for one segment. Owned by the pipeline until returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentArtifact {
    pub segment: Segment,
    pub video_path: PathBuf,
    pub audio_path: PathBuf,
    pub merged_path: PathBuf,
}

impl SegmentArtifact {
    pub fn files(&self) -> [&Path; 3] {
        [&self.video_path, &self.audio_path, &self.merged_path]
    }
}

/// An accepted request, already parsed and validated by the intake side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequest {
    pub id: Uuid,
    pub range: TimeRange,
    pub channel_id: u32,
}

impl JobRequest {
    pub fn new(range: TimeRange, channel_id: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            range,
            channel_id,
        }
    }
}

/// Mutable job record driven by the orchestrator.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub range: TimeRange,
    pub channel_id: u32,
    pub state: JobState,
    pub work_dir: PathBuf,
    pub segments: Vec<Segment>,
    pub artifacts: Vec<SegmentArtifact>,
    pub final_artifact: Option<PathBuf>,
}

impl Job {
    pub fn new(request: &JobRequest, work_root: &Path) -> Self {
        Self {
            id: request.id,
            range: request.range,
            channel_id: request.channel_id,
            state: JobState::Planning,
            work_dir: work_root.join(format!("job_{}", request.id)),
            segments: Vec::new(),
            artifacts: Vec::new(),
            final_artifact: None,
        }
    }

    pub fn final_artifact_path(&self) -> PathBuf {
        self.work_dir.join(format!(
            "final_output_{}_{}_to_{}.mkv",
            self.channel_id,
            file_stamp(self.range.start()),
            file_stamp(self.range.end())
        ))
    }

    /// Human description attached to the delivered artifact.
    pub fn description(&self, size_bytes: u64) -> String {
        let minutes = self.range.duration_secs() as f64 / 60.0;
        format!(
            "Channel ID: {}\nDate: {}\nTime: {} - {}\nDuration: {:.1} Minutes\nSize: {:.2} MB",
            self.channel_id,
            format_with(self.range.start(), "%d-%m-%Y"),
            format_with(self.range.start(), "%I:%M %p"),
            format_with(self.range.end(), "%I:%M %p"),
            minutes,
            size_bytes as f64 / (1024.0 * 1024.0)
        )
    }
}

/// Outcome of a job that reached `Done`.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub job_id: Uuid,
    pub segments: usize,
    pub size_bytes: u64,
    pub location: String,
    pub sampling_complete: bool,
}
