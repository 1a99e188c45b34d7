use super::time_range::{file_stamp, TimeRange};
use crate::error::RecorderError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Width of a fixed-cadence fallback segment (one quarter hour).
pub const FALLBACK_SEGMENT_SECS: i64 = 15 * 60;

/// A contiguous slice of the job range covered by a single decryption key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// 1-based ordinal within the job.
    pub index: usize,
    pub range: TimeRange,
}

impl Segment {
    pub fn video_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!(
            "segment_{}_video_{}.mp4",
            self.index,
            file_stamp(self.range.start())
        ))
    }

    pub fn audio_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!(
            "segment_{}_audio_{}.m4a",
            self.index,
            file_stamp(self.range.start())
        ))
    }

    pub fn merged_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!(
            "segment_{}_merged_{}.mkv",
            self.index,
            file_stamp(self.range.start())
        ))
    }
}

/// Slice `range` at the given rotation instants.
///
/// Instants outside `(start, end)` and duplicates are ignored, so no
/// zero-length segment is ever emitted.
pub fn slice_at_rotations(range: &TimeRange, rotations: &[i64]) -> Vec<Segment> {
    let mut boundaries: Vec<i64> = rotations
        .iter()
        .copied()
        .filter(|&t| t > range.start() && t < range.end())
        .collect();
    boundaries.sort_unstable();
    boundaries.push(range.end());

    let mut segments = Vec::with_capacity(boundaries.len());
    let mut current = range.start();
    for boundary in boundaries {
        if boundary <= current {
            continue;
        }
        segments.push(Segment {
            index: segments.len() + 1,
            range: TimeRange {
                start: current,
                end: boundary,
            },
        });
        current = boundary;
    }
    segments
}

/// Fixed-cadence slicing aligned to `width` boundaries on the epoch clock.
///
/// The first segment runs from `range.start` to the first aligned boundary
/// strictly after it; the last one is clipped to `range.end`.
pub fn fixed_cadence(range: &TimeRange, width: i64) -> Vec<Segment> {
    let width = width.max(1);
    let mut segments = Vec::new();
    let mut current = range.start();
    let mut boundary = current - current.rem_euclid(width) + width;

    while current < range.end() {
        let end = boundary.min(range.end());
        segments.push(Segment {
            index: segments.len() + 1,
            range: TimeRange {
                start: current,
                end,
            },
        });
        current = end;
        boundary += width;
    }
    segments
}

/// Verifies that `segments` are ordered, contiguous, numbered from 1 and
/// cover `range` exactly.
pub fn check_coverage(range: &TimeRange, segments: &[Segment]) -> Result<(), RecorderError> {
    let (first, last) = match (segments.first(), segments.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            return Err(RecorderError::PreconditionViolation(
                "segment plan is empty".to_string(),
            ))
        }
    };

    if first.range.start() != range.start() || last.range.end() != range.end() {
        return Err(RecorderError::PreconditionViolation(format!(
            "segment plan covers {}..{} instead of {}..{}",
            first.range.start(),
            last.range.end(),
            range.start(),
            range.end()
        )));
    }

    for (position, pair) in segments.windows(2).enumerate() {
        if pair[0].range.end() != pair[1].range.start() {
            return Err(RecorderError::PreconditionViolation(format!(
                "segments {} and {} are not contiguous",
                pair[0].index, pair[1].index
            )));
        }
        if pair[0].index != position + 1 {
            return Err(RecorderError::PreconditionViolation(format!(
                "segment at position {} carries index {}",
                position + 1,
                pair[0].index
            )));
        }
    }
    if last.index != segments.len() {
        return Err(RecorderError::PreconditionViolation(format!(
            "last segment carries index {} for a plan of {}",
            last.index,
            segments.len()
        )));
    }
    Ok(())
}
