use crate::error::RecorderError;
use chrono::{Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Human input format accepted by the intake surfaces, e.g. `04-04-2025 11:00 AM`.
pub const INPUT_FORMAT: &str = "%d-%m-%Y %I:%M %p";
const DISPLAY_FORMAT: &str = "%d-%m-%Y %I:%M %p";
const STAMP_FORMAT: &str = "%d-%m-%Y_%I-%M_%p";

/// Half-open `[start, end)` interval in epoch seconds. `start < end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct TimeRange {
    // Only the domain layer builds ranges without going through `new`.
    pub(super) start: i64,
    pub(super) end: i64,
}

#[derive(Deserialize)]
struct RawRange {
    start: i64,
    end: i64,
}

impl TryFrom<RawRange> for TimeRange {
    type Error = RecorderError;

    fn try_from(raw: RawRange) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

impl TimeRange {
    pub fn new(start: i64, end: i64) -> Result<Self, RecorderError> {
        if start >= end {
            return Err(RecorderError::PreconditionViolation(format!(
                "range start {} is not before end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse `"<start> - <end>"` in the given timezone and enforce `max_secs`.
    pub fn parse_in<Tz: TimeZone>(
        input: &str,
        tz: &Tz,
        max_secs: i64,
    ) -> Result<Self, RecorderError> {
        let (start, end) = input.split_once(" - ").ok_or_else(|| {
            RecorderError::PreconditionViolation(format!(
                "expected `DD-MM-YYYY HH:MM AM/PM - DD-MM-YYYY HH:MM AM/PM`, got {:?}",
                input
            ))
        })?;

        Self::new(parse_instant(start, tz)?, parse_instant(end, tz)?)?.limited_to(max_secs)
    }

    /// Reject ranges longer than `max_secs`.
    pub fn limited_to(self, max_secs: i64) -> Result<Self, RecorderError> {
        if self.duration_secs() > max_secs {
            return Err(RecorderError::PreconditionViolation(format!(
                "range spans {} minutes, limit is {} minutes",
                self.duration_secs() / 60,
                max_secs / 60
            )));
        }
        Ok(self)
    }

    /// Parse a human range in the host's local timezone.
    pub fn parse_local(input: &str, max_secs: i64) -> Result<Self, RecorderError> {
        Self::parse_in(input, &Local, max_secs)
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn duration_secs(&self) -> i64 {
        self.end - self.start
    }

    /// Short window `[at, at + secs)` used for key sampling.
    pub fn window(at: i64, secs: i64) -> Result<Self, RecorderError> {
        Self::new(at, at + secs)
    }
}

fn parse_instant<Tz: TimeZone>(raw: &str, tz: &Tz) -> Result<i64, RecorderError> {
    let naive = NaiveDateTime::parse_from_str(raw.trim(), INPUT_FORMAT).map_err(|e| {
        RecorderError::PreconditionViolation(format!("invalid timestamp {:?}: {}", raw.trim(), e))
    })?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp())
        .ok_or_else(|| {
            RecorderError::PreconditionViolation(format!(
                "timestamp {:?} does not exist in this timezone",
                raw.trim()
            ))
        })
}

/// Formats an epoch timestamp in local time for log lines and descriptions.
pub fn format_local(epoch: i64) -> String {
    format_with(epoch, DISPLAY_FORMAT)
}

/// Filesystem-safe local timestamp used in artifact names.
pub fn file_stamp(epoch: i64) -> String {
    format_with(epoch, STAMP_FORMAT)
}

pub(crate) fn format_with(epoch: i64, pattern: &str) -> String {
    match Local.timestamp_opt(epoch, 0).single() {
        Some(dt) => dt.format(pattern).to_string(),
        None => epoch.to_string(),
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", format_local(self.start), format_local(self.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const SIX_HOURS: i64 = 6 * 3600;

    #[test]
    fn rejects_empty_and_inverted_ranges() {
        assert!(TimeRange::new(10, 10).is_err());
        assert!(TimeRange::new(11, 10).is_err());
        let range = TimeRange::new(10, 11).unwrap();
        assert_eq!(range.duration_secs(), 1);
    }

    #[test]
    fn deserialization_enforces_ordering() {
        let range: TimeRange = serde_json::from_str(r#"{"start":10,"end":70}"#).unwrap();
        assert_eq!(range.duration_secs(), 60);
        assert!(serde_json::from_str::<TimeRange>(r#"{"start":70,"end":10}"#).is_err());
    }

    #[test]
    fn parses_human_range_in_utc() {
        let range =
            TimeRange::parse_in("04-04-2025 11:00 AM - 04-04-2025 12:30 PM", &Utc, SIX_HOURS)
                .unwrap();
        // 2025-04-04T11:00:00Z
        assert_eq!(range.start(), 1_743_764_400);
        assert_eq!(range.duration_secs(), 90 * 60);
    }

    #[test]
    fn parse_rejects_missing_separator() {
        let err = TimeRange::parse_in("04-04-2025 11:00 AM", &Utc, SIX_HOURS).unwrap_err();
        assert!(matches!(err, RecorderError::PreconditionViolation(_)));
    }

    #[test]
    fn parse_rejects_garbage_timestamp() {
        let result = TimeRange::parse_in(
            "04/04/2025 11:00 - 04-04-2025 12:30 PM",
            &Utc,
            SIX_HOURS,
        );
        assert!(result.is_err());
    }

    #[test]
    fn parse_rejects_end_before_start() {
        let result =
            TimeRange::parse_in("04-04-2025 12:30 PM - 04-04-2025 11:00 AM", &Utc, SIX_HOURS);
        assert!(result.is_err());
    }

    #[test]
    fn parse_enforces_duration_ceiling() {
        let input = "04-04-2025 06:00 AM - 04-04-2025 12:01 PM";
        assert!(TimeRange::parse_in(input, &Utc, SIX_HOURS).is_err());
        let input = "04-04-2025 06:00 AM - 04-04-2025 12:00 PM";
        assert!(TimeRange::parse_in(input, &Utc, SIX_HOURS).is_ok());
    }

    #[test]
    fn window_starts_at_instant() {
        let window = TimeRange::window(600, 60).unwrap();
        assert_eq!((window.start(), window.end()), (600, 660));
    }
}
