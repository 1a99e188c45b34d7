//! Configuration loaded from the environment.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

const MIB: u64 = 1024 * 1024;

/// What the planner does when a sampling query fails part-way through the range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SamplingFailurePolicy {
    /// Keep the rotations found so far.
    Degrade,
    /// Discard partial sampling and use fixed-cadence slicing.
    Fallback,
    /// Fail planning with `KeyUnavailable`.
    Abort,
}

impl FromStr for SamplingFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "degrade" => Ok(Self::Degrade),
            "fallback" => Ok(Self::Fallback),
            "abort" => Ok(Self::Abort),
            other => Err(format!("unknown sampling failure policy {:?}", other)),
        }
    }
}

/// Bounded attempts with doubling delay, starting at `base_delay`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts,
            base_delay,
        }
    }

    /// Delay to wait after the given 0-based failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay
            .checked_mul(2u32.saturating_pow(attempt))
            .unwrap_or(Duration::MAX)
    }
}

/// Rotation sampling parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SamplingConfig {
    pub step_secs: i64,
    pub window_secs: i64,
    pub fallback_segment_secs: i64,
    pub on_failure: SamplingFailurePolicy,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            step_secs: 300,
            window_secs: 60,
            fallback_segment_secs: crate::domain::segments::FALLBACK_SEGMENT_SECS,
            on_failure: SamplingFailurePolicy::Degrade,
        }
    }
}

/// Configuration for the recorder binaries.
#[derive(Clone, Debug)]
pub struct RecorderConfig {
    /// HTTP intake bind address
    pub addr: String,
    /// HTTP intake port
    pub port: String,
    /// Key-lookup endpoint, queried with `id`, `begin` and `end`
    pub key_service_url: String,
    /// Manifest endpoint handed to the downloader
    pub manifest_url: String,
    /// Channel used when a request does not name one
    pub default_channel_id: u32,
    /// Root under which each job gets its own working directory
    pub work_dir: PathBuf,
    /// Destination directory of the filesystem delivery adapter
    pub delivery_dir: PathBuf,
    pub delivery_chunk_bytes: usize,
    pub sampling: SamplingConfig,
    pub key_retry: RetryPolicy,
    pub key_request_timeout: Duration,
    pub delivery_retry: RetryPolicy,
    /// Deadline for a single delivery attempt
    pub delivery_timeout: Duration,
    pub download_timeout: Duration,
    pub merge_timeout: Duration,
    pub concat_timeout: Duration,
    pub min_artifact_bytes: u64,
    pub max_artifact_bytes: u64,
    /// Longest range the intake accepts
    pub max_range_secs: i64,
    pub downloader_program: String,
    /// Arguments placed before the generated ones, e.g. `-m yt_dlp` for a python launcher
    pub downloader_args: Vec<String>,
    /// `Name: value` headers sent with every manifest and fragment request.
    /// Defaults to the browser user agent plus `Referer` and `Origin` for
    /// `MANIFEST_ORIGIN`, which the manifest host checks.
    pub downloader_headers: Vec<String>,
    pub geo_bypass_country: Option<String>,
    pub ffmpeg_program: String,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self::from_vars(|_| None)
    }
}

impl RecorderConfig {
    /// Load configuration from `.env` and environment variables.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_vars<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());
        let number = |key: &str, default: u64| parse_or(&var, key, default);
        let secs = |key: &str, default: u64| Duration::from_secs(number(key, default));
        let millis = |key: &str, default: u64| Duration::from_millis(number(key, default));

        let sampling = SamplingConfig {
            step_secs: number("SAMPLING_STEP_SECS", 300).max(1) as i64,
            window_secs: number("SAMPLING_WINDOW_SECS", 60).max(1) as i64,
            fallback_segment_secs: number("FALLBACK_SEGMENT_SECS", 900).max(1) as i64,
            on_failure: parse_or(&var, "SAMPLING_FAILURE", SamplingFailurePolicy::Degrade),
        };

        Self {
            addr: text("ADDR", "127.0.0.1"),
            port: text("PORT", "3000"),
            key_service_url: text("KEY_SERVICE_URL", "http://127.0.0.1:8080/get_keys"),
            manifest_url: text("MANIFEST_URL", "http://127.0.0.1:8080/manifest.mpd"),
            default_channel_id: parse_or(&var, "CHANNEL_ID", 239),
            work_dir: PathBuf::from(text("WORK_DIR", "downloads")),
            delivery_dir: PathBuf::from(text("DELIVERY_DIR", "deliveries")),
            delivery_chunk_bytes: parse_or(&var, "DELIVERY_CHUNK_BYTES", 50 * MIB as usize).max(1),
            sampling,
            key_retry: RetryPolicy::new(
                number("KEY_RETRY_ATTEMPTS", 3).max(1) as u32,
                millis("KEY_RETRY_BASE_MS", 1000),
            ),
            key_request_timeout: secs("KEY_REQUEST_TIMEOUT_SECS", 10),
            delivery_retry: RetryPolicy::new(
                number("DELIVERY_RETRY_ATTEMPTS", 3).max(1) as u32,
                millis("DELIVERY_RETRY_BASE_MS", 5000),
            ),
            delivery_timeout: secs("DELIVERY_TIMEOUT_SECS", 1800),
            download_timeout: secs("DOWNLOAD_TIMEOUT_SECS", 300),
            merge_timeout: secs("MERGE_TIMEOUT_SECS", 300),
            concat_timeout: secs("CONCAT_TIMEOUT_SECS", 1200),
            min_artifact_bytes: number("MIN_ARTIFACT_BYTES", MIB),
            max_artifact_bytes: number("MAX_ARTIFACT_BYTES", 2048 * MIB),
            max_range_secs: number("MAX_RANGE_SECS", 6 * 3600) as i64,
            downloader_program: text("DOWNLOADER_PROGRAM", "yt-dlp"),
            downloader_args: var("DOWNLOADER_ARGS")
                .map(|raw| raw.split_whitespace().map(String::from).collect())
                .unwrap_or_default(),
            downloader_headers: var("DOWNLOADER_HEADERS")
                .map(|raw| {
                    raw.split('|')
                        .map(str::trim)
                        .filter(|h| !h.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_else(|| {
                    browser_headers(&text("MANIFEST_ORIGIN", DEFAULT_MANIFEST_ORIGIN))
                }),
            geo_bypass_country: match var("GEO_BYPASS_COUNTRY") {
                Some(cc) if cc.trim().is_empty() => None,
                Some(cc) => Some(cc.trim().to_string()),
                None => Some("IN".to_string()),
            },
            ffmpeg_program: text("FFMPEG_PROGRAM", "ffmpeg"),
        }
    }
}

/// User agent sent to the key service and, by default, to the manifest host.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

const DEFAULT_MANIFEST_ORIGIN: &str = "https://watch.tataplay.com";

fn browser_headers(origin: &str) -> Vec<String> {
    let origin = origin.trim_end_matches('/');
    vec![
        format!("User-Agent: {}", BROWSER_USER_AGENT),
        format!("Referer: {}/", origin),
        format!("Origin: {}", origin),
    ]
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!(key, value = %raw, error = %e, "ignoring unparseable setting");
            default
        }),
        None => default,
    }
}
