//! Adapters that shell out to external media tools.

pub mod ffmpeg;
pub mod ytdlp;

pub use ffmpeg::FfmpegMediaTool;
pub use ytdlp::YtDlpDownloader;

use std::ffi::OsString;
use std::process::Output;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("could not start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {}s", .timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Run `program` to completion, killing it if `timeout` elapses first.
/// A non-zero exit status is an error carrying the tail of stderr.
pub async fn run_with_timeout(
    program: &str,
    args: &[OsString],
    timeout: Duration,
) -> Result<Output, ProcessError> {
    debug!(program, ?args, "running external tool");

    let child = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(timeout, child).await {
        Ok(result) => result.map_err(|source| ProcessError::Spawn {
            program: program.to_string(),
            source,
        })?,
        Err(_) => {
            return Err(ProcessError::Timeout {
                program: program.to_string(),
                timeout,
            })
        }
    };

    if !output.status.success() {
        return Err(ProcessError::Failed {
            program: program.to_string(),
            status: output.status,
            stderr: stderr_tail(&output.stderr),
        });
    }
    Ok(output)
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    lines[lines.len().saturating_sub(5)..].join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<OsString> {
        list.iter().map(OsString::from).collect()
    }

    #[test]
    fn stderr_tail_keeps_last_lines() {
        let raw = b"a\nb\n\nc\nd\ne\nf\n";
        assert_eq!(stderr_tail(raw), "b | c | d | e | f");
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let err = run_with_timeout(
            "definitely-not-a-real-tool-42",
            &[],
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_program_times_out() {
        let err = run_with_timeout("sleep", &args(&["5"]), Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::Timeout { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_failure_with_stderr() {
        let err = run_with_timeout(
            "sh",
            &args(&["-c", "echo boom >&2; exit 3"]),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        match err {
            ProcessError::Failed { stderr, status, .. } => {
                assert_eq!(stderr, "boom");
                assert_eq!(status.code(), Some(3));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
