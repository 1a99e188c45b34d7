use super::run_with_timeout;
use crate::config::RecorderConfig;
use crate::error::PortError;
use crate::ports::media::MediaToolPort;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

const CONCAT_LIST: &str = "file_list.txt";

/// Decrypts, muxes and concatenates with the ffmpeg CLI. Streams are always
/// copied, never re-encoded.
#[derive(Debug, Clone)]
pub struct FfmpegMediaTool {
    program: String,
    merge_timeout: Duration,
    concat_timeout: Duration,
}

impl FfmpegMediaTool {
    pub fn new(config: &RecorderConfig) -> Self {
        Self {
            program: config.ffmpeg_program.clone(),
            merge_timeout: config.merge_timeout,
            concat_timeout: config.concat_timeout,
        }
    }
}

pub fn merge_args(video: &Path, audio: &Path, key: &str, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    for input in [video, audio] {
        args.push("-decryption_key".into());
        args.push(key.into());
        args.push("-i".into());
        args.push(input.into());
    }
    args.extend(
        [
            "-c:v", "copy", "-c:a", "copy", "-map", "0:v:0", "-map", "1:a:0", "-vsync", "2",
            "-async", "1", "-shortest", "-fflags", "+genpts", "-y",
        ]
        .into_iter()
        .map(OsString::from),
    );
    args.push(output.into());
    args
}

pub fn concat_args(list: &Path, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-f", "concat", "-safe", "0", "-i"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(list.into());
    args.extend(
        ["-c:v", "copy", "-c:a", "copy", "-fflags", "+genpts", "-y"]
            .into_iter()
            .map(OsString::from),
    );
    args.push(output.into());
    args
}

/// Body of an ffmpeg concat-demuxer list, one `file` directive per input.
pub fn concat_list(inputs: &[PathBuf]) -> String {
    inputs
        .iter()
        .map(|path| {
            let escaped = path.to_string_lossy().replace('\'', r"'\''");
            format!("file '{}'\n", escaped)
        })
        .collect()
}

#[async_trait]
impl MediaToolPort for FfmpegMediaTool {
    async fn merge(
        &self,
        video: &Path,
        audio: &Path,
        key: &str,
        output: &Path,
    ) -> Result<(), PortError> {
        let args = merge_args(video, audio, key, output);
        run_with_timeout(&self.program, &args, self.merge_timeout).await?;
        info!(output = %output.display(), "decrypted and merged");
        Ok(())
    }

    async fn concat(&self, inputs: &[PathBuf], output: &Path) -> Result<(), PortError> {
        if inputs.is_empty() {
            return Err("nothing to concatenate".into());
        }

        // Entries are resolved relative to the list file, so write absolute paths.
        let mut absolute = Vec::with_capacity(inputs.len());
        for input in inputs {
            absolute.push(tokio::fs::canonicalize(input).await?);
        }

        let list = output
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(CONCAT_LIST);
        tokio::fs::write(&list, concat_list(&absolute)).await?;

        let args = concat_args(&list, output);
        let result = run_with_timeout(&self.program, &args, self.concat_timeout).await;

        if let Err(e) = tokio::fs::remove_file(&list).await {
            warn!(path = %list.display(), error = %e, "failed to remove concat list");
        }
        result?;
        info!(segments = inputs.len(), output = %output.display(), "segments concatenated");
        Ok(())
    }
}
