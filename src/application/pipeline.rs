use super::key_service::KeyService;
use crate::domain::{Segment, SegmentArtifact, Track};
use crate::error::RecorderError;
use crate::ports::downloader::{DownloadRequest, DownloaderPort};
use crate::ports::key_lookup::KeyLookupPort;
use crate::ports::media::MediaToolPort;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Drives one segment through key fetch, video and audio download, and
/// decrypt/mux. Each step gates the next.
pub struct SegmentPipeline<L, D, M> {
    keys: KeyService<L>,
    downloader: Arc<D>,
    media: Arc<M>,
    manifest_url: String,
}

impl<L, D, M> SegmentPipeline<L, D, M>
where
    L: KeyLookupPort,
    D: DownloaderPort,
    M: MediaToolPort,
{
    pub fn new(
        keys: KeyService<L>,
        downloader: Arc<D>,
        media: Arc<M>,
        manifest_url: impl Into<String>,
    ) -> Self {
        Self {
            keys,
            downloader,
            media,
            manifest_url: manifest_url.into(),
        }
    }

    /// Manifest URL for the segment's window on `channel_id`.
    pub fn manifest_for(&self, segment: &Segment, channel_id: u32) -> String {
        let separator = if self.manifest_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}id={}&begin={}&end={}",
            self.manifest_url,
            separator,
            channel_id,
            segment.range.start(),
            segment.range.end()
        )
    }

    /// Produce the merged file for `segment` inside `work_dir`.
    ///
    /// Intermediate video and audio files are left in place; the orchestrator
    /// removes them with the job directory.
    pub async fn run(
        &self,
        segment: &Segment,
        channel_id: u32,
        work_dir: &Path,
    ) -> Result<SegmentArtifact, RecorderError> {
        let key = self.keys.active_key(&segment.range, channel_id).await?;

        let manifest_url = self.manifest_for(segment, channel_id);
        let artifact = SegmentArtifact {
            segment: *segment,
            video_path: segment.video_path(work_dir),
            audio_path: segment.audio_path(work_dir),
            merged_path: segment.merged_path(work_dir),
        };

        self.fetch(&manifest_url, Track::Video, &artifact).await?;
        self.fetch(&manifest_url, Track::Audio, &artifact).await?;

        self.media
            .merge(
                &artifact.video_path,
                &artifact.audio_path,
                &key.key,
                &artifact.merged_path,
            )
            .await
            .map_err(|e| RecorderError::MergeFailed(e.to_string()))?;

        info!(segment = segment.index, path = %artifact.merged_path.display(), "segment merged");
        Ok(artifact)
    }

    async fn fetch(
        &self,
        manifest_url: &str,
        track: Track,
        artifact: &SegmentArtifact,
    ) -> Result<(), RecorderError> {
        let output = match track {
            Track::Video => artifact.video_path.clone(),
            Track::Audio => artifact.audio_path.clone(),
        };
        let request = DownloadRequest {
            manifest_url: manifest_url.to_string(),
            track,
            output,
        };
        self.downloader
            .download(&request)
            .await
            .map_err(|e| RecorderError::DownloadFailed {
                track,
                reason: e.to_string(),
            })?;
        info!(segment = artifact.segment.index, %track, "stream downloaded");
        Ok(())
    }
}
