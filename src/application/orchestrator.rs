use super::events::{EventHub, JobEvent};
use super::key_service::KeyService;
use super::pipeline::SegmentPipeline;
use super::planner::SegmentPlanner;
use super::retry::retry;
use crate::config::{RecorderConfig, RetryPolicy};
use crate::domain::segments::check_coverage;
use crate::domain::{Job, JobReport, JobRequest, JobState};
use crate::error::{JobFailure, PortError, RecorderError};
use crate::ports::delivery::{DeliveryMetadata, DeliveryPort, DeliveryRequest};
use crate::ports::downloader::DownloaderPort;
use crate::ports::key_lookup::KeyLookupPort;
use crate::ports::media::MediaToolPort;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Orchestrator settings that are not owned by the planner or pipeline.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub work_dir: PathBuf,
    pub min_artifact_bytes: u64,
    pub max_artifact_bytes: u64,
    pub delivery_retry: RetryPolicy,
    pub delivery_timeout: Duration,
}

impl From<&RecorderConfig> for OrchestratorSettings {
    fn from(config: &RecorderConfig) -> Self {
        Self {
            work_dir: config.work_dir.clone(),
            min_artifact_bytes: config.min_artifact_bytes,
            max_artifact_bytes: config.max_artifact_bytes,
            delivery_retry: config.delivery_retry,
            delivery_timeout: config.delivery_timeout,
        }
    }
}

/// Runs one job end to end: plan, per-segment pipeline in order,
/// concatenate, validate size, deliver, clean up.
pub struct JobOrchestrator<L, D, M, V> {
    planner: SegmentPlanner<L>,
    pipeline: SegmentPipeline<L, D, M>,
    media: Arc<M>,
    delivery: V,
    settings: OrchestratorSettings,
    events: Option<Arc<EventHub>>,
}

impl<L, D, M, V> JobOrchestrator<L, D, M, V>
where
    L: KeyLookupPort,
    D: DownloaderPort,
    M: MediaToolPort,
    V: DeliveryPort,
{
    pub fn new(lookup: L, downloader: D, media: M, delivery: V, config: &RecorderConfig) -> Self {
        let keys = KeyService::new(Arc::new(lookup), config.key_retry);
        let media = Arc::new(media);
        Self {
            planner: SegmentPlanner::new(keys.clone(), config.sampling),
            pipeline: SegmentPipeline::new(
                keys,
                Arc::new(downloader),
                media.clone(),
                config.manifest_url.clone(),
            ),
            media,
            delivery,
            settings: OrchestratorSettings::from(config),
            events: None,
        }
    }

    pub fn with_events(mut self, hub: Arc<EventHub>) -> Self {
        self.events = Some(hub);
        self
    }

    pub fn with_settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Execute `request`. On every terminal path the job directory is removed.
    pub async fn execute(
        &self,
        request: &JobRequest,
        cancel: &CancellationToken,
    ) -> Result<JobReport, JobFailure> {
        let mut job = Job::new(request, &self.settings.work_dir);
        info!(
            job = %job.id,
            channel = job.channel_id,
            range = %job.range,
            "job accepted"
        );

        let outcome = self.run(&mut job, cancel).await;

        match &outcome {
            Ok(report) => {
                self.transition(&mut job, JobState::Done);
                info!(
                    job = %job.id,
                    location = %report.location,
                    size = report.size_bytes,
                    "job done"
                );
            }
            Err(failure) => {
                self.transition(&mut job, JobState::Failed);
                error!(job = %job.id, %failure, "job failed");
            }
        }

        self.cleanup(&job).await;
        outcome
    }

    async fn run(
        &self,
        job: &mut Job,
        cancel: &CancellationToken,
    ) -> Result<JobReport, JobFailure> {
        self.transition(job, JobState::Planning);
        tokio::fs::create_dir_all(&job.work_dir)
            .await
            .map_err(|source| {
                JobFailure::new(
                    JobState::Planning,
                    RecorderError::Io {
                        path: job.work_dir.clone(),
                        source,
                    },
                )
            })?;

        let plan = self
            .planner
            .plan(&job.range, job.channel_id)
            .await
            .map_err(|e| JobFailure::new(JobState::Planning, e))?;
        check_coverage(&job.range, &plan.segments)
            .map_err(|e| JobFailure::new(JobState::Planning, e))?;
        if !plan.sampling_complete {
            warn!(
                job = %job.id,
                "rotation sampling was incomplete; segments may straddle a key change"
            );
        }
        job.segments = plan.segments;

        let total = job.segments.len();
        for segment in job.segments.clone() {
            let stage = JobState::Running {
                segment: segment.index,
            };
            self.checkpoint(cancel, stage)?;
            self.transition(job, stage);
            self.publish(JobEvent::SegmentStarted {
                job_id: job.id,
                index: segment.index,
                total,
                range: segment.range,
            });

            let artifact = self
                .pipeline
                .run(&segment, job.channel_id, &job.work_dir)
                .await
                .map_err(|e| JobFailure::new(stage, e))?;
            job.artifacts.push(artifact);
        }

        self.checkpoint(cancel, JobState::Concatenating)?;
        self.transition(job, JobState::Concatenating);
        let final_path = job.final_artifact_path();
        let inputs: Vec<PathBuf> = job
            .artifacts
            .iter()
            .map(|a| a.merged_path.clone())
            .collect();
        self.media
            .concat(&inputs, &final_path)
            .await
            .map_err(|e| {
                JobFailure::new(
                    JobState::Concatenating,
                    RecorderError::ConcatenationFailed(e.to_string()),
                )
            })?;
        job.final_artifact = Some(final_path.clone());
        let size_bytes = artifact_size(&final_path)
            .await
            .map_err(|e| JobFailure::new(JobState::Concatenating, e))?;

        self.transition(job, JobState::Validating);
        self.check_size(size_bytes)
            .map_err(|e| JobFailure::new(JobState::Validating, e))?;

        self.checkpoint(cancel, JobState::Delivering)?;
        self.transition(job, JobState::Delivering);
        let location = self
            .deliver(job, &final_path, size_bytes)
            .await
            .map_err(|e| JobFailure::new(JobState::Delivering, e))?;

        Ok(JobReport {
            job_id: job.id,
            segments: total,
            size_bytes,
            location,
            sampling_complete: plan.sampling_complete,
        })
    }

    fn check_size(&self, size: u64) -> Result<(), RecorderError> {
        let (min, max) = (
            self.settings.min_artifact_bytes,
            self.settings.max_artifact_bytes,
        );
        if size < min || size > max {
            return Err(RecorderError::SizeOutOfBounds { size, min, max });
        }
        Ok(())
    }

    async fn deliver(
        &self,
        job: &Job,
        path: &Path,
        size_bytes: u64,
    ) -> Result<String, RecorderError> {
        let request = DeliveryRequest {
            path: path.to_path_buf(),
            size_bytes,
            metadata: DeliveryMetadata {
                job_id: job.id.to_string(),
                channel_id: job.channel_id,
                start: job.range.start(),
                end: job.range.end(),
                description: job.description(size_bytes),
            },
        };

        let job_id = job.id;
        let events = self.events.clone();
        let progress = move |sent: u64| {
            if let Some(hub) = &events {
                hub.publish(JobEvent::DeliveryProgress {
                    job_id,
                    sent,
                    total: size_bytes,
                });
            }
        };

        let policy = self.settings.delivery_retry;
        let deadline = self.settings.delivery_timeout;
        let (delivery, request, progress) = (&self.delivery, &request, &progress);
        let attempt = move || async move {
            match tokio::time::timeout(deadline, delivery.deliver(request, progress)).await {
                Ok(result) => result,
                Err(_) => Err(PortError::from(format!(
                    "delivery attempt timed out after {}s",
                    deadline.as_secs()
                ))),
            }
        };
        retry(&policy, "delivery", attempt)
            .await
            .map_err(|e| RecorderError::DeliveryFailed {
                attempts: policy.attempts.max(1),
                reason: e.to_string(),
            })
    }

    /// Remove every intermediate file and the job directory. Errors are logged only.
    async fn cleanup(&self, job: &Job) {
        let files = job
            .artifacts
            .iter()
            .flat_map(|a| a.files())
            .map(Path::to_path_buf)
            .chain(job.final_artifact.clone());
        for file in files {
            match tokio::fs::remove_file(&file).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %file.display(), error = %e, "failed to remove file"),
            }
        }

        match tokio::fs::remove_dir_all(&job.work_dir).await {
            Ok(()) => info!(job = %job.id, "cleanup completed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %job.work_dir.display(), error = %e, "failed to remove job directory")
            }
        }
    }

    fn checkpoint(&self, cancel: &CancellationToken, next: JobState) -> Result<(), JobFailure> {
        if cancel.is_cancelled() {
            info!(%next, "cancellation requested, stopping before next stage");
            return Err(JobFailure::new(next, RecorderError::Cancelled));
        }
        Ok(())
    }

    fn transition(&self, job: &mut Job, state: JobState) {
        job.state = state;
        self.publish(JobEvent::StateChanged {
            job_id: job.id,
            state,
        });
    }

    fn publish(&self, event: JobEvent) {
        if let Some(hub) = &self.events {
            hub.publish(event);
        }
    }
}

/// Size of the concatenated output. A missing file means concatenation
/// produced nothing.
async fn artifact_size(path: &Path) -> Result<u64, RecorderError> {
    let metadata = tokio::fs::metadata(path).await.map_err(|e| {
        RecorderError::ConcatenationFailed(format!(
            "final artifact {} missing: {}",
            path.display(),
            e
        ))
    })?;
    Ok(metadata.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{KeyRecord, TimeRange, Track};
    use crate::error::PortError;
    use crate::ports::delivery::ProgressFn;
    use crate::ports::downloader::MockDownloaderPort;
    use crate::ports::key_lookup::MockKeyLookupPort;
    use crate::ports::media::MockMediaToolPort;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    // 2025-04-04T11:00:00Z
    const ELEVEN: i64 = 1_743_764_400;
    const MIB: usize = 1024 * 1024;

    /// Delivery double that fails a configured number of times, then records
    /// what it was given.
    #[derive(Default)]
    struct FakeDelivery {
        failures_left: AtomicUsize,
        calls: AtomicUsize,
        delivered: Mutex<Vec<DeliveryRequest>>,
    }

    impl FakeDelivery {
        fn failing(times: usize) -> Self {
            Self {
                failures_left: AtomicUsize::new(times),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl DeliveryPort for Arc<FakeDelivery> {
        async fn deliver(
            &self,
            request: &DeliveryRequest,
            progress: ProgressFn<'_>,
        ) -> Result<String, PortError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err("transport reset".into());
            }
            progress(request.size_bytes);
            self.delivered.lock().unwrap().push(request.clone());
            Ok(format!("fake://{}", request.metadata.job_id))
        }
    }

    fn constant_keys() -> MockKeyLookupPort {
        let mut mock = MockKeyLookupPort::new();
        mock.expect_lookup()
            .returning(|_, _| Ok(vec![KeyRecord { key: "A".into() }]));
        mock
    }

    fn touching_downloader() -> MockDownloaderPort {
        let mut mock = MockDownloaderPort::new();
        mock.expect_download().returning(|req| {
            std::fs::write(&req.output, b"enc")?;
            Ok(())
        });
        mock
    }

    /// Media double: merge writes a stub, concat writes `final_size` bytes.
    fn media_writing(final_size: usize) -> MockMediaToolPort {
        let mut mock = MockMediaToolPort::new();
        mock.expect_merge().returning(|_, _, _, output| {
            std::fs::write(output, b"merged")?;
            Ok(())
        });
        mock.expect_concat().returning(move |inputs, output| {
            assert!(inputs.iter().all(|p| p.exists()));
            std::fs::write(output, vec![0u8; final_size])?;
            Ok(())
        });
        mock
    }

    fn config(work: &TempDir) -> RecorderConfig {
        let mut config = RecorderConfig::default();
        config.work_dir = work.path().to_path_buf();
        config.key_retry = RetryPolicy::new(1, Duration::ZERO);
        config.delivery_retry = RetryPolicy::new(3, Duration::ZERO);
        config
    }

    fn ninety_minutes() -> JobRequest {
        JobRequest::new(TimeRange::new(ELEVEN, ELEVEN + 90 * 60).unwrap(), 239)
    }

    fn dir_is_empty(dir: &TempDir) -> bool {
        std::fs::read_dir(dir.path()).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn full_job_delivers_and_cleans_up() {
        let work = TempDir::new().unwrap();
        let delivery = Arc::new(FakeDelivery::default());
        let hub = Arc::new(EventHub::new());
        let mut rx = hub.subscribe();

        let orchestrator = JobOrchestrator::new(
            constant_keys(),
            touching_downloader(),
            media_writing(2 * MIB),
            delivery.clone(),
            &config(&work),
        )
        .with_events(hub);

        let request = ninety_minutes();
        let report = orchestrator
            .execute(&request, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.segments, 6);
        assert_eq!(report.size_bytes, 2 * MIB as u64);
        assert!(report.sampling_complete);
        assert_eq!(report.location, format!("fake://{}", request.id));

        let delivered = delivery.delivered.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].metadata.channel_id, 239);
        assert!(dir_is_empty(&work));

        let mut states = Vec::new();
        let mut progress = Vec::new();
        while let Ok(event) = rx.try_recv() {
            match event {
                JobEvent::StateChanged { state, .. } => states.push(state),
                JobEvent::DeliveryProgress { sent, .. } => progress.push(sent),
                JobEvent::SegmentStarted { .. } => {}
            }
        }
        assert_eq!(states.first(), Some(&JobState::Planning));
        assert_eq!(states.last(), Some(&JobState::Done));
        assert!(states.contains(&JobState::Running { segment: 6 }));
        assert!(states.contains(&JobState::Validating));
        assert_eq!(progress, vec![2 * MIB as u64]);
    }

    #[tokio::test]
    async fn segment_three_download_failure_aborts_without_concat() {
        let work = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut downloader = MockDownloaderPort::new();
        let seen = calls.clone();
        downloader.expect_download().returning(move |req| {
            // Two downloads per segment: the fifth call is segment 3's video.
            if seen.fetch_add(1, Ordering::SeqCst) == 4 {
                return Err("HTTP Error 403".into());
            }
            std::fs::write(&req.output, b"enc")?;
            Ok(())
        });

        let mut media = MockMediaToolPort::new();
        media.expect_merge().times(2).returning(|_, _, _, output| {
            std::fs::write(output, b"merged")?;
            Ok(())
        });
        media.expect_concat().never();

        let delivery = Arc::new(FakeDelivery::default());
        // 75 minutes of fallback slicing gives five segments.
        let request = JobRequest::new(TimeRange::new(ELEVEN, ELEVEN + 75 * 60).unwrap(), 239);
        let failure = JobOrchestrator::new(
            constant_keys(),
            downloader,
            media,
            delivery.clone(),
            &config(&work),
        )
        .execute(&request, &CancellationToken::new())
        .await
        .unwrap_err();

        assert_eq!(failure.segment, Some(3));
        assert!(matches!(
            failure.error,
            RecorderError::DownloadFailed {
                track: Track::Video,
                ..
            }
        ));
        assert_eq!(delivery.calls.load(Ordering::SeqCst), 0);
        assert!(dir_is_empty(&work));
    }

    #[tokio::test]
    async fn undersized_artifact_blocks_delivery() {
        let work = TempDir::new().unwrap();
        let delivery = Arc::new(FakeDelivery::default());

        let failure = JobOrchestrator::new(
            constant_keys(),
            touching_downloader(),
            media_writing(MIB - 1),
            delivery.clone(),
            &config(&work),
        )
        .execute(&ninety_minutes(), &CancellationToken::new())
        .await
        .unwrap_err();

        assert_eq!(failure.stage, JobState::Validating);
        assert!(matches!(
            failure.error,
            RecorderError::SizeOutOfBounds { size, .. } if size == (MIB - 1) as u64
        ));
        assert_eq!(delivery.calls.load(Ordering::SeqCst), 0);
        assert!(dir_is_empty(&work));
    }

    #[tokio::test]
    async fn oversized_artifact_blocks_delivery() {
        let work = TempDir::new().unwrap();
        let delivery = Arc::new(FakeDelivery::default());
        let settings = OrchestratorSettings {
            max_artifact_bytes: 2 * MIB as u64,
            ..OrchestratorSettings::from(&config(&work))
        };

        let failure = JobOrchestrator::new(
            constant_keys(),
            touching_downloader(),
            media_writing(2 * MIB + 1),
            delivery.clone(),
            &config(&work),
        )
        .with_settings(settings)
        .execute(&ninety_minutes(), &CancellationToken::new())
        .await
        .unwrap_err();

        assert!(matches!(failure.error, RecorderError::SizeOutOfBounds { .. }));
        assert_eq!(delivery.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn delivery_is_retried_then_succeeds() {
        let work = TempDir::new().unwrap();
        let delivery = Arc::new(FakeDelivery::failing(2));

        let report = JobOrchestrator::new(
            constant_keys(),
            touching_downloader(),
            media_writing(MIB),
            delivery.clone(),
            &config(&work),
        )
        .execute(&ninety_minutes(), &CancellationToken::new())
        .await
        .unwrap();

        assert_eq!(report.size_bytes, MIB as u64);
        assert_eq!(delivery.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn delivery_failure_after_budget_is_reported_without_rerun() {
        let work = TempDir::new().unwrap();
        let delivery = Arc::new(FakeDelivery::failing(10));

        let mut media = MockMediaToolPort::new();
        media.expect_merge().times(6).returning(|_, _, _, output| {
            std::fs::write(output, b"merged")?;
            Ok(())
        });
        media.expect_concat().times(1).returning(|_, output| {
            std::fs::write(output, vec![0u8; MIB])?;
            Ok(())
        });

        let failure = JobOrchestrator::new(
            constant_keys(),
            touching_downloader(),
            media,
            delivery.clone(),
            &config(&work),
        )
        .execute(&ninety_minutes(), &CancellationToken::new())
        .await
        .unwrap_err();

        assert_eq!(failure.stage, JobState::Delivering);
        assert!(matches!(
            failure.error,
            RecorderError::DeliveryFailed { attempts: 3, .. }
        ));
        assert_eq!(delivery.calls.load(Ordering::SeqCst), 3);
        assert!(dir_is_empty(&work));
    }

    #[tokio::test]
    async fn concat_failure_is_tagged() {
        let work = TempDir::new().unwrap();
        let mut media = MockMediaToolPort::new();
        media.expect_merge().returning(|_, _, _, output| {
            std::fs::write(output, b"merged")?;
            Ok(())
        });
        media
            .expect_concat()
            .returning(|_, _| Err("non-monotonous DTS".into()));

        let failure = JobOrchestrator::new(
            constant_keys(),
            touching_downloader(),
            media,
            Arc::new(FakeDelivery::default()),
            &config(&work),
        )
        .execute(&ninety_minutes(), &CancellationToken::new())
        .await
        .unwrap_err();

        assert_eq!(failure.stage, JobState::Concatenating);
        assert!(matches!(failure.error, RecorderError::ConcatenationFailed(_)));
        assert!(dir_is_empty(&work));
    }

    /// Delivery double that never completes an attempt.
    #[derive(Default)]
    struct StalledDelivery {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DeliveryPort for Arc<StalledDelivery> {
        async fn deliver(
            &self,
            _request: &DeliveryRequest,
            _progress: ProgressFn<'_>,
        ) -> Result<String, PortError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_delivery_times_out_and_cleans_up() {
        let work = TempDir::new().unwrap();
        let delivery = Arc::new(StalledDelivery::default());
        let mut settings = config(&work);
        settings.delivery_timeout = Duration::from_secs(60);

        let orchestrator = JobOrchestrator::new(
            constant_keys(),
            touching_downloader(),
            media_writing(MIB),
            delivery.clone(),
            &settings,
        );
        let thirty_minutes = TimeRange::new(ELEVEN, ELEVEN + 30 * 60).unwrap();
        let request = JobRequest::new(thirty_minutes, 239);
        let failure = tokio::time::timeout(
            Duration::from_secs(24 * 3600),
            orchestrator.execute(&request, &CancellationToken::new()),
        )
        .await
        .expect("execute must return once every delivery attempt has timed out")
        .unwrap_err();

        assert_eq!(failure.stage, JobState::Delivering);
        match &failure.error {
            RecorderError::DeliveryFailed { attempts, reason } => {
                assert_eq!(*attempts, 3);
                assert!(reason.contains("timed out"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(delivery.calls.load(Ordering::SeqCst), 3);
        assert!(dir_is_empty(&work));
    }

    #[tokio::test]
    async fn concat_without_output_fails_in_concatenating_stage() {
        let work = TempDir::new().unwrap();
        let mut media = MockMediaToolPort::new();
        media.expect_merge().returning(|_, _, _, output| {
            std::fs::write(output, b"merged")?;
            Ok(())
        });
        media.expect_concat().returning(|_, _| Ok(()));
        let delivery = Arc::new(FakeDelivery::default());

        let failure = JobOrchestrator::new(
            constant_keys(),
            touching_downloader(),
            media,
            delivery.clone(),
            &config(&work),
        )
        .execute(&ninety_minutes(), &CancellationToken::new())
        .await
        .unwrap_err();

        assert_eq!(failure.stage, JobState::Concatenating);
        assert!(matches!(failure.error, RecorderError::ConcatenationFailed(_)));
        assert_eq!(delivery.calls.load(Ordering::SeqCst), 0);
        assert!(dir_is_empty(&work));
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_first_segment() {
        let work = TempDir::new().unwrap();
        let mut downloader = MockDownloaderPort::new();
        downloader.expect_download().never();
        let mut media = MockMediaToolPort::new();
        media.expect_merge().never();
        media.expect_concat().never();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let failure = JobOrchestrator::new(
            constant_keys(),
            downloader,
            media,
            Arc::new(FakeDelivery::default()),
            &config(&work),
        )
        .execute(&ninety_minutes(), &cancel)
        .await
        .unwrap_err();

        assert!(matches!(failure.error, RecorderError::Cancelled));
        assert_eq!(failure.segment, Some(1));
        assert!(dir_is_empty(&work));
    }

    #[tokio::test]
    async fn segments_are_processed_in_chronological_order() {
        let work = TempDir::new().unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut media = MockMediaToolPort::new();
        let seen = order.clone();
        media.expect_merge().returning(move |_, _, _, output| {
            seen.lock().unwrap().push(output.to_path_buf());
            std::fs::write(output, b"merged")?;
            Ok(())
        });
        let merged = order.clone();
        media.expect_concat().returning(move |inputs, output| {
            assert_eq!(inputs, merged.lock().unwrap().as_slice());
            std::fs::write(output, vec![0u8; MIB])?;
            Ok(())
        });

        JobOrchestrator::new(
            constant_keys(),
            touching_downloader(),
            media,
            Arc::new(FakeDelivery::default()),
            &config(&work),
        )
        .execute(&ninety_minutes(), &CancellationToken::new())
        .await
        .unwrap();

        let names: Vec<String> = order
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        for (i, name) in names.iter().enumerate() {
            assert!(name.starts_with(&format!("segment_{}_merged_", i + 1)));
        }
        assert_eq!(names.len(), 6);
    }
}
