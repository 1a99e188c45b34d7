use super::key_service::KeyService;
use crate::config::{SamplingConfig, SamplingFailurePolicy};
use crate::domain::segments::{check_coverage, fixed_cadence, slice_at_rotations};
use crate::domain::time_range::format_local;
use crate::domain::{Segment, TimeRange};
use crate::error::RecorderError;
use crate::ports::key_lookup::KeyLookupPort;
use tracing::{info, warn};

/// Result of rotation sampling over a range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sampling {
    /// Instants at which the sampled key differed from the previous sample.
    pub rotations: Vec<i64>,
    /// False when a key query failed before the end of the range was reached.
    pub complete: bool,
}

/// Segment boundaries for a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub segments: Vec<Segment>,
    pub rotations: Vec<i64>,
    pub sampling_complete: bool,
    /// True when fixed-cadence slicing replaced rotation-based slicing.
    pub fallback: bool,
}

pub struct SegmentPlanner<L> {
    keys: KeyService<L>,
    config: SamplingConfig,
}

impl<L: KeyLookupPort> SegmentPlanner<L> {
    pub fn new(keys: KeyService<L>, config: SamplingConfig) -> Self {
        Self { keys, config }
    }

    /// Walk `range` in fixed steps, sampling a short key window at each step.
    /// Stops at the first failed or empty lookup.
    pub async fn sample_rotations(&self, range: &TimeRange, channel_id: u32) -> Sampling {
        let mut rotations = Vec::new();
        let mut previous: Option<String> = None;
        let mut current = range.start();

        if self.config.step_secs <= 0 {
            warn!(step = self.config.step_secs, "sampling step must be positive");
            return Sampling {
                rotations,
                complete: false,
            };
        }

        while current < range.end() {
            let window = match TimeRange::window(current, self.config.window_secs) {
                Ok(window) => window,
                Err(e) => {
                    warn!(error = %e, "invalid sampling window");
                    return Sampling {
                        rotations,
                        complete: false,
                    };
                }
            };
            let key = match self.keys.fetch_keys(&window, channel_id).await {
                Ok(keys) => keys.into_iter().next().map(|record| record.key),
                Err(e) => {
                    warn!(at = %format_local(current), error = %e, "key sampling failed");
                    None
                }
            };
            let Some(key) = key else {
                warn!(at = %format_local(current), "stopping rotation sampling early");
                return Sampling {
                    rotations,
                    complete: false,
                };
            };

            if previous.as_deref().is_some_and(|p| p != key) {
                info!(at = %format_local(current), "key rotation detected");
                rotations.push(current);
            }
            previous = Some(key);
            current += self.config.step_secs;
        }

        Sampling {
            rotations,
            complete: true,
        }
    }

    /// Split `range` so that no segment straddles a detected key rotation.
    ///
    /// When sampling finds no rotation the range is sliced at a fixed
    /// quarter-hour cadence instead of being returned as one segment.
    pub async fn plan(&self, range: &TimeRange, channel_id: u32) -> Result<Plan, RecorderError> {
        let sampling = self.sample_rotations(range, channel_id).await;

        if !sampling.complete {
            match self.config.on_failure {
                SamplingFailurePolicy::Degrade => {
                    warn!(
                        found = sampling.rotations.len(),
                        "planning from incomplete sampling; later rotations may be missed"
                    );
                }
                SamplingFailurePolicy::Fallback => {
                    warn!("sampling incomplete, using fixed cadence");
                    return self.finish(range, sampling, Vec::new());
                }
                SamplingFailurePolicy::Abort => {
                    return Err(RecorderError::KeyUnavailable(format!(
                        "rotation sampling for {} did not complete",
                        range
                    )));
                }
            }
        }

        let segments = slice_at_rotations(range, &sampling.rotations);
        self.finish(range, sampling, segments)
    }

    fn finish(
        &self,
        range: &TimeRange,
        sampling: Sampling,
        segments: Vec<Segment>,
    ) -> Result<Plan, RecorderError> {
        let (segments, fallback) = if segments.len() <= 1 {
            (fixed_cadence(range, self.config.fallback_segment_secs), true)
        } else {
            (segments, false)
        };
        check_coverage(range, &segments)?;

        info!(
            segments = segments.len(),
            rotations = sampling.rotations.len(),
            fallback,
            "segment plan ready"
        );
        Ok(Plan {
            segments,
            rotations: sampling.rotations,
            sampling_complete: sampling.complete,
            fallback,
        })
    }
}
