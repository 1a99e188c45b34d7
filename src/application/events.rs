//! Progress events published while a job runs.

use crate::domain::{JobState, TimeRange};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JobEvent {
    StateChanged {
        job_id: Uuid,
        state: JobState,
    },
    SegmentStarted {
        job_id: Uuid,
        index: usize,
        total: usize,
        range: TimeRange,
    },
    DeliveryProgress {
        job_id: Uuid,
        sent: u64,
        total: u64,
    },
}

#[derive(Debug)]
pub struct EventHub {
    sender: broadcast::Sender<JobEvent>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    /// Publish to current subscribers. Having none is not an error.
    pub fn publish(&self, event: JobEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }
}

/// Log every event from `hub` until the hub is dropped.
pub fn spawn_progress_logger(hub: &EventHub) -> tokio::task::JoinHandle<()> {
    let mut rx = hub.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(JobEvent::StateChanged { job_id, state }) if state.is_terminal() => {
                    info!(job = %job_id, %state, "job finished");
                }
                Ok(JobEvent::StateChanged { job_id, state }) => {
                    info!(job = %job_id, %state, "job state changed");
                }
                Ok(JobEvent::SegmentStarted {
                    job_id,
                    index,
                    total,
                    range,
                }) => {
                    info!(job = %job_id, "segment {}/{} ({})", index, total, range);
                }
                Ok(JobEvent::DeliveryProgress { job_id, sent, total }) => {
                    let percent = if total > 0 {
                        (sent as f64 / total as f64 * 100.0).min(100.0)
                    } else {
                        0.0
                    };
                    info!(job = %job_id, "delivery {:.1}%", percent);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    info!(skipped, "progress logger lagging");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
