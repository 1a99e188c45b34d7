//! Job intake over HTTP.
//!
//! `POST /recordings` accepts either a human range string or explicit epoch
//! bounds and queues the job; `GET /health` answers liveness probes.

use crate::domain::{JobRequest, TimeRange};
use crate::error::RecorderError;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct IntakeState {
    pub jobs: mpsc::Sender<JobRequest>,
    pub default_channel_id: u32,
    pub max_range_secs: i64,
}

#[derive(Debug, Deserialize)]
pub struct RecordingRequest {
    /// `DD-MM-YYYY HH:MM AM/PM - DD-MM-YYYY HH:MM AM/PM`, host local time.
    pub range: Option<String>,
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub channel_id: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Accepted {
    pub job_id: Uuid,
    pub range: String,
    pub channel_id: u32,
}

pub fn router(state: IntakeState) -> Router {
    Router::new()
        .route("/recordings", post(create_recording))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn create_recording(
    State(state): State<IntakeState>,
    Json(body): Json<RecordingRequest>,
) -> Result<(StatusCode, Json<Accepted>), (StatusCode, String)> {
    let range = resolve_range(&body, state.max_range_secs)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let channel_id = body.channel_id.unwrap_or(state.default_channel_id);
    let request = JobRequest::new(range, channel_id);
    let job_id = request.id;

    state.jobs.send(request).await.map_err(|_| {
        warn!(%job_id, "worker queue closed, rejecting job");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "recorder is shutting down".to_string(),
        )
    })?;

    info!(%job_id, channel_id, %range, "recording queued");
    Ok((
        StatusCode::ACCEPTED,
        Json(Accepted {
            job_id,
            range: range.to_string(),
            channel_id,
        }),
    ))
}

fn resolve_range(body: &RecordingRequest, max_secs: i64) -> Result<TimeRange, RecorderError> {
    match (&body.range, body.start, body.end) {
        (Some(text), None, None) => TimeRange::parse_local(text, max_secs),
        (None, Some(start), Some(end)) => TimeRange::new(start, end)?.limited_to(max_secs),
        _ => Err(RecorderError::PreconditionViolation(
            "give either `range` or both `start` and `end`".into(),
        )),
    }
}
