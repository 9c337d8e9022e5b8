//! Job submission and cancellation (spec.md §6 in-process external
//! interfaces): `Enqueue({jobId, user, requestedQuality?, priorityLevel})`
//! and `Cancel({jobId, requesterUserId?, reason?})`.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use vclip_models::{Job, JobId, JobStatus, PriorityLevel, RenderConfig};
use vclip_queue::PipelineJob;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Request body for `POST /jobs`.
#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    pub owner_user_id: String,
    pub input_object_key: String,
    #[serde(default)]
    pub requested_quality: Option<String>,
    #[serde(default)]
    pub priority_level: Option<PriorityLevel>,
    #[serde(default)]
    pub render_config: Option<RenderConfig>,
}

#[derive(Debug, Serialize)]
pub struct EnqueueResponse {
    pub job_id: String,
    pub status: String,
}

/// `POST /jobs` — create the `Job` document, then enqueue the durable
/// dispatch envelope. No-ops (by construction: a fresh job id is always
/// `queued`) rather than re-enqueuing an already-running job, matching
/// spec.md §4.2's `Enqueue` no-op-if-already-queued-or-running rule.
pub async fn enqueue_job(
    State(state): State<AppState>,
    Json(request): Json<EnqueueRequest>,
) -> ApiResult<Json<EnqueueResponse>> {
    if request.owner_user_id.trim().is_empty() {
        return Err(ApiError::bad_request("owner_user_id is required"));
    }
    if request.input_object_key.trim().is_empty() {
        return Err(ApiError::bad_request("input_object_key is required"));
    }

    let priority = request.priority_level.unwrap_or(PriorityLevel::Normal);
    let quality = request.requested_quality.unwrap_or_else(|| "standard".to_string());

    let mut job = Job::new(&request.owner_user_id, &request.input_object_key, &quality, priority);
    if let Some(render_config) = request.render_config {
        job.render_settings = render_config.normalized();
    }

    state
        .job_store
        .create(&job)
        .await
        .map_err(|e| ApiError::internal(format!("failed to persist job: {e}")))?;

    let envelope = PipelineJob::new(job.id.clone(), job.owner_user_id.clone(), priority);
    state
        .queue
        .enqueue(envelope)
        .await
        .map_err(|e| ApiError::internal(format!("failed to enqueue job: {e}")))?;

    info!(job_id = %job.id, owner = %job.owner_user_id, "enqueued job");

    Ok(Json(EnqueueResponse {
        job_id: job.id.as_str().to_string(),
        status: job.status.as_str().to_string(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub requester_user_id: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub id: String,
    pub status: String,
    pub running: bool,
    pub killed_count: usize,
    pub owner_user_id: String,
}

/// `POST /jobs/:job_id/cancel` (spec.md §6 `Cancel`).
///
/// Rejects jobs already in a terminal state, validates ownership when a
/// `requester_user_id` is given, marks the job in the Scheduler's cancel
/// set (SIGKILLing every registered child process), and writes
/// `status=failed` with `error=reason||"queue_canceled_by_user"`.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Json(request): Json<CancelRequest>,
) -> ApiResult<Json<CancelResponse>> {
    if !is_valid_job_id(&job_id) {
        return Err(ApiError::invalid_job_id(job_id));
    }
    let job_id = JobId::from_string(job_id);

    let job = state
        .job_store
        .get(&job_id)
        .await
        .map_err(|e| ApiError::internal(format!("failed to load job: {e}")))?
        .ok_or_else(|| ApiError::not_found(format!("job {job_id} not found")))?;

    if let Some(requester) = &request.requester_user_id {
        if requester != &job.owner_user_id {
            return Err(ApiError::cannot_cancel("requester does not own this job"));
        }
    }

    if job.status.is_terminal() {
        return Err(ApiError::cannot_cancel(format!(
            "job already in terminal state {}",
            job.status.as_str()
        )));
    }

    let running = state.scheduler.is_running(&job_id).await;
    let killed_count = state.scheduler.cancel(&job_id).await;

    let reason = request.reason.unwrap_or_else(|| "queue_canceled_by_user".to_string());
    let updated = state
        .job_store
        .update(&job_id, None, |j| {
            j.status = JobStatus::Failed;
            j.error = Some(reason.clone());
        })
        .await
        .map_err(|e| ApiError::internal(format!("failed to mark job failed: {e}")))?;

    info!(job_id = %job_id, running, killed_count, "canceled job");

    Ok(Json(CancelResponse {
        id: updated.id.as_str().to_string(),
        status: updated.status.as_str().to_string(),
        running,
        killed_count,
        owner_user_id: updated.owner_user_id,
    }))
}

/// Valid format: alphanumeric characters and hyphens only, 8-64 chars.
fn is_valid_job_id(id: &str) -> bool {
    if id.is_empty() || id.len() > 64 || id.len() < 8 {
        return false;
    }
    id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_job_ids() {
        assert!(is_valid_job_id("12345678"));
        assert!(is_valid_job_id("abc12345"));
        assert!(is_valid_job_id("abc-1234-def"));
    }

    #[test]
    fn test_invalid_job_ids() {
        assert!(!is_valid_job_id(""));
        assert!(!is_valid_job_id("short"));
        assert!(!is_valid_job_id("has space"));
        assert!(!is_valid_job_id("has_underscore"));
        assert!(!is_valid_job_id(&"a".repeat(65)));
    }
}
