//! Realtime publish via Redis Pub/Sub, plus persistence and heartbeat
//! support used by the recovery sweep.
//!
//! Spec.md models `Publish(userId, {job})` as an external collaborator
//! interface; this module is the concrete low-cost implementation the
//! Scheduler depends on internally (one channel per user, carrying a
//! snapshot of the job).

use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use vclip_models::{JobId, JobStatus, StepName};

use crate::error::QueueResult;

const HEARTBEAT_KEY_PREFIX: &str = "heartbeat:";
const PROGRESS_HISTORY_PREFIX: &str = "progress:history:";
const ACTIVE_JOBS_KEY: &str = "jobs:active";

/// Job considered dead after this duration without a heartbeat.
pub const HEARTBEAT_TTL_SECS: u64 = 60;
/// Keep progress events for recovery.
pub const PROGRESS_HISTORY_TTL_SECS: u64 = 3600;
/// Cached job-status TTL for fast polling.
pub const JOB_STATUS_TTL_SECS: u64 = 86400;
/// Grace period before marking a job without heartbeat as stale.
pub const STALE_GRACE_PERIOD_SECS: i64 = 120;
/// No heartbeat for this long means stale.
pub const STALE_THRESHOLD_SECS: i64 = 60;

/// A snapshot of job progress, published per user (spec.md §6
/// `Publish(userId, {job})`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub job_id: JobId,
    pub status: JobStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<StepName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default = "default_timestamp")]
    pub timestamp_ms: i64,
    #[serde(default)]
    pub seq: u64,
}

fn default_timestamp() -> i64 {
    Utc::now().timestamp_millis()
}

impl ProgressEvent {
    pub fn new(job_id: JobId, status: JobStatus, progress: u8) -> Self {
        Self {
            job_id,
            status,
            progress,
            current_step: None,
            message: None,
            error: None,
            timestamp_ms: Utc::now().timestamp_millis(),
            seq: 0,
        }
    }

    pub fn with_step(mut self, step: StepName) -> Self {
        self.current_step = Some(step);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_seq(mut self, seq: u64) -> Self {
        self.seq = seq;
        self
    }
}

/// Channel for publishing/subscribing to progress events.
#[derive(Clone)]
pub struct ProgressChannel {
    client: redis::Client,
}

impl ProgressChannel {
    pub fn new(redis_url: &str) -> QueueResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    /// One channel per job; the API layer fans these out to any subscribed
    /// user-facing transport (spec.md §6 treats the transport as an
    /// external collaborator).
    pub fn channel_name(job_id: &JobId) -> String {
        format!("progress:{}", job_id)
    }

    pub async fn publish(&self, event: &ProgressEvent) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let channel = Self::channel_name(&event.job_id);
        let payload = serde_json::to_string(event)?;
        debug!(channel = %channel, "publishing progress event");
        conn.publish::<_, _, ()>(channel, payload).await?;
        Ok(())
    }

    /// Dual-write: pub/sub for live delivery, sorted set for history/recovery.
    pub async fn publish_with_history(&self, event: &ProgressEvent) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let channel = Self::channel_name(&event.job_id);
        let history_key = format!("{}{}", PROGRESS_HISTORY_PREFIX, event.job_id);
        let payload = serde_json::to_string(event)?;
        let score = event.timestamp_ms as f64;

        redis::pipe()
            .publish(&channel, &payload)
            .ignore()
            .zadd(&history_key, &payload, score)
            .ignore()
            .expire(&history_key, PROGRESS_HISTORY_TTL_SECS as i64)
            .ignore()
            .exec_async(&mut conn)
            .await?;

        Ok(())
    }

    /// Subscribe to progress events for a job.
    pub async fn subscribe(
        &self,
        job_id: &JobId,
    ) -> QueueResult<std::pin::Pin<Box<dyn futures_util::Stream<Item = ProgressEvent> + Send>>> {
        use futures_util::StreamExt;

        let mut pubsub = self.client.get_async_pubsub().await?;
        let channel = Self::channel_name(job_id);
        pubsub.subscribe(&channel).await?;

        let stream = pubsub.into_on_message().filter_map(|msg| async move {
            let payload: String = msg.get_payload().ok()?;
            serde_json::from_str(&payload).ok()
        });

        Ok(Box::pin(stream))
    }

    // -- Heartbeat, used by the stale-pipeline recovery sweep (spec.md §4.2) --

    pub async fn heartbeat(&self, job_id: &JobId) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("{}{}", HEARTBEAT_KEY_PREFIX, job_id);
        let now = Utc::now().timestamp();
        conn.set_ex::<_, _, ()>(&key, now, HEARTBEAT_TTL_SECS).await?;
        Ok(())
    }

    pub async fn is_alive(&self, job_id: &JobId) -> QueueResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("{}{}", HEARTBEAT_KEY_PREFIX, job_id);
        let exists: bool = conn.exists(&key).await?;
        Ok(exists)
    }

    pub async fn get_last_heartbeat(&self, job_id: &JobId) -> QueueResult<Option<i64>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("{}{}", HEARTBEAT_KEY_PREFIX, job_id);
        let timestamp: Option<i64> = conn.get(&key).await?;
        Ok(timestamp)
    }

    pub async fn clear_heartbeat(&self, job_id: &JobId) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("{}{}", HEARTBEAT_KEY_PREFIX, job_id);
        conn.del::<_, ()>(&key).await?;
        Ok(())
    }

    // -- Progress history --

    pub async fn get_history_since(
        &self,
        job_id: &JobId,
        since_ms: i64,
    ) -> QueueResult<Vec<ProgressEvent>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("{}{}", PROGRESS_HISTORY_PREFIX, job_id);
        let events: Vec<String> = conn.zrangebyscore(&key, since_ms as f64, "+inf").await?;
        Ok(events
            .into_iter()
            .filter_map(|s| serde_json::from_str(&s).ok())
            .collect())
    }

    pub async fn get_full_history(&self, job_id: &JobId) -> QueueResult<Vec<ProgressEvent>> {
        self.get_history_since(job_id, 0).await
    }

    pub async fn clear_history(&self, job_id: &JobId) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("{}{}", PROGRESS_HISTORY_PREFIX, job_id);
        conn.del::<_, ()>(&key).await?;
        Ok(())
    }

    // -- Active-jobs tracking, used by the recovery sweep to find in-flight jobs --

    pub async fn mark_active(&self, job_id: &JobId) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let score = Utc::now().timestamp_millis() as f64;
        conn.zadd::<_, _, _, ()>(ACTIVE_JOBS_KEY, job_id.to_string(), score)
            .await?;
        Ok(())
    }

    pub async fn remove_active(&self, job_id: &JobId) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.zrem::<_, _, ()>(ACTIVE_JOBS_KEY, job_id.to_string())
            .await?;
        self.clear_heartbeat(job_id).await?;
        Ok(())
    }

    pub async fn active_job_ids(&self) -> QueueResult<Vec<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let ids: Vec<String> = conn.zrange(ACTIVE_JOBS_KEY, 0, -1).await?;
        Ok(ids)
    }

    pub async fn active_job_count(&self) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let count: u64 = conn.zcard(ACTIVE_JOBS_KEY).await?;
        Ok(count)
    }

    /// Age of the active-set entry for `job_id`, used to detect a stale
    /// pipeline (spec.md §4.2, `STALE_PIPELINE_MS_DEFAULT`).
    pub async fn active_since(&self, job_id: &JobId) -> QueueResult<Option<DateTime<Utc>>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let score: Option<f64> = conn.zscore(ACTIVE_JOBS_KEY, job_id.to_string()).await?;
        Ok(score.and_then(|ms| DateTime::from_timestamp_millis(ms as i64)))
    }

    pub async fn cleanup_orphaned_active_jobs(&self, known_job_ids: &[String]) -> QueueResult<u32> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let tracked: Vec<String> = conn.zrange(ACTIVE_JOBS_KEY, 0, -1).await?;

        let mut removed = 0u32;
        for job_id in tracked {
            if !known_job_ids.contains(&job_id) {
                conn.zrem::<_, _, ()>(ACTIVE_JOBS_KEY, &job_id).await?;
                removed += 1;
                warn!(job_id = %job_id, "cleaned up orphaned active job");
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_event_serde_roundtrip() {
        let event = ProgressEvent::new(JobId::new(), JobStatus::Cutting, 42)
            .with_step(StepName::TimelineReorder)
            .with_message("trimming silence");
        let json = serde_json::to_string(&event).unwrap();
        let back: ProgressEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.status, JobStatus::Cutting);
        assert_eq!(back.progress, 42);
        assert_eq!(back.current_step, Some(StepName::TimelineReorder));
    }

    #[test]
    fn channel_name_is_per_job() {
        let id = JobId::new();
        assert_eq!(ProgressChannel::channel_name(&id), format!("progress:{id}"));
    }
}
