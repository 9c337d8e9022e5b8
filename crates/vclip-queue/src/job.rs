//! The durable queue's wire envelope.
//!
//! The Scheduler and JobStore carry the full `Job` document; the durable
//! Redis Streams layer only needs enough to dispatch a worker and detect
//! duplicate enqueues (spec.md §6 `Enqueue`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vclip_models::{JobId, PriorityLevel};

/// One entry on the durable stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineJob {
    pub job_id: JobId,
    pub owner_user_id: String,
    pub priority_level: PriorityLevel,
    pub enqueued_at: DateTime<Utc>,
}

impl PipelineJob {
    pub fn new(job_id: JobId, owner_user_id: impl Into<String>, priority_level: PriorityLevel) -> Self {
        Self {
            job_id,
            owner_user_id: owner_user_id.into(),
            priority_level,
            enqueued_at: Utc::now(),
        }
    }

    /// Deduplicates repeated enqueues of the same job within the dedup TTL.
    pub fn idempotency_key(&self) -> String {
        format!("job:{}", self.job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_job_serde_roundtrip() {
        let job = PipelineJob::new(JobId::new(), "user-1", PriorityLevel::Priority);
        let json = serde_json::to_string(&job).expect("serialize PipelineJob");
        let decoded: PipelineJob = serde_json::from_str(&json).expect("deserialize PipelineJob");
        assert_eq!(decoded.job_id, job.job_id);
        assert_eq!(decoded.owner_user_id, job.owner_user_id);
        assert_eq!(decoded.priority_level, job.priority_level);
    }

    #[test]
    fn idempotency_key_is_stable_per_job() {
        let job_id = JobId::new();
        let a = PipelineJob::new(job_id.clone(), "user-1", PriorityLevel::Normal);
        let b = PipelineJob::new(job_id, "user-1", PriorityLevel::Normal);
        assert_eq!(a.idempotency_key(), b.idempotency_key());
    }
}
