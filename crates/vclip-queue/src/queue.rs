//! Durable job queue using Redis Streams: two streams (priority, normal),
//! a consumer group per stream, idempotency dedup, a delayed-job sorted set,
//! and a dead-letter stream.

use std::time::Duration;

use redis::AsyncCommands;
use tracing::{debug, info, warn};
use vclip_models::PriorityLevel;

use crate::error::{QueueError, QueueResult};
use crate::job::PipelineJob;

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub redis_url: String,
    pub priority_stream_name: String,
    pub normal_stream_name: String,
    pub consumer_group: String,
    pub dlq_stream_name: String,
    pub scheduled_key: String,
    pub max_retries: u32,
    pub visibility_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            priority_stream_name: "vclip:jobs:priority".to_string(),
            normal_stream_name: "vclip:jobs:normal".to_string(),
            consumer_group: "vclip:workers".to_string(),
            dlq_stream_name: "vclip:dlq".to_string(),
            scheduled_key: "vclip:scheduled_jobs".to_string(),
            max_retries: 3,
            visibility_timeout: Duration::from_secs(600),
        }
    }
}

impl QueueConfig {
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            priority_stream_name: std::env::var("QUEUE_PRIORITY_STREAM")
                .unwrap_or_else(|_| "vclip:jobs:priority".to_string()),
            normal_stream_name: std::env::var("QUEUE_NORMAL_STREAM")
                .unwrap_or_else(|_| "vclip:jobs:normal".to_string()),
            consumer_group: std::env::var("QUEUE_CONSUMER_GROUP")
                .unwrap_or_else(|_| "vclip:workers".to_string()),
            dlq_stream_name: std::env::var("QUEUE_DLQ_STREAM")
                .unwrap_or_else(|_| "vclip:dlq".to_string()),
            scheduled_key: std::env::var("QUEUE_SCHEDULED_KEY")
                .unwrap_or_else(|_| "vclip:scheduled_jobs".to_string()),
            max_retries: std::env::var("QUEUE_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            visibility_timeout: Duration::from_secs(
                std::env::var("QUEUE_VISIBILITY_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
        }
    }
}

/// Durable job queue client.
pub struct JobQueue {
    client: redis::Client,
    config: QueueConfig,
}

impl JobQueue {
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    fn stream_for(&self, priority: PriorityLevel) -> &str {
        match priority {
            PriorityLevel::Priority => &self.config.priority_stream_name,
            PriorityLevel::Normal => &self.config.normal_stream_name,
        }
    }

    /// Create both consumer groups if they don't exist yet.
    pub async fn init(&self) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        for stream in [
            &self.config.priority_stream_name,
            &self.config.normal_stream_name,
        ] {
            let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
                .arg("CREATE")
                .arg(stream)
                .arg(&self.config.consumer_group)
                .arg("$")
                .arg("MKSTREAM")
                .query_async(&mut conn)
                .await;

            match result {
                Ok(_) => info!(stream = %stream, "created consumer group"),
                Err(e) if e.to_string().contains("BUSYGROUP") => {
                    debug!(stream = %stream, "consumer group already exists");
                }
                Err(e) => return Err(QueueError::Redis(e)),
            }
        }
        Ok(())
    }

    /// Enqueue a job onto its priority lane's stream.
    pub async fn enqueue(&self, job: PipelineJob) -> QueueResult<String> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let idempotency_key = job.idempotency_key();
        let dedup_key = format!("vclip:dedup:{}", idempotency_key);
        let exists: bool = conn.exists(&dedup_key).await?;
        if exists {
            warn!(key = %idempotency_key, "duplicate job rejected");
            return Err(QueueError::enqueue_failed("duplicate job"));
        }

        let payload = serde_json::to_string(&job)?;
        let stream = self.stream_for(job.priority_level).to_string();

        let message_id: String = redis::cmd("XADD")
            .arg(&stream)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .arg("key")
            .arg(&idempotency_key)
            .query_async(&mut conn)
            .await?;

        conn.set_ex::<_, _, ()>(&dedup_key, "1", 3600).await?;

        info!(job_id = %job.job_id, message_id = %message_id, "enqueued job");
        Ok(message_id)
    }

    /// Enqueue a job that becomes visible only after `delay` (spec.md §4.2
    /// scheduled-jobs sorted set).
    pub async fn enqueue_with_delay(&self, job: PipelineJob, delay: Duration) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let payload = serde_json::to_string(&job)?;
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let visible_at = now + delay.as_secs();

        redis::cmd("ZADD")
            .arg(&self.config.scheduled_key)
            .arg(visible_at)
            .arg(&payload)
            .query_async::<()>(&mut conn)
            .await?;

        info!(
            job_id = %job.job_id,
            delay_secs = delay.as_secs(),
            visible_at,
            "scheduled delayed job"
        );
        Ok(())
    }

    /// Move due scheduled jobs into their priority lane's stream.
    pub async fn process_scheduled_jobs(&self) -> QueueResult<usize> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let due_jobs: Vec<String> = redis::cmd("ZRANGEBYSCORE")
            .arg(&self.config.scheduled_key)
            .arg(0)
            .arg(now)
            .query_async(&mut conn)
            .await?;

        if due_jobs.is_empty() {
            return Ok(0);
        }

        let mut moved = 0;
        for payload in &due_jobs {
            match serde_json::from_str::<PipelineJob>(payload) {
                Ok(job) => match self.enqueue(job).await {
                    Ok(_) => moved += 1,
                    Err(QueueError::EnqueueFailed(_)) => {
                        debug!("scheduled job was duplicate, removing from schedule");
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to enqueue scheduled job");
                        continue;
                    }
                },
                Err(e) => warn!(error = %e, "failed to parse scheduled job"),
            }

            redis::cmd("ZREM")
                .arg(&self.config.scheduled_key)
                .arg(payload)
                .query_async::<()>(&mut conn)
                .await
                .ok();
        }

        if moved > 0 {
            info!(count = moved, "moved scheduled jobs to main queues");
        }
        Ok(moved)
    }

    pub async fn ack(&self, priority: PriorityLevel, message_id: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let stream = self.stream_for(priority).to_string();

        redis::cmd("XACK")
            .arg(&stream)
            .arg(&self.config.consumer_group)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        redis::cmd("XDEL")
            .arg(&stream)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        debug!(message_id = %message_id, "acknowledged job");
        Ok(())
    }

    pub async fn clear_dedup(&self, job: &PipelineJob) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let dedup_key = format!("vclip:dedup:{}", job.idempotency_key());
        conn.del::<_, ()>(&dedup_key).await?;
        Ok(())
    }

    pub async fn dlq(
        &self,
        priority: PriorityLevel,
        message_id: &str,
        job: &PipelineJob,
        error: &str,
    ) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(job)?;

        redis::cmd("XADD")
            .arg(&self.config.dlq_stream_name)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .arg("error")
            .arg(error)
            .arg("original_id")
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        self.ack(priority, message_id).await?;
        warn!(job_id = %job.job_id, error = %error, "moved job to DLQ");
        Ok(())
    }

    pub async fn len(&self, priority: PriorityLevel) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let stream = self.stream_for(priority).to_string();
        let len: u64 = conn.xlen(&stream).await?;
        Ok(len)
    }

    pub async fn dlq_len(&self) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let len: u64 = conn.xlen(&self.config.dlq_stream_name).await?;
        Ok(len)
    }

    /// Consume from the priority stream first; only poll the normal stream
    /// when the priority lane is empty, so priority jobs always drain first
    /// (spec.md §5 scheduling discipline).
    pub async fn consume(
        &self,
        consumer_name: &str,
        block_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<(PriorityLevel, String, PipelineJob)>> {
        let mut jobs = self
            .consume_stream(PriorityLevel::Priority, consumer_name, 0, count)
            .await?;
        if jobs.is_empty() {
            jobs = self
                .consume_stream(PriorityLevel::Normal, consumer_name, block_ms, count)
                .await?;
        }
        Ok(jobs)
    }

    async fn consume_stream(
        &self,
        priority: PriorityLevel,
        consumer_name: &str,
        block_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<(PriorityLevel, String, PipelineJob)>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let stream = self.stream_for(priority).to_string();

        let result: redis::streams::StreamReadReply = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg("COUNT")
            .arg(count)
            .arg("BLOCK")
            .arg(block_ms)
            .arg("STREAMS")
            .arg(&stream)
            .arg(">")
            .query_async(&mut conn)
            .await?;

        let mut jobs = Vec::new();
        for stream_key in result.keys {
            for entry in stream_key.ids {
                let message_id = entry.id.clone();
                if let Some(redis::Value::BulkString(payload)) = entry.map.get("job") {
                    let payload_str = String::from_utf8_lossy(payload);
                    match serde_json::from_str::<PipelineJob>(&payload_str) {
                        Ok(job) => {
                            debug!(job_id = %job.job_id, "consumed job from stream");
                            jobs.push((priority, message_id, job));
                        }
                        Err(e) => {
                            warn!(error = %e, "failed to parse job payload");
                            self.ack(priority, &message_id).await.ok();
                        }
                    }
                }
            }
        }
        Ok(jobs)
    }

    /// Claim pending jobs idle longer than `min_idle_ms` from both lanes,
    /// handling jobs left behind by a crashed worker (spec.md §4.2 recovery
    /// sweep).
    pub async fn claim_pending(
        &self,
        consumer_name: &str,
        min_idle_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<(PriorityLevel, String, PipelineJob)>> {
        let mut jobs = self
            .claim_pending_stream(PriorityLevel::Priority, consumer_name, min_idle_ms, count)
            .await?;
        jobs.extend(
            self.claim_pending_stream(PriorityLevel::Normal, consumer_name, min_idle_ms, count)
                .await?,
        );
        Ok(jobs)
    }

    async fn claim_pending_stream(
        &self,
        priority: PriorityLevel,
        consumer_name: &str,
        min_idle_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<(PriorityLevel, String, PipelineJob)>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let stream = self.stream_for(priority).to_string();

        let pending_count: usize = redis::cmd("XPENDING")
            .arg(&stream)
            .arg(&self.config.consumer_group)
            .query_async(&mut conn)
            .await
            .map(|reply: redis::streams::StreamPendingReply| reply.count())
            .unwrap_or(0);

        if pending_count == 0 {
            return Ok(Vec::new());
        }

        let pending_details: Vec<Vec<redis::Value>> = redis::cmd("XPENDING")
            .arg(&stream)
            .arg(&self.config.consumer_group)
            .arg("-")
            .arg("+")
            .arg(count)
            .query_async(&mut conn)
            .await?;

        let mut message_ids_to_claim = Vec::new();
        for detail in pending_details {
            if detail.len() >= 4 {
                if let (
                    Some(redis::Value::BulkString(id_bytes)),
                    Some(redis::Value::Int(idle_ms)),
                ) = (detail.get(0), detail.get(2))
                {
                    let idle_ms = *idle_ms as u64;
                    if idle_ms >= min_idle_ms {
                        if let Ok(id) = String::from_utf8(id_bytes.clone()) {
                            message_ids_to_claim.push(id);
                        }
                    }
                }
            }
        }

        if message_ids_to_claim.is_empty() {
            return Ok(Vec::new());
        }

        let mut cmd = redis::cmd("XCLAIM");
        cmd.arg(&stream)
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg(min_idle_ms);
        for msg_id in &message_ids_to_claim {
            cmd.arg(msg_id);
        }

        let claimed_messages: Vec<Vec<redis::Value>> = cmd.query_async(&mut conn).await?;

        let mut jobs = Vec::new();
        for message in claimed_messages {
            if message.len() >= 2 {
                if let (
                    Some(redis::Value::BulkString(id_bytes)),
                    Some(redis::Value::Array(fields)),
                ) = (message.get(0), message.get(1))
                {
                    if let Ok(message_id) = String::from_utf8(id_bytes.clone()) {
                        let mut job_payload: Option<String> = None;
                        let mut i = 0;
                        while i < fields.len().saturating_sub(1) {
                            if let (
                                Some(redis::Value::BulkString(field_bytes)),
                                Some(redis::Value::BulkString(value_bytes)),
                            ) = (fields.get(i), fields.get(i + 1))
                            {
                                if let (Ok(field), Ok(value)) = (
                                    String::from_utf8(field_bytes.clone()),
                                    String::from_utf8(value_bytes.clone()),
                                ) {
                                    if field == "job" {
                                        job_payload = Some(value);
                                        break;
                                    }
                                }
                            }
                            i += 2;
                        }

                        if let Some(payload) = job_payload {
                            match serde_json::from_str::<PipelineJob>(&payload) {
                                Ok(job) => {
                                    info!(job_id = %job.job_id, "claimed pending job from stream");
                                    jobs.push((priority, message_id, job));
                                }
                                Err(e) => {
                                    warn!(error = %e, "failed to parse claimed job payload");
                                    self.ack(priority, &message_id).await.ok();
                                }
                            }
                        }
                    }
                }
            }
        }
        Ok(jobs)
    }

    pub async fn get_retry_count(&self, message_id: &str) -> QueueResult<u32> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("vclip:retry:{}", message_id);
        let count: Option<u32> = conn.get(&key).await?;
        Ok(count.unwrap_or(0))
    }

    pub async fn increment_retry(&self, message_id: &str) -> QueueResult<u32> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("vclip:retry:{}", message_id);
        let count: u32 = conn.incr(&key, 1).await?;
        conn.expire::<_, ()>(&key, 86400).await?;
        Ok(count)
    }

    pub fn max_retries(&self) -> u32 {
        self.config.max_retries
    }

    /// Reset the idle timer for a message without transferring its payload.
    pub async fn refresh_visibility(
        &self,
        priority: PriorityLevel,
        consumer_name: &str,
        message_id: &str,
    ) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let stream = self.stream_for(priority).to_string();

        let _res: redis::Value = redis::cmd("XCLAIM")
            .arg(&stream)
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg(0)
            .arg(message_id)
            .arg("JUSTID")
            .query_async(&mut conn)
            .await?;

        Ok(())
    }
}
