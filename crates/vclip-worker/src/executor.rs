//! JobExecutor: the consume/run/ack loop over `vclip-queue`'s durable
//! streams (spec.md §4.2/§5).
//!
//! Grounded on `vclip-worker`'s original executor shape (one consume loop,
//! bounded concurrency, a periodic recovery sweep) generalized to run the
//! new pipeline orchestrator and the new store/scheduler primitives instead
//! of the old in-process `VideoProcessor`.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use uuid::Uuid;

use vclip_firestore::{FirestoreClient, FirestoreConfig, JobStore};
use vclip_queue::{JobQueue, ProgressChannel, Scheduler, SchedulerConfig};
use vclip_storage::{R2Client, R2Config, StorageGateway};

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::logging::JobLogger;
use crate::pipeline::{run_pipeline, PipelineContext};

const CONSUME_BLOCK_MS: u64 = 5_000;
const CONSUME_BATCH: usize = 4;
const CLAIM_BATCH: usize = 8;

/// Owns every long-lived dependency the pipeline orchestrator needs and
/// drives the consume/run/ack loop.
pub struct JobExecutor {
    queue: JobQueue,
    job_store: JobStore,
    storage: StorageGateway,
    progress: ProgressChannel,
    scheduler: Arc<Scheduler>,
    config: WorkerConfig,
    consumer_name: String,
}

impl JobExecutor {
    /// Build every backing client from environment variables and wire them
    /// into one executor. Async because the Firestore/R2 clients perform a
    /// connectivity probe on construction.
    pub async fn new(config: WorkerConfig, queue: JobQueue) -> WorkerResult<Self> {
        let firestore_client = FirestoreClient::new(FirestoreConfig::from_env()?).await?;
        let job_store = JobStore::new(firestore_client);

        let r2_client = R2Client::new(R2Config::from_env()?).await?;
        let storage = StorageGateway::new(r2_client);

        let redis_url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let progress = ProgressChannel::new(&redis_url)?;

        let scheduler = Arc::new(Scheduler::new(SchedulerConfig {
            max_concurrent_pipelines: config.job_concurrency.unwrap_or(4),
            recovery_interval: config.queue_recovery_interval,
            stale_pipeline_threshold: config.stale_pipeline,
        }));

        let consumer_name = std::env::var("WORKER_CONSUMER_NAME").unwrap_or_else(|_| format!("worker-{}", Uuid::new_v4()));

        Ok(Self {
            queue,
            job_store,
            storage,
            progress,
            scheduler,
            config,
            consumer_name,
        })
    }

    /// Run forever: consume jobs, spawn each into its own task bounded by
    /// the Scheduler's semaphore, ack/dlq on completion, and periodically
    /// sweep for stale in-flight jobs left by a crashed worker
    /// (spec.md §4.2 recovery sweep).
    pub async fn run(self) -> WorkerResult<()> {
        let executor = Arc::new(self);
        let recovery_interval = executor.config.queue_recovery_interval;
        let recovery_handle = {
            let executor = executor.clone();
            tokio::spawn(async move { executor.run_recovery_sweep(recovery_interval).await })
        };

        loop {
            let claimed = match executor.queue.consume(&executor.consumer_name, CONSUME_BLOCK_MS, CONSUME_BATCH).await {
                Ok(jobs) => jobs,
                Err(e) => {
                    error!(error = %e, "queue consume failed");
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    continue;
                }
            };

            if claimed.is_empty() && recovery_handle.is_finished() {
                error!("recovery sweep task died, stopping worker");
                return Ok(());
            }

            for (priority, message_id, job) in claimed {
                let executor = executor.clone();
                tokio::spawn(async move {
                    executor.run_one(priority, message_id, job).await;
                });
            }
        }
    }

    async fn run_one(&self, priority: vclip_models::PriorityLevel, message_id: String, job: vclip_queue::PipelineJob) {
        let job_id = job.job_id.clone();
        let logger = JobLogger::new(&job_id, "pipeline_run");
        logger.log_start("pipeline run started");

        let guard = self.scheduler.acquire(job_id.clone()).await;
        self.progress.mark_active(&job_id).await.ok();

        let ctx = PipelineContext {
            job_store: &self.job_store,
            storage: &self.storage,
            progress: &self.progress,
            scheduler: &self.scheduler,
            config: &self.config,
        };

        let started = std::time::Instant::now();
        let result = run_pipeline(&ctx, &job_id).await;
        drop(guard);

        match result {
            Ok(()) => {
                logger.log_completion("pipeline run completed");
                self.scheduler.record_completion(started.elapsed()).await;
                self.queue.ack(priority, &message_id).await.ok();
                self.queue.clear_dedup(&job).await.ok();
            }
            Err(e) if e.is_cancellation() => {
                info!(job_id = %job_id, "job cancelled");
                self.progress.remove_active(&job_id).await.ok();
                self.queue.ack(priority, &message_id).await.ok();
            }
            Err(e) => {
                logger.log_error(&e.to_string());
                self.progress.remove_active(&job_id).await.ok();

                if e.is_retryable() {
                    let retries = self.queue.increment_retry(&message_id).await.unwrap_or(0);
                    if retries <= self.queue.max_retries() {
                        warn!(job_id = %job_id, attempt = retries, "retrying job after transient error");
                        self.queue.ack(priority, &message_id).await.ok();
                        let _ = self.queue.enqueue(job).await;
                        return;
                    }
                }

                self.job_store
                    .update(&job_id, None, |j| {
                        j.status = vclip_models::JobStatus::Failed;
                        j.error = Some(e.to_string());
                    })
                    .await
                    .ok();
                self.queue.dlq(priority, &message_id, &job, &e.to_string()).await.ok();
            }
        }
    }

    /// Periodically re-enqueue jobs whose `updated_at` is older than the
    /// stale-pipeline threshold, and reclaim stream entries idle too long
    /// (a worker crashed mid-job without acking).
    async fn run_recovery_sweep(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;

            let stale_before = chrono::Utc::now()
                - chrono::Duration::from_std(self.config.stale_pipeline).unwrap_or_else(|_| chrono::Duration::seconds(5400));
            match self.job_store.find_recoverable(stale_before).await {
                Ok(jobs) => {
                    for job in jobs {
                        warn!(job_id = %job.id, "recovering stale job");
                        let pipeline_job = vclip_queue::PipelineJob::new(job.id.clone(), job.owner_user_id.clone(), job.priority_level);
                        let _ = self.queue.enqueue(pipeline_job).await;
                    }
                }
                Err(e) => error!(error = %e, "stale-job scan failed"),
            }

            if let Ok(claimed) = self
                .queue
                .claim_pending(&self.consumer_name, interval.as_millis() as u64, CLAIM_BATCH)
                .await
            {
                for (priority, message_id, job) in claimed {
                    warn!(job_id = %job.job_id, "reclaimed abandoned message, re-running");
                    self.run_one(priority, message_id, job).await;
                }
            }
        }
    }
}
