//! In-process priority Scheduler: bounded concurrency, a cancellation set,
//! and a registry of child processes, shared between the API layer and
//! RenderExecutor (spec.md §5 "Global mutable state").

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore};
use tracing::{info, warn};

use vclip_models::constants::{
    QUEUE_ETA_DEFAULT_SECONDS, QUEUE_ETA_MAX_SECONDS, QUEUE_ETA_MIN_SECONDS,
    SCHEDULER_ETA_WINDOW_SIZE,
};
use vclip_models::JobId;

/// Scheduler tuning knobs.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Maximum number of jobs the worker runs concurrently.
    pub max_concurrent_pipelines: usize,
    pub recovery_interval: Duration,
    pub stale_pipeline_threshold: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_pipelines: 4,
            recovery_interval: Duration::from_millis(
                vclip_models::constants::QUEUE_RECOVERY_INTERVAL_MS_DEFAULT,
            ),
            stale_pipeline_threshold: Duration::from_millis(
                vclip_models::constants::STALE_PIPELINE_MS_DEFAULT,
            ),
        }
    }
}

/// A registered external process (ffmpeg/ffprobe/sidecar) so `Cancel` can
/// SIGKILL it (spec.md §4.9 RenderExecutor contract, step 5).
#[derive(Debug)]
pub struct ChildHandle {
    pub pid: u32,
    pub description: String,
}

/// Process-wide scheduler state: the running set (enforced via the
/// semaphore), the cancellation set, and the per-job child-process registry
/// (spec.md §9 "Cyclic and shared data": "model as a synchronized map keyed
/// by jobId with weak references to process handles").
pub struct Scheduler {
    config: SchedulerConfig,
    semaphore: Arc<Semaphore>,
    running: Mutex<HashSet<JobId>>,
    cancelled: Mutex<HashSet<JobId>>,
    children: Mutex<HashMap<JobId, Vec<ChildHandle>>>,
    completion_durations: Mutex<VecDeque<Duration>>,
}

/// A permit held while a job runs; dropping it releases the concurrency
/// slot and clears the job from the running set.
pub struct RunGuard<'a> {
    scheduler: &'a Scheduler,
    job_id: JobId,
    _permit: tokio::sync::OwnedSemaphorePermit,
}

impl<'a> RunGuard<'a> {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }
}

impl<'a> Drop for RunGuard<'a> {
    fn drop(&mut self) {
        let scheduler = self.scheduler;
        let job_id = self.job_id.clone();
        tokio::spawn(async move {
            scheduler.running.lock().await.remove(&job_id);
            scheduler.cancelled.lock().await.remove(&job_id);
            scheduler.children.lock().await.remove(&job_id);
        });
    }
}

/// A point-in-time ETA estimate derived from the sliding window of recent
/// completion durations (spec.md §6 queue status ETA).
#[derive(Debug, Clone, Copy)]
pub struct EtaSnapshot {
    pub eta_seconds: u64,
    pub sample_count: usize,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_pipelines)),
            config,
            running: Mutex::new(HashSet::new()),
            cancelled: Mutex::new(HashSet::new()),
            children: Mutex::new(HashMap::new()),
            completion_durations: Mutex::new(VecDeque::with_capacity(SCHEDULER_ETA_WINDOW_SIZE)),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Block until a concurrency slot is free, then mark `job_id` as
    /// running. The returned guard releases the slot on drop.
    pub async fn acquire(&self, job_id: JobId) -> RunGuard<'_> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("scheduler semaphore is never closed");
        self.running.lock().await.insert(job_id.clone());
        info!(job_id = %job_id, "pipeline slot acquired");
        RunGuard {
            scheduler: self,
            job_id,
            _permit: permit,
        }
    }

    pub async fn is_running(&self, job_id: &JobId) -> bool {
        self.running.lock().await.contains(job_id)
    }

    pub async fn running_count(&self) -> usize {
        self.running.lock().await.len()
    }

    /// Mark a job for cancellation. RenderExecutor and every blocking stage
    /// check this cooperatively (spec.md §9 "cancellation is a cooperative
    /// context carried down to every blocking call"). Returns the number of
    /// child processes SIGKILLed, for spec.md §6 `Cancel`'s `killedCount`.
    pub async fn cancel(&self, job_id: &JobId) -> usize {
        self.cancelled.lock().await.insert(job_id.clone());
        let children = self.children.lock().await;
        let mut killed = 0;
        if let Some(handles) = children.get(job_id) {
            for handle in handles {
                warn!(job_id = %job_id, pid = handle.pid, desc = %handle.description, "killing child process for cancelled job");
                #[cfg(unix)]
                unsafe {
                    libc_kill(handle.pid);
                }
                killed += 1;
            }
        }
        killed
    }

    pub async fn is_cancelled(&self, job_id: &JobId) -> bool {
        self.cancelled.lock().await.contains(job_id)
    }

    pub async fn register_child(&self, job_id: &JobId, pid: u32, description: impl Into<String>) {
        self.children
            .lock()
            .await
            .entry(job_id.clone())
            .or_default()
            .push(ChildHandle {
                pid,
                description: description.into(),
            });
    }

    pub async fn clear_children(&self, job_id: &JobId) {
        self.children.lock().await.remove(job_id);
    }

    /// Record a finished job's wall-clock duration into the sliding window
    /// used for ETA estimation (spec.md §6).
    pub async fn record_completion(&self, duration: Duration) {
        let mut window = self.completion_durations.lock().await;
        window.push_back(duration);
        while window.len() > SCHEDULER_ETA_WINDOW_SIZE {
            window.pop_front();
        }
    }

    /// Average of the sliding window, clamped to
    /// `[QUEUE_ETA_MIN_SECONDS, QUEUE_ETA_MAX_SECONDS]`; falls back to
    /// `QUEUE_ETA_DEFAULT_SECONDS` with no samples yet.
    pub async fn eta_snapshot(&self) -> EtaSnapshot {
        let window = self.completion_durations.lock().await;
        if window.is_empty() {
            return EtaSnapshot {
                eta_seconds: QUEUE_ETA_DEFAULT_SECONDS,
                sample_count: 0,
            };
        }
        let total: Duration = window.iter().sum();
        let avg_secs = (total.as_secs_f64() / window.len() as f64).round() as u64;
        EtaSnapshot {
            eta_seconds: avg_secs.clamp(QUEUE_ETA_MIN_SECONDS, QUEUE_ETA_MAX_SECONDS),
            sample_count: window.len(),
        }
    }
}

#[cfg(unix)]
unsafe fn libc_kill(pid: u32) {
    extern "C" {
        fn kill(pid: i32, sig: i32) -> i32;
    }
    const SIGKILL: i32 = 9;
    kill(pid as i32, SIGKILL);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquire_respects_concurrency_cap() {
        let scheduler = Scheduler::new(SchedulerConfig {
            max_concurrent_pipelines: 1,
            ..SchedulerConfig::default()
        });
        let guard1 = scheduler.acquire(JobId::new()).await;
        assert_eq!(scheduler.running_count().await, 1);
        drop(guard1);
        tokio::task::yield_now().await;
    }

    #[tokio::test]
    async fn cancel_marks_job_cancelled() {
        let scheduler = Scheduler::new(SchedulerConfig::default());
        let job_id = JobId::new();
        assert!(!scheduler.is_cancelled(&job_id).await);
        let killed = scheduler.cancel(&job_id).await;
        assert!(scheduler.is_cancelled(&job_id).await);
        assert_eq!(killed, 0);
    }

    #[tokio::test]
    async fn eta_snapshot_defaults_with_no_samples() {
        let scheduler = Scheduler::new(SchedulerConfig::default());
        let snapshot = scheduler.eta_snapshot().await;
        assert_eq!(snapshot.sample_count, 0);
        assert_eq!(snapshot.eta_seconds, QUEUE_ETA_DEFAULT_SECONDS);
    }

    #[tokio::test]
    async fn eta_snapshot_averages_window() {
        let scheduler = Scheduler::new(SchedulerConfig::default());
        scheduler.record_completion(Duration::from_secs(100)).await;
        scheduler.record_completion(Duration::from_secs(200)).await;
        let snapshot = scheduler.eta_snapshot().await;
        assert_eq!(snapshot.eta_seconds, 150);
        assert_eq!(snapshot.sample_count, 2);
    }
}
