//! Shared application state.

use std::sync::Arc;

use vclip_firestore::{FirestoreClient, JobStore};
use vclip_queue::{JobQueue, ProgressChannel, Scheduler, SchedulerConfig};
use vclip_storage::{R2Client, StorageGateway};

use crate::config::ApiConfig;

/// State shared across every handler: the durable queue the `Enqueue`
/// handler writes to, the job store `Cancel` reads for ownership checks,
/// the realtime publish channel `ws.rs` subscribes to, and a handle onto
/// the in-process `Scheduler` so `Cancel` can kill a running pipeline's
/// child processes immediately instead of waiting for the worker to poll
/// a cancellation flag.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub storage: Arc<StorageGateway>,
    pub firestore: Arc<FirestoreClient>,
    pub job_store: Arc<JobStore>,
    pub queue: Arc<JobQueue>,
    pub progress: Arc<ProgressChannel>,
    pub scheduler: Arc<Scheduler>,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let firestore = FirestoreClient::from_env().await?;
        let job_store = Arc::new(JobStore::new(firestore.clone()));
        let firestore_arc = Arc::new(firestore);

        let storage = StorageGateway::new(R2Client::from_env().await?);
        let queue = JobQueue::from_env()?;
        queue.init().await?;

        let redis_url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let progress = ProgressChannel::new(&redis_url)?;

        Ok(Self {
            config,
            storage: Arc::new(storage),
            firestore: firestore_arc,
            job_store,
            queue: Arc::new(queue),
            progress: Arc::new(progress),
            scheduler: Arc::new(Scheduler::new(SchedulerConfig::default())),
        })
    }
}
