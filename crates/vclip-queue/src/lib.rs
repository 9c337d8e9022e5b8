//! Durable Redis Streams job queue, in-process priority Scheduler, and
//! realtime progress publish for the retention-editing pipeline.

pub mod error;
pub mod job;
pub mod progress;
pub mod queue;
pub mod scheduler;

pub use error::{QueueError, QueueResult};
pub use job::PipelineJob;
pub use progress::{
    ProgressChannel, ProgressEvent, HEARTBEAT_TTL_SECS, JOB_STATUS_TTL_SECS,
    PROGRESS_HISTORY_TTL_SECS, STALE_GRACE_PERIOD_SECS, STALE_THRESHOLD_SECS,
};
pub use queue::{JobQueue, QueueConfig};
pub use scheduler::{EtaSnapshot, Scheduler, SchedulerConfig};
