//! Dependency-aware task scheduling.
//!
//! A [`Task`] is a unit of work with a priority, dependencies on other tasks,
//! cooperative cancellation and a completion closure. A [`TaskQueue`]
//! dispatches submitted tasks in priority order once they are ready, bounded
//! by its concurrency limit, onto the shared worker pool owned by the
//! [`SchedulerContext`].

pub mod bucket;
pub mod context;
pub mod error;
pub mod metrics;
pub mod queue;
pub mod task;
pub mod types;
mod wait;

pub use bucket::{Prioritized, PriorityBucketList};
pub use context::SchedulerContext;
pub use error::{SchedulerError, TaskError};
pub use metrics::QueueMetrics;
pub use queue::TaskQueue;
pub use task::{Task, TaskGroup, WeakTask};
pub use types::{Priority, QualityOfService, TaskId, TaskOutcome, TaskState};
