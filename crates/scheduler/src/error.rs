//! Scheduler error types.

use thiserror::Error;

use crate::types::TaskId;

/// Misuse of the task or queue API. Rejected calls leave all state untouched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("task {0} cannot depend on itself")]
    SelfDependency(TaskId),

    #[error("adding dependency {dependency} to task {task} would create a cycle")]
    DependencyCycle { task: TaskId, dependency: TaskId },

    #[error("task {0} has already started")]
    AlreadyStarted(TaskId),

    #[error("task {0} already belongs to a queue")]
    AlreadyEnqueued(TaskId),

    #[error("max concurrent tasks must be at least 1")]
    InvalidConcurrency,
}

/// Failures setting up the process-wide scheduler context.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler context already initialized")]
    AlreadyInitialized,

    #[error("failed to build worker pool: {0}")]
    PoolBuild(#[from] rayon::ThreadPoolBuildError),
}
