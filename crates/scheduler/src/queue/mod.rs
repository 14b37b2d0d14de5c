//! Priority-ordered, concurrency-limited task queues.
//!
//! Split into focused submodules:
//! - `core`: `TaskQueue` handle, constructors, settings and accessors
//! - `dispatch`: submission, the dispatcher loop and finish bookkeeping
//!
//! A queue owns no threads. Dispatched tasks run on the worker pool of the
//! process-wide [`SchedulerContext`](crate::context::SchedulerContext), and
//! the queue's running counter gates how many of its tasks are in flight.

mod core;
mod dispatch;
#[cfg(test)]
mod tests;

pub use self::core::TaskQueue;
pub(crate) use self::core::QueueShared;
