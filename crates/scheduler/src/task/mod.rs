//! Schedulable units of work.
//!
//! Split into focused submodules:
//! - `dependencies`: dependency edges, cycle checks and readiness
//! - `execution`: `start()`, cancellation and finish bookkeeping
//! - `group`: [`TaskGroup`], a task running several closures in order
//!
//! Locking: each task has one mutex. Code holding a task's lock never takes
//! another task's lock or a queue lock; queues may lock a task while holding
//! their own lock.

mod dependencies;
mod execution;
mod group;
#[cfg(test)]
mod tests;

pub use self::group::TaskGroup;
pub(crate) use self::execution::panic_message;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::bucket::Prioritized;
use crate::error::TaskError;
use crate::queue::{QueueShared, TaskQueue};
use crate::types::{Priority, QualityOfService, TaskId, TaskOutcome, TaskState};
use crate::wait::wait_while;

pub(crate) type Work = Box<dyn FnOnce() + Send + 'static>;

/// The closures a task runs.
pub(crate) enum Body {
    Plain(Option<Work>),
    Group(Vec<Work>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lifecycle {
    Pending,
    Executing,
    Finished,
}

pub(crate) struct DependencyEdge {
    pub(crate) task: Task,
    /// Set once the dependency finished while this edge existed.
    pub(crate) satisfied: bool,
}

pub(crate) struct TaskCore {
    pub(crate) lifecycle: Lifecycle,
    pub(crate) cancelled: bool,
    /// `start()` has been entered (it may still be waiting on dependencies).
    pub(crate) start_claimed: bool,
    /// Finish bookkeeping is done; `wait_until_finished` may return.
    pub(crate) released: bool,
    pub(crate) name: Option<String>,
    pub(crate) priority: Priority,
    pub(crate) qos: QualityOfService,
    pub(crate) dependencies: Vec<DependencyEdge>,
    pub(crate) unsatisfied: usize,
    pub(crate) dependents: Vec<Weak<TaskInner>>,
    pub(crate) body: Body,
    pub(crate) completion: Option<Work>,
    pub(crate) queue: Option<Weak<QueueShared>>,
    pub(crate) outcome: Option<TaskOutcome>,
}

impl TaskCore {
    fn is_ready(&self) -> bool {
        self.lifecycle == Lifecycle::Pending && (self.unsatisfied == 0 || self.cancelled)
    }

    fn state(&self) -> TaskState {
        match self.lifecycle {
            Lifecycle::Pending if self.is_ready() => TaskState::Ready,
            Lifecycle::Pending => TaskState::Initial,
            Lifecycle::Executing => TaskState::Executing,
            Lifecycle::Finished => TaskState::Finished,
        }
    }
}

pub(crate) struct TaskInner {
    pub(crate) id: TaskId,
    pub(crate) core: Mutex<TaskCore>,
    /// Signalled on readiness, cancellation and release.
    pub(crate) changed: Condvar,
}

/// A shared handle to a unit of work.
///
/// Cloning is cheap; every clone refers to the same task. A task runs at
/// most once, either through a [`TaskQueue`] or a direct [`Task::start`].
#[derive(Clone)]
pub struct Task {
    pub(crate) inner: Arc<TaskInner>,
}

impl Task {
    /// An idle task with no body. Starting it just finishes it.
    pub fn new() -> Self {
        Self::from_body(Body::Plain(None))
    }

    pub fn with_body<F>(body: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::from_body(Body::Plain(Some(Box::new(body))))
    }

    pub(crate) fn from_body(body: Body) -> Self {
        Self {
            inner: Arc::new(TaskInner {
                id: TaskId::new(),
                core: Mutex::new(TaskCore {
                    lifecycle: Lifecycle::Pending,
                    cancelled: false,
                    start_claimed: false,
                    released: false,
                    name: None,
                    priority: Priority::default(),
                    qos: QualityOfService::default(),
                    dependencies: Vec::new(),
                    unsatisfied: 0,
                    dependents: Vec::new(),
                    body,
                    completion: None,
                    queue: None,
                    outcome: None,
                }),
                changed: Condvar::new(),
            }),
        }
    }

    pub fn id(&self) -> TaskId {
        self.inner.id
    }

    pub fn name(&self) -> Option<String> {
        self.inner.core.lock().name.clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.inner.core.lock().name = Some(name.into());
    }

    pub fn priority(&self) -> Priority {
        self.inner.core.lock().priority
    }

    /// Takes effect for queue ordering only if set before the task is enqueued.
    pub fn set_priority(&self, priority: Priority) {
        self.inner.core.lock().priority = priority;
    }

    pub fn quality_of_service(&self) -> QualityOfService {
        self.inner.core.lock().qos
    }

    pub fn set_quality_of_service(&self, qos: QualityOfService) {
        self.inner.core.lock().qos = qos;
    }

    /// Replace the work this task performs. For a [`TaskGroup`] this replaces
    /// the primary closure and keeps the extra blocks.
    pub fn set_body<F>(&self, body: F) -> Result<(), TaskError>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut core = self.inner.core.lock();
        if core.lifecycle != Lifecycle::Pending {
            return Err(TaskError::AlreadyStarted(self.inner.id));
        }
        let work: Work = Box::new(body);
        match &mut core.body {
            Body::Plain(slot) => *slot = Some(work),
            Body::Group(blocks) if blocks.is_empty() => blocks.push(work),
            Body::Group(blocks) => blocks[0] = work,
        }
        Ok(())
    }

    /// Register the closure invoked exactly once after the task finishes,
    /// cancelled or not. It runs on the worker pool, never inline.
    pub fn set_completion<F>(&self, completion: F) -> Result<(), TaskError>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut core = self.inner.core.lock();
        if core.lifecycle == Lifecycle::Finished {
            return Err(TaskError::AlreadyStarted(self.inner.id));
        }
        core.completion = Some(Box::new(completion));
        Ok(())
    }

    pub fn state(&self) -> TaskState {
        self.inner.core.lock().state()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.core.lock().cancelled
    }

    pub fn is_executing(&self) -> bool {
        self.inner.core.lock().lifecycle == Lifecycle::Executing
    }

    pub fn is_finished(&self) -> bool {
        self.inner.core.lock().lifecycle == Lifecycle::Finished
    }

    /// Not started, and either every dependency finished or the task was
    /// cancelled.
    pub fn is_ready(&self) -> bool {
        self.inner.core.lock().is_ready()
    }

    /// How the task ended, once finished.
    pub fn outcome(&self) -> Option<TaskOutcome> {
        self.inner.core.lock().outcome.clone()
    }

    /// The queue this task was submitted to, if it is still alive.
    pub fn owning_queue(&self) -> Option<TaskQueue> {
        let queue = self.inner.core.lock().queue.clone();
        queue
            .and_then(|weak| weak.upgrade())
            .map(TaskQueue::from_shared)
    }

    /// Block until the task finished and its bookkeeping is done.
    ///
    /// Called from a task body, the wait keeps the worker pool busy with
    /// other jobs, so the awaited task can still be dispatched.
    pub fn wait_until_finished(&self) {
        let mut core = self.inner.core.lock();
        wait_while(&mut core, &self.inner.changed, None, |core| !core.released);
    }

    /// Like [`wait_until_finished`](Self::wait_until_finished) with an upper
    /// bound. Returns whether the task finished in time.
    pub fn wait_until_finished_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut core = self.inner.core.lock();
        wait_while(&mut core, &self.inner.changed, Some(deadline), |core| !core.released)
    }

    /// A non-owning handle, for bodies that poll their own cancellation
    /// without keeping the task alive.
    pub fn downgrade(&self) -> WeakTask {
        WeakTask {
            inner: Arc::downgrade(&self.inner),
        }
    }

    // ── queue hooks ──────────────────────────────────────────

    pub(crate) fn attach_to_queue(&self, queue: &Weak<QueueShared>) -> Result<(), TaskError> {
        let mut core = self.inner.core.lock();
        if core.start_claimed || core.lifecycle != Lifecycle::Pending {
            return Err(TaskError::AlreadyStarted(self.inner.id));
        }
        if core.queue.is_some() {
            return Err(TaskError::AlreadyEnqueued(self.inner.id));
        }
        core.queue = Some(queue.clone());
        Ok(())
    }

    pub(crate) fn detach_from_queue(&self) {
        self.inner.core.lock().queue = None;
    }

    pub(crate) fn has_started(&self) -> bool {
        let core = self.inner.core.lock();
        core.start_claimed || core.lifecycle != Lifecycle::Pending
    }

    /// Whether a queue worker may pick this task up now.
    pub(crate) fn is_dispatchable(&self) -> bool {
        let core = self.inner.core.lock();
        !core.start_claimed && core.is_ready()
    }
}

pub(crate) fn poke(queue: Option<Weak<QueueShared>>) {
    if let Some(queue) = queue.and_then(|weak| weak.upgrade()) {
        queue.pump();
    }
}

impl Default for Task {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Task {}

impl Hash for Task {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl Prioritized for Task {
    fn priority(&self) -> Priority {
        Task::priority(self)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.inner.core.lock();
        f.debug_struct("Task")
            .field("id", &self.inner.id)
            .field("name", &core.name)
            .field("state", &core.state())
            .field("cancelled", &core.cancelled)
            .field("priority", &core.priority)
            .finish()
    }
}

/// Non-owning task handle. See [`Task::downgrade`].
#[derive(Clone)]
pub struct WeakTask {
    inner: Weak<TaskInner>,
}

impl WeakTask {
    pub fn upgrade(&self) -> Option<Task> {
        self.inner.upgrade().map(|inner| Task { inner })
    }

    pub fn is_cancelled(&self) -> bool {
        self.upgrade().is_some_and(|task| task.is_cancelled())
    }
}
