use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::bucket::PriorityBucketList;
use crate::context::SchedulerContext;
use crate::error::TaskError;
use crate::metrics::QueueMetrics;
use crate::task::Task;
use crate::types::{Priority, QualityOfService};

static QUEUE_COUNTER: AtomicUsize = AtomicUsize::new(1);

thread_local! {
    static CURRENT_QUEUE: RefCell<Option<Weak<QueueShared>>> = const { RefCell::new(None) };
}

pub(crate) struct QueueState {
    pub(crate) name: String,
    /// Submitted tasks not yet handed to a worker.
    pub(crate) pending: PriorityBucketList<Task>,
    /// Every owned task that has not finished, in submission order.
    pub(crate) operations: Vec<Task>,
    /// `None` = unbounded.
    pub(crate) max_concurrent: Option<usize>,
    pub(crate) suspended: bool,
    /// Tasks handed to a worker whose `start()` has not returned.
    pub(crate) running: usize,
    pub(crate) qos: QualityOfService,
    pub(crate) metrics: QueueMetrics,
    /// Latest barrier task; later submissions wait for it.
    pub(crate) barrier: Option<Task>,
}

impl QueueState {
    pub(crate) fn has_capacity(&self) -> bool {
        self.max_concurrent.map_or(true, |max| self.running < max)
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.operations.is_empty() && self.running == 0
    }
}

pub(crate) struct QueueShared {
    pub(crate) state: Mutex<QueueState>,
    /// Signalled when the queue runs out of work.
    pub(crate) idle: Condvar,
}

/// A shared handle to a task queue.
///
/// Cloning is cheap; every clone refers to the same queue. Tasks are
/// dispatched in priority order (FIFO within a priority), only once ready,
/// and never more than [`max_concurrent_tasks`](Self::max_concurrent_tasks)
/// at a time.
#[derive(Clone)]
pub struct TaskQueue {
    pub(crate) shared: Arc<QueueShared>,
}

impl TaskQueue {
    /// An unbounded, running queue with a generated name.
    pub fn new() -> Self {
        let n = QUEUE_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self::named(format!("queue-{n}"))
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(QueueShared {
                state: Mutex::new(QueueState {
                    name: name.into(),
                    pending: PriorityBucketList::new(),
                    operations: Vec::new(),
                    max_concurrent: None,
                    suspended: false,
                    running: 0,
                    qos: QualityOfService::default(),
                    metrics: QueueMetrics::default(),
                    barrier: None,
                }),
                idle: Condvar::new(),
            }),
        }
    }

    /// A queue that runs one task at a time.
    pub fn serial(name: impl Into<String>) -> Self {
        let queue = Self::named(name);
        queue.shared.state.lock().max_concurrent = Some(1);
        queue
    }

    pub(crate) fn from_shared(shared: Arc<QueueShared>) -> Self {
        Self { shared }
    }

    /// The serial queue owned by the scheduler context.
    ///
    /// There is no platform run loop behind it; it is an ordinary queue
    /// limited to one task at a time, created on first use.
    pub fn main() -> TaskQueue {
        SchedulerContext::global().main_queue().clone()
    }

    /// The queue that dispatched the task running on this thread, if any.
    pub fn current() -> Option<TaskQueue> {
        CURRENT_QUEUE
            .with(|current| current.borrow().as_ref().and_then(Weak::upgrade))
            .map(Self::from_shared)
    }

    pub fn name(&self) -> String {
        self.shared.state.lock().name.clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.shared.state.lock().name = name.into();
    }

    pub fn max_concurrent_tasks(&self) -> Option<usize> {
        self.shared.state.lock().max_concurrent
    }

    /// Limit how many tasks of this queue execute at once. `None` removes the
    /// limit; zero is rejected. Raising the limit dispatches waiting tasks
    /// right away, lowering it lets running tasks finish.
    pub fn set_max_concurrent_tasks(&self, max: Option<usize>) -> Result<(), TaskError> {
        if max == Some(0) {
            return Err(TaskError::InvalidConcurrency);
        }
        {
            let mut state = self.shared.state.lock();
            state.max_concurrent = max;
            debug!(queue = %state.name, max = ?max, "max concurrent tasks changed");
        }
        self.shared.pump();
        Ok(())
    }

    pub fn is_suspended(&self) -> bool {
        self.shared.state.lock().suspended
    }

    /// Stop or resume dispatching. Tasks already executing are unaffected.
    pub fn set_suspended(&self, suspended: bool) {
        {
            let mut state = self.shared.state.lock();
            if state.suspended == suspended {
                return;
            }
            state.suspended = suspended;
            debug!(queue = %state.name, suspended, "queue suspension changed");
        }
        if !suspended {
            self.shared.pump();
        }
    }

    pub fn quality_of_service(&self) -> QualityOfService {
        self.shared.state.lock().qos
    }

    /// Advisory only; recorded, never used for ordering.
    pub fn set_quality_of_service(&self, qos: QualityOfService) {
        self.shared.state.lock().qos = qos;
    }

    /// Snapshot of the tasks owned by the queue that have not finished yet.
    /// Stale as soon as it is returned.
    pub fn operations(&self) -> Vec<Task> {
        self.shared.state.lock().operations.clone()
    }

    pub fn operation_count(&self) -> usize {
        self.shared.state.lock().operations.len()
    }

    /// Snapshot of the queue counters, with pending and running filled in.
    pub fn metrics(&self) -> QueueMetrics {
        let state = self.shared.state.lock();
        let mut metrics = state.metrics.clone();
        metrics.tasks_pending = Priority::ALL
            .iter()
            .map(|&priority| (priority, state.pending.len_for(priority)))
            .collect();
        metrics.running = state.running;
        metrics
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for TaskQueue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for TaskQueue {}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("TaskQueue")
            .field("name", &state.name)
            .field("operations", &state.operations.len())
            .field("running", &state.running)
            .field("max_concurrent", &state.max_concurrent)
            .field("suspended", &state.suspended)
            .finish()
    }
}

/// Marks the calling worker thread as running on behalf of a queue until
/// dropped.
pub(crate) struct CurrentQueueGuard {
    previous: Option<Weak<QueueShared>>,
}

impl CurrentQueueGuard {
    pub(crate) fn enter(queue: &Arc<QueueShared>) -> Self {
        let previous = CURRENT_QUEUE.with(|current| current.replace(Some(Arc::downgrade(queue))));
        Self { previous }
    }
}

impl Drop for CurrentQueueGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT_QUEUE.with(|current| *current.borrow_mut() = previous);
    }
}
