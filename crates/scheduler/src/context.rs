//! Process-wide scheduler context: the worker pool every queue dispatches
//! onto, and the main queue.

use std::sync::OnceLock;

use parking_lot::Mutex;
use rayon::{ThreadPool, ThreadPoolBuilder};
use strand_core::{Config, SchedulerConfig};
use tracing::{error, info};

use crate::error::SchedulerError;
use crate::queue::TaskQueue;
use crate::task::panic_message;

static CONTEXT: OnceLock<SchedulerContext> = OnceLock::new();
static INIT_LOCK: Mutex<()> = parking_lot::const_mutex(());

pub struct SchedulerContext {
    config: SchedulerConfig,
    pool: ThreadPool,
    main_queue: OnceLock<TaskQueue>,
}

impl SchedulerContext {
    /// Initialise the context with an explicit configuration.
    ///
    /// Must run before anything touches the scheduler; once the context
    /// exists (explicitly or lazily) this returns
    /// [`SchedulerError::AlreadyInitialized`].
    pub fn init(config: SchedulerConfig) -> Result<&'static Self, SchedulerError> {
        let _guard = INIT_LOCK.lock();
        if CONTEXT.get().is_some() {
            return Err(SchedulerError::AlreadyInitialized);
        }
        let context = Self::build(config)?;
        Ok(CONTEXT.get_or_init(|| context))
    }

    /// The context, created on first use from the environment
    /// (`STRAND_WORKER_THREADS`, `STRAND_THREAD_PREFIX`).
    ///
    /// # Panics
    ///
    /// If the worker pool cannot be built. Use [`try_global`](Self::try_global)
    /// to handle that case.
    pub fn global() -> &'static Self {
        match Self::try_global() {
            Ok(context) => context,
            Err(err) => {
                error!(error = %err, "scheduler context unavailable");
                panic!("scheduler context unavailable: {err}");
            }
        }
    }

    /// Like [`global`](Self::global), returning pool build failures.
    pub fn try_global() -> Result<&'static Self, SchedulerError> {
        if let Some(context) = CONTEXT.get() {
            return Ok(context);
        }
        let _guard = INIT_LOCK.lock();
        if let Some(context) = CONTEXT.get() {
            return Ok(context);
        }
        let context = Self::build(Config::from_env().scheduler)?;
        Ok(CONTEXT.get_or_init(|| context))
    }

    /// Whether the calling thread is one of the scheduler's workers.
    pub(crate) fn on_worker_thread() -> bool {
        CONTEXT
            .get()
            .is_some_and(|context| context.pool.current_thread_index().is_some())
    }

    fn build(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        let workers = config.resolved_worker_threads();
        let prefix = config.thread_name_prefix.clone();
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(move |i| format!("{prefix}-{i}"))
            .panic_handler(|payload| {
                error!(panic = %panic_message(payload.as_ref()), "scheduler worker job panicked");
            })
            .build()?;
        info!(workers, prefix = %config.thread_name_prefix, "scheduler worker pool started");
        Ok(Self {
            config,
            pool,
            main_queue: OnceLock::new(),
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn worker_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn main_queue(&self) -> &TaskQueue {
        self.main_queue
            .get_or_init(|| TaskQueue::serial(self.config.main_queue_name.clone()))
    }

    pub(crate) fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.spawn(job);
    }
}
