use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, warn};

use crate::context::SchedulerContext;
use crate::error::TaskError;
use crate::types::TaskOutcome;
use crate::wait::wait_while;

use super::{poke, Body, Lifecycle, Task, Work};

impl Task {
    /// Run the task on the calling thread.
    ///
    /// Blocks until every dependency finished (or the task is cancelled),
    /// runs the body unless cancelled, then finishes: waiters are released,
    /// the owning queue forgets the task, dependents are notified and the
    /// completion closure is handed to the worker pool.
    ///
    /// Panics in the body are caught and recorded as
    /// [`TaskOutcome::Panicked`]. Starting a task twice is an error.
    pub fn start(&self) -> Result<(), TaskError> {
        let work = {
            let mut core = self.inner.core.lock();
            if core.start_claimed || core.lifecycle != Lifecycle::Pending {
                return Err(TaskError::AlreadyStarted(self.id()));
            }
            core.start_claimed = true;
            wait_while(&mut core, &self.inner.changed, None, |core| {
                core.unsatisfied > 0 && !core.cancelled
            });
            if core.cancelled {
                None
            } else {
                core.lifecycle = Lifecycle::Executing;
                Some(std::mem::replace(&mut core.body, Body::Plain(None)))
            }
        };

        let outcome = match work {
            None => {
                debug!(task = %self.id(), "cancelled before start, skipping body");
                TaskOutcome::Cancelled
            }
            Some(body) => {
                debug!(task = %self.id(), "task executing");
                run_body(body)
            }
        };

        if let TaskOutcome::Panicked(message) = &outcome {
            warn!(
                task = %self.id(),
                name = ?self.name(),
                panic = %message,
                "task body panicked"
            );
        }

        self.finish(outcome);
        Ok(())
    }

    /// Request cancellation.
    ///
    /// Idempotent and cooperative: a body that is already running keeps
    /// running. A task that has not started stops waiting for its
    /// dependencies and will finish without running its body. Dependents are
    /// not cancelled; they are released when this task finishes.
    pub fn cancel(&self) {
        let queue = {
            let mut core = self.inner.core.lock();
            if core.cancelled || core.lifecycle == Lifecycle::Finished {
                return;
            }
            core.cancelled = true;
            self.inner.changed.notify_all();
            core.queue.clone()
        };
        debug!(task = %self.id(), "task cancelled");
        poke(queue);
    }

    fn finish(&self, outcome: TaskOutcome) {
        let (queue, dependents, completion) = {
            let mut core = self.inner.core.lock();
            core.lifecycle = Lifecycle::Finished;
            core.outcome = Some(outcome);
            (
                core.queue.clone(),
                std::mem::take(&mut core.dependents),
                core.completion.take(),
            )
        };

        // Leave the queue before releasing waiters so that anyone woken by
        // this task observes an up-to-date operation count.
        if let Some(queue) = queue.and_then(|weak| weak.upgrade()) {
            queue.task_finished(self);
        }

        {
            let mut core = self.inner.core.lock();
            core.released = true;
            self.inner.changed.notify_all();
        }

        for dependent in dependents {
            if let Some(inner) = dependent.upgrade() {
                Task { inner }.dependency_finished(self.id());
            }
        }

        if let Some(completion) = completion {
            let id = self.id();
            SchedulerContext::global().spawn(move || {
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(completion)) {
                    warn!(
                        task = %id,
                        panic = %panic_message(payload.as_ref()),
                        "completion closure panicked"
                    );
                }
            });
        }
    }
}

/// Run every closure in order, stopping at the first panic.
fn run_body(body: Body) -> TaskOutcome {
    let blocks: Vec<Work> = match body {
        Body::Plain(work) => work.into_iter().collect(),
        Body::Group(blocks) => blocks,
    };
    for block in blocks {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(block)) {
            return TaskOutcome::Panicked(panic_message(payload.as_ref()));
        }
    }
    TaskOutcome::Completed
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
