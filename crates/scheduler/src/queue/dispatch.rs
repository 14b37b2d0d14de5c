use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, trace, warn};

use crate::context::SchedulerContext;
use crate::error::TaskError;
use crate::task::Task;
use crate::wait::wait_while;

use super::core::{CurrentQueueGuard, QueueShared, TaskQueue};

impl TaskQueue {
    /// Submit a task. It runs once it is ready and a slot is free.
    ///
    /// Fails if the task already belongs to a queue or has started.
    pub fn add_task(&self, task: &Task) -> Result<(), TaskError> {
        self.add_tasks(std::slice::from_ref(task), false)
    }

    /// Submit a batch. Every task is queued before any is dispatched, so
    /// priority order holds within the batch. With `wait_until_finished`,
    /// blocks until each task of the batch finished.
    ///
    /// Either the whole batch is accepted or none of it.
    pub fn add_tasks(&self, tasks: &[Task], wait_until_finished: bool) -> Result<(), TaskError> {
        let queue = Arc::downgrade(&self.shared);
        for (i, task) in tasks.iter().enumerate() {
            if let Err(err) = task.attach_to_queue(&queue) {
                for attached in &tasks[..i] {
                    attached.detach_from_queue();
                }
                return Err(err);
            }
        }

        self.submit(tasks);

        if wait_until_finished {
            for task in tasks {
                task.wait_until_finished();
            }
        }
        Ok(())
    }

    /// Wrap a closure in a new task and submit it.
    pub fn add_task_with_body<F>(&self, body: F) -> Task
    where
        F: FnOnce() + Send + 'static,
    {
        let task = Task::with_body(body);
        task.inner.core.lock().queue = Some(Arc::downgrade(&self.shared));
        self.submit(std::slice::from_ref(&task));
        task
    }

    /// Submit a closure that runs only after every task currently owned by
    /// the queue finished. Tasks submitted afterwards wait for it.
    pub fn add_barrier_task<F>(&self, body: F) -> Task
    where
        F: FnOnce() + Send + 'static,
    {
        let task = Task::with_body(body);
        task.set_name("barrier");
        task.inner.core.lock().queue = Some(Arc::downgrade(&self.shared));

        let predecessors = {
            let mut state = self.shared.state.lock();
            state.barrier = Some(task.clone());
            state.operations.clone()
        };
        for predecessor in &predecessors {
            if let Err(err) = task.add_dependency(predecessor) {
                warn!(task = %task.id(), error = %err, "barrier could not wait for task");
            }
        }

        self.submit(std::slice::from_ref(&task));
        task
    }

    /// Cancel every task the queue owns right now. Does not wait.
    pub fn cancel_all_operations(&self) {
        let operations = self.operations();
        debug!(queue = %self.name(), count = operations.len(), "cancelling all operations");
        for task in &operations {
            task.cancel();
        }
    }

    /// Block until the queue owns no unfinished task and no worker is busy
    /// with one.
    pub fn wait_until_all_tasks_are_finished(&self) {
        let mut state = self.shared.state.lock();
        wait_while(&mut state, &self.shared.idle, None, |state| !state.is_idle());
    }

    /// Insert attached tasks into the ready structures and dispatch.
    fn submit(&self, tasks: &[Task]) {
        let barrier = self.shared.state.lock().barrier.clone();
        if let Some(barrier) = barrier {
            for task in tasks.iter().filter(|task| **task != barrier) {
                if let Err(err) = task.add_dependency(&barrier) {
                    debug!(task = %task.id(), error = %err, "barrier dependency rejected");
                }
            }
        }

        {
            let mut state = self.shared.state.lock();
            for task in tasks {
                // Started directly between attach and now; it finishes on its
                // own and must not be dispatched.
                if task.has_started() {
                    continue;
                }
                state.pending.insert(task.clone());
                state.operations.push(task.clone());
                state.metrics.tasks_enqueued += 1;
            }
            trace!(queue = %state.name, count = tasks.len(), pending = state.pending.len(), "tasks submitted");
        }

        self.shared.pump();
    }
}

impl QueueShared {
    /// Hand ready tasks to workers until the queue is suspended, at its
    /// concurrency limit, or out of ready tasks.
    pub(crate) fn pump(self: &Arc<Self>) {
        let mut state = self.state.lock();
        while !state.suspended && state.has_capacity() {
            let Some(task) = state.pending.dequeue_first_matching(Task::is_dispatchable) else {
                break;
            };
            state.running += 1;
            let running = state.running;
            state.metrics.observe_running(running);
            trace!(queue = %state.name, task = %task.id(), running, "dispatching task");

            let queue = Arc::clone(self);
            SchedulerContext::global().spawn(move || queue.run_dispatched(task));
        }
    }

    fn run_dispatched(self: Arc<Self>, task: Task) {
        let started = Instant::now();
        let outcome = {
            let _current = CurrentQueueGuard::enter(&self);
            match task.start() {
                Ok(()) => task.outcome(),
                Err(err) => {
                    debug!(task = %task.id(), error = %err, "dispatched task was started elsewhere");
                    None
                }
            }
        };

        {
            let mut state = self.state.lock();
            state.running -= 1;
            state.metrics.record_execution(outcome.as_ref(), started.elapsed());
            if state.is_idle() {
                self.idle.notify_all();
            }
        }
        self.pump();
    }

    /// Forget a finished task. Called exactly once per task, before its
    /// waiters are released.
    pub(crate) fn task_finished(&self, task: &Task) {
        let mut state = self.state.lock();
        if let Some(pos) = state.operations.iter().position(|t| t == task) {
            state.operations.remove(pos);
        }
        state.pending.remove(task);
        if state.barrier.as_ref() == Some(task) {
            state.barrier = None;
        }
        if state.is_idle() {
            self.idle.notify_all();
        }
    }
}

impl Drop for QueueShared {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        let abandoned: Vec<Task> =
            std::iter::from_fn(|| state.pending.dequeue_highest_priority()).collect();
        if abandoned.is_empty() {
            return;
        }
        warn!(
            queue = %state.name,
            count = abandoned.len(),
            "queue dropped with undispatched tasks, cancelling them"
        );
        // Retire them on the pool so their waiters and dependents are released.
        for task in abandoned {
            task.cancel();
            SchedulerContext::global().spawn(move || {
                if let Err(err) = task.start() {
                    debug!(task = %task.id(), error = %err, "abandoned task was started elsewhere");
                }
            });
        }
    }
}
