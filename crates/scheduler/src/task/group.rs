use std::ops::Deref;

use crate::error::TaskError;

use super::{Body, Lifecycle, Task, Work};

/// A task that runs several closures sequentially, in insertion order, on
/// one worker.
///
/// Dependencies, cancellation and completion apply to the group as a whole.
/// A panic in one block skips the remaining blocks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskGroup {
    task: Task,
}

impl TaskGroup {
    pub fn new<F>(primary: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let primary: Work = Box::new(primary);
        Self {
            task: Task::from_body(Body::Group(vec![primary])),
        }
    }

    /// Append a closure that runs after every block added before it.
    pub fn add_execution_block<F>(&self, block: F) -> Result<(), TaskError>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut core = self.task.inner.core.lock();
        if core.start_claimed || core.lifecycle != Lifecycle::Pending {
            return Err(TaskError::AlreadyStarted(self.task.id()));
        }
        match &mut core.body {
            Body::Group(blocks) => blocks.push(Box::new(block)),
            // Groups are only ever built with a `Group` body.
            Body::Plain(_) => unreachable!("task group without group body"),
        }
        Ok(())
    }

    /// Number of closures queued, the primary one included. Zero once the
    /// group started executing.
    pub fn execution_block_count(&self) -> usize {
        match &self.task.inner.core.lock().body {
            Body::Group(blocks) => blocks.len(),
            Body::Plain(work) => usize::from(work.is_some()),
        }
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn into_task(self) -> Task {
        self.task
    }
}

impl Deref for TaskGroup {
    type Target = Task;

    fn deref(&self) -> &Task {
        &self.task
    }
}

impl From<TaskGroup> for Task {
    fn from(group: TaskGroup) -> Self {
        group.task
    }
}
