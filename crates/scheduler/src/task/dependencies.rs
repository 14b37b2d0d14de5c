use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::error::TaskError;
use crate::types::TaskId;

use super::{poke, DependencyEdge, Lifecycle, Task};

/// Serializes edge insertion so two concurrent `add_dependency` calls cannot
/// close a cycle the other one has not seen yet. Only ever held while taking
/// single task locks.
static GRAPH_LOCK: Mutex<()> = parking_lot::const_mutex(());

impl Task {
    /// Make this task wait for `dependency` to finish before its body runs.
    ///
    /// Adding a dependency twice is a no-op. Fails if `dependency` is this
    /// task, if it already (transitively) depends on this task, or if this
    /// task has started executing.
    pub fn add_dependency(&self, dependency: &Task) -> Result<(), TaskError> {
        if self == dependency {
            return Err(TaskError::SelfDependency(self.id()));
        }

        let _graph = GRAPH_LOCK.lock();
        if dependency.depends_on(self) {
            return Err(TaskError::DependencyCycle {
                task: self.id(),
                dependency: dependency.id(),
            });
        }

        {
            let mut core = self.inner.core.lock();
            if core.lifecycle != Lifecycle::Pending {
                return Err(TaskError::AlreadyStarted(self.id()));
            }
            if core.dependencies.iter().any(|edge| edge.task == *dependency) {
                return Ok(());
            }
            core.dependencies.push(DependencyEdge {
                task: dependency.clone(),
                satisfied: false,
            });
            core.unsatisfied += 1;
        }

        // Registration happens after the edge exists, so a dependency that
        // finishes in between is caught by the lifecycle check below.
        let already_finished = {
            let mut dep = dependency.inner.core.lock();
            if dep.lifecycle == Lifecycle::Finished {
                true
            } else {
                dep.dependents.push(Arc::downgrade(&self.inner));
                false
            }
        };
        if already_finished {
            self.dependency_finished(dependency.id());
        }

        trace!(task = %self.id(), dependency = %dependency.id(), "dependency added");
        Ok(())
    }

    /// Drop a dependency. If it was the last unfinished one the task becomes
    /// ready. Removing a task that is not a dependency is a no-op.
    pub fn remove_dependency(&self, dependency: &Task) -> Result<(), TaskError> {
        let (became_ready, queue) = {
            let mut core = self.inner.core.lock();
            if core.lifecycle != Lifecycle::Pending {
                return Err(TaskError::AlreadyStarted(self.id()));
            }
            let Some(pos) = core.dependencies.iter().position(|e| e.task == *dependency) else {
                return Ok(());
            };
            let edge = core.dependencies.remove(pos);
            let mut became_ready = false;
            if !edge.satisfied {
                core.unsatisfied -= 1;
                if core.unsatisfied == 0 {
                    became_ready = true;
                    self.inner.changed.notify_all();
                }
            }
            (became_ready, core.queue.clone())
        };

        {
            let me = Arc::as_ptr(&self.inner);
            let mut dep = dependency.inner.core.lock();
            dep.dependents.retain(|weak| weak.as_ptr() != me);
        }

        trace!(task = %self.id(), dependency = %dependency.id(), "dependency removed");
        if became_ready {
            poke(queue);
        }
        Ok(())
    }

    /// Snapshot of the tasks this task waits for, in insertion order.
    pub fn dependencies(&self) -> Vec<Task> {
        self.inner
            .core
            .lock()
            .dependencies
            .iter()
            .map(|edge| edge.task.clone())
            .collect()
    }

    /// Number of dependencies that have not finished yet.
    pub fn pending_dependency_count(&self) -> usize {
        self.inner.core.lock().unsatisfied
    }

    /// Whether `target` is reachable through this task's dependency edges.
    fn depends_on(&self, target: &Task) -> bool {
        let mut stack = vec![self.clone()];
        let mut seen = HashSet::new();
        while let Some(task) = stack.pop() {
            if !seen.insert(task.id()) {
                continue;
            }
            for dep in task.dependencies() {
                if dep == *target {
                    return true;
                }
                stack.push(dep);
            }
        }
        false
    }

    /// Called by a dependency once it finished.
    pub(crate) fn dependency_finished(&self, dependency: TaskId) {
        let queue = {
            let mut core = self.inner.core.lock();
            let Some(edge) = core
                .dependencies
                .iter_mut()
                .find(|e| !e.satisfied && e.task.id() == dependency)
            else {
                // Removed meanwhile, or already counted.
                return;
            };
            edge.satisfied = true;
            core.unsatisfied -= 1;
            if core.unsatisfied > 0 {
                return;
            }
            self.inner.changed.notify_all();
            core.queue.clone()
        };
        trace!(task = %self.id(), "all dependencies finished");
        poke(queue);
    }
}
