//! Task plans: a list of named tasks with priorities and dependencies, run
//! on one queue.
//!
//! ```toml
//! queue = "nightly"
//! max_concurrent = 2
//!
//! [[task]]
//! name = "fetch"
//! priority = "high"
//! work_ms = 20
//!
//! [[task]]
//! name = "index"
//! depends_on = ["fetch"]
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use strand_scheduler::{Priority, QueueMetrics, Task, TaskGroup, TaskOutcome, TaskQueue};

type StartLog = Arc<Mutex<Vec<String>>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPlan {
    /// Name of the queue the plan runs on.
    #[serde(default = "default_queue_name")]
    pub queue: String,
    /// Concurrency limit; unbounded when absent.
    #[serde(default)]
    pub max_concurrent: Option<usize>,
    #[serde(default, rename = "task", alias = "tasks")]
    pub tasks: Vec<PlannedTask>,
}

fn default_queue_name() -> String {
    "plan".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedTask {
    pub name: String,
    #[serde(default)]
    pub priority: Priority,
    /// Names of tasks that must finish first.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Simulated work per block, in milliseconds.
    #[serde(default)]
    pub work_ms: u64,
    /// Extra blocks run after the first one (makes the task a group).
    #[serde(default)]
    pub extra_blocks: usize,
    /// Cancel the task before the queue starts.
    #[serde(default)]
    pub cancel: bool,
}

/// Result of running a plan.
#[derive(Debug, Serialize)]
pub struct PlanReport {
    pub queue: String,
    /// Task names in the order their bodies started.
    pub order: Vec<String>,
    pub tasks: Vec<TaskReport>,
    pub metrics: QueueMetrics,
}

#[derive(Debug, Serialize)]
pub struct TaskReport {
    pub name: String,
    pub priority: Priority,
    pub outcome: Option<TaskOutcome>,
}

impl TaskPlan {
    /// Load a plan file. `.json` files are parsed as JSON, anything else as
    /// TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read plan '{}'", path.display()))?;
        let plan = if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
        .with_context(|| format!("invalid plan '{}'", path.display()))?;
        debug!(path = %path.display(), tasks = plan.tasks.len(), "plan loaded");
        Ok(plan)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let plan: Self = toml::from_str(content)?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let plan: Self = serde_json::from_str(content)?;
        plan.validate()?;
        Ok(plan)
    }

    /// Names must be unique and every dependency must name a task of the plan.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent == Some(0) {
            bail!("max_concurrent must be at least 1");
        }
        let mut names = HashSet::new();
        for task in &self.tasks {
            if !names.insert(task.name.as_str()) {
                bail!("duplicate task name '{}'", task.name);
            }
        }
        for task in &self.tasks {
            if let Some(missing) = task.depends_on.iter().find(|dep| !names.contains(dep.as_str())) {
                bail!("task '{}' depends on unknown task '{}'", task.name, missing);
            }
        }
        Ok(())
    }

    /// Build every task, wire dependencies, run the plan to completion and
    /// report what happened.
    pub fn run(&self) -> Result<PlanReport> {
        self.validate()?;

        let queue = TaskQueue::named(self.queue.clone());
        queue.set_max_concurrent_tasks(self.max_concurrent)?;

        let started: StartLog = Arc::default();
        let tasks = self
            .tasks
            .iter()
            .map(|planned| planned.build(&started))
            .collect::<Result<Vec<Task>>>()?;
        let by_name: HashMap<&str, &Task> = self
            .tasks
            .iter()
            .map(|planned| planned.name.as_str())
            .zip(&tasks)
            .collect();

        for (planned, task) in self.tasks.iter().zip(&tasks) {
            for dep in &planned.depends_on {
                task.add_dependency(by_name[dep.as_str()])
                    .with_context(|| format!("cannot make '{}' wait for '{}'", planned.name, dep))?;
            }
            if planned.cancel {
                task.cancel();
            }
        }

        // Queue everything before the first dispatch so priorities apply
        // across the whole plan.
        queue.set_suspended(true);
        queue.add_tasks(&tasks, false)?;
        info!(queue = %self.queue, tasks = tasks.len(), max_concurrent = ?self.max_concurrent, "running plan");
        queue.set_suspended(false);
        queue.wait_until_all_tasks_are_finished();

        let order = started.lock().clone();
        let reports = self
            .tasks
            .iter()
            .zip(&tasks)
            .map(|(planned, task)| TaskReport {
                name: planned.name.clone(),
                priority: planned.priority,
                outcome: task.outcome(),
            })
            .collect();

        Ok(PlanReport {
            queue: self.queue.clone(),
            order,
            tasks: reports,
            metrics: queue.metrics(),
        })
    }
}

impl PlannedTask {
    fn build(&self, started: &StartLog) -> Result<Task> {
        let log = Arc::clone(started);
        let name = self.name.clone();
        let work = Duration::from_millis(self.work_ms);
        let first = move || {
            log.lock().push(name);
            thread::sleep(work);
        };

        let task = if self.extra_blocks == 0 {
            Task::with_body(first)
        } else {
            let group = TaskGroup::new(first);
            for _ in 0..self.extra_blocks {
                group.add_execution_block(move || thread::sleep(work))?;
            }
            group.into_task()
        };
        task.set_name(self.name.clone());
        task.set_priority(self.priority);
        Ok(task)
    }
}
