use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{Priority, TaskOutcome};

/// Per-queue operational metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueMetrics {
    /// Tasks ever submitted to the queue.
    pub tasks_enqueued: u64,
    /// Tasks whose body ran to completion.
    pub tasks_completed: u64,
    /// Tasks retired without running their body.
    pub tasks_cancelled: u64,
    /// Tasks whose body panicked.
    pub tasks_panicked: u64,
    /// Tasks waiting for dispatch, per priority tier (filled on snapshot).
    pub tasks_pending: HashMap<Priority, usize>,
    /// Tasks executing right now (filled on snapshot).
    pub running: usize,
    /// Highest number of simultaneously dispatched tasks observed.
    pub peak_concurrency: usize,
    /// Average wall time of a dispatched task.
    pub avg_task_duration: Duration,
    /// When the last dispatched task finished.
    pub last_finished: Option<DateTime<Utc>>,
}

impl QueueMetrics {
    pub fn tasks_finished(&self) -> u64 {
        self.tasks_completed + self.tasks_cancelled + self.tasks_panicked
    }

    /// Record a dispatched task that just returned.
    pub fn record_execution(&mut self, outcome: Option<&TaskOutcome>, duration: Duration) {
        match outcome {
            Some(TaskOutcome::Completed) => self.tasks_completed += 1,
            Some(TaskOutcome::Cancelled) => self.tasks_cancelled += 1,
            Some(TaskOutcome::Panicked(_)) => self.tasks_panicked += 1,
            // Started elsewhere; the worker only observed it.
            None => return,
        }
        self.last_finished = Some(Utc::now());

        // Incremental mean: new_avg = prev_avg + (duration - prev_avg) / count
        let count = self.tasks_finished();
        self.avg_task_duration = if count == 1 {
            duration
        } else {
            let prev_nanos = self.avg_task_duration.as_nanos() as f64;
            let cur_nanos = duration.as_nanos() as f64;
            let avg_nanos = prev_nanos + (cur_nanos - prev_nanos) / count as f64;
            Duration::from_nanos(avg_nanos as u64)
        };
    }

    pub fn observe_running(&mut self, running: usize) {
        self.peak_concurrency = self.peak_concurrency.max(running);
    }
}
