use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Task dispatch priority. Lower numeric value = dispatched earlier.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    VeryHigh = 0,
    High = 1,
    #[default]
    Normal = 2,
    Low = 3,
    VeryLow = 4,
}

impl Priority {
    /// All tiers in dispatch order.
    pub const ALL: [Priority; 5] = [
        Priority::VeryHigh,
        Priority::High,
        Priority::Normal,
        Priority::Low,
        Priority::VeryLow,
    ];

    /// Bucket index, 0 for the first tier dispatched.
    pub fn tier(self) -> usize {
        self as usize
    }
}

/// Advisory quality-of-service class. Recorded and reported, never used
/// to reorder work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityOfService {
    UserInteractive,
    UserInitiated,
    Utility,
    Background,
    #[default]
    Default,
}

/// Observable task state.
///
/// `Initial` and `Ready` are both "not started yet"; the difference is
/// whether every dependency has finished. Cancellation is a separate flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Initial,
    Ready,
    Executing,
    Finished,
}

/// How a finished task ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    /// The body ran to completion.
    Completed,
    /// The task was cancelled before its body started.
    Cancelled,
    /// The body panicked; the payload message is kept for diagnostics.
    Panicked(String),
}

/// Unique task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TaskId(Uuid);

impl TaskId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}
