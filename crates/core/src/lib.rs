pub mod config;
pub mod error;

pub use config::{Config, PatternConfig, SchedulerConfig};
pub use error::*;
