use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::StrandError;

/// Floor for the auto-detected worker pool size. Task bodies may block on
/// other queued work, so tiny machines still get a few threads.
pub const MIN_WORKER_THREADS: usize = 4;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_usize(profile: &str, key: &str) -> Option<usize> {
    profiled_env_opt(profile, key).and_then(|v| v.parse().ok())
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    #[serde(default)]
    pub profile: String,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub pattern: PatternConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `STRAND_PROFILE`. When set (e.g. `CI`), every key
    /// is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_opt("STRAND_PROFILE").unwrap_or_default().to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let mut config = Self {
            profile: profile.to_uppercase(),
            ..Self::default()
        };
        config.apply_env_overrides();
        config
    }

    /// Parse a TOML document. Missing sections fall back to defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, StrandError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file, then layer environment overrides on top.
    pub fn load(path: &Path) -> Result<Self, StrandError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;
        config.profile = config.profile.to_uppercase();
        config.apply_env_overrides();
        config.validate()?;
        tracing::debug!(path = %path.display(), "config file loaded");
        Ok(config)
    }

    /// Overlay `STRAND_*` environment variables for the active profile.
    /// Unparseable values are ignored.
    pub fn apply_env_overrides(&mut self) {
        let p = self.profile.clone();
        if let Some(n) = profiled_env_usize(&p, "STRAND_WORKER_THREADS") {
            self.scheduler.worker_threads = n;
        }
        if let Some(prefix) = profiled_env_opt(&p, "STRAND_THREAD_PREFIX") {
            self.scheduler.thread_name_prefix = prefix;
        }
        if let Some(n) = profiled_env_usize(&p, "STRAND_PROGRESS_INTERVAL") {
            self.pattern.progress_interval = n;
        }
    }

    pub fn validate(&self) -> Result<(), StrandError> {
        if self.pattern.progress_interval == 0 {
            return Err(StrandError::InvalidConfig {
                key: "pattern.progress_interval".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.scheduler.main_queue_name.trim().is_empty() {
            return Err(StrandError::InvalidConfig {
                key: "scheduler.main_queue_name".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  scheduler:   workers={} (resolved {}), prefix={}, main_queue={}",
            self.scheduler.worker_threads,
            self.scheduler.resolved_worker_threads(),
            self.scheduler.thread_name_prefix,
            self.scheduler.main_queue_name,
        );
        tracing::info!("  pattern:     progress_interval={}", self.pattern.progress_interval);
    }

    /// Return the effective config as JSON (used by `strand --print-config`).
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "scheduler": {
                "worker_threads": self.scheduler.worker_threads,
                "resolved_worker_threads": self.scheduler.resolved_worker_threads(),
                "thread_name_prefix": self.scheduler.thread_name_prefix,
                "main_queue_name": self.scheduler.main_queue_name,
            },
            "pattern": { "progress_interval": self.pattern.progress_interval },
        })
    }
}

// ── Scheduler ─────────────────────────────────────────────────

/// Worker pool settings for the process-wide task scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Number of worker threads. 0 = available parallelism.
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    /// Prefix for worker thread names.
    #[serde(default = "default_thread_prefix")]
    pub thread_name_prefix: String,
    /// Name given to the serial main queue.
    #[serde(default = "default_main_queue_name")]
    pub main_queue_name: String,
}

fn default_worker_threads() -> usize { 0 }
fn default_thread_prefix() -> String { "strand-worker".to_string() }
fn default_main_queue_name() -> String { "main".to_string() }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_threads: default_worker_threads(),
            thread_name_prefix: default_thread_prefix(),
            main_queue_name: default_main_queue_name(),
        }
    }
}

impl SchedulerConfig {
    /// Resolve worker thread count (0 means use available parallelism,
    /// never fewer than [`MIN_WORKER_THREADS`]).
    pub fn resolved_worker_threads(&self) -> usize {
        if self.worker_threads == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get().max(MIN_WORKER_THREADS))
                .unwrap_or(MIN_WORKER_THREADS)
        } else {
            self.worker_threads
        }
    }
}

// ── Pattern ───────────────────────────────────────────────────

/// Settings for match enumeration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternConfig {
    /// Scanned bytes between progress reports during enumeration.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
}

fn default_progress_interval() -> usize { 4096 }

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            progress_interval: default_progress_interval(),
        }
    }
}
