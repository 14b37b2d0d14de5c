use std::fmt;
use std::sync::Arc;

use strand_core::PatternConfig;
use tracing::debug;

use crate::engine::{MatchEngine, RegexEngine};
use crate::error::PatternError;
use crate::options::PatternOptions;

/// An immutable compiled regular expression.
///
/// Cheap to clone; clones share the engine.
#[derive(Clone)]
pub struct CompiledPattern {
    pattern: String,
    options: PatternOptions,
    pub(crate) engine: Arc<dyn MatchEngine>,
}

impl CompiledPattern {
    /// Compile with the default [`PatternConfig`].
    pub fn new(pattern: &str, options: PatternOptions) -> Result<Self, PatternError> {
        Self::builder(pattern).options(options).build()
    }

    pub fn builder(pattern: &str) -> PatternBuilder {
        PatternBuilder {
            pattern: pattern.to_string(),
            options: PatternOptions::empty(),
            progress_interval: PatternConfig::default().progress_interval,
        }
    }

    /// Wrap a custom engine. `pattern` and `options` are kept for display only.
    pub fn with_engine<E>(pattern: &str, options: PatternOptions, engine: E) -> Self
    where
        E: MatchEngine + 'static,
    {
        Self {
            pattern: pattern.to_string(),
            options,
            engine: Arc::new(engine),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn options(&self) -> PatternOptions {
        self.options
    }

    /// Number of capture groups, the overall match excluded.
    pub fn capture_group_count(&self) -> usize {
        self.engine.capture_group_count()
    }

    pub fn group_index(&self, name: &str) -> Option<usize> {
        self.engine.group_index(name)
    }

    /// A pattern source that matches `text` literally.
    pub fn escaped_pattern(text: &str) -> String {
        regex::escape(text)
    }
}

impl fmt::Debug for CompiledPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledPattern")
            .field("pattern", &self.pattern)
            .field("options", &self.options)
            .field("capture_groups", &self.capture_group_count())
            .finish()
    }
}

/// Builder for [`CompiledPattern`] with non-default settings.
#[derive(Debug, Clone)]
pub struct PatternBuilder {
    pattern: String,
    options: PatternOptions,
    progress_interval: usize,
}

impl PatternBuilder {
    pub fn options(mut self, options: PatternOptions) -> Self {
        self.options = options;
        self
    }

    /// Take enumeration settings from a loaded config.
    pub fn config(mut self, config: &PatternConfig) -> Self {
        self.progress_interval = config.progress_interval;
        self
    }

    /// Bytes scanned between progress reports. Zero is treated as one.
    pub fn progress_interval(mut self, bytes: usize) -> Self {
        self.progress_interval = bytes;
        self
    }

    pub fn build(self) -> Result<CompiledPattern, PatternError> {
        let engine = RegexEngine::compile(&self.pattern, self.options, self.progress_interval)
            .map_err(|source| PatternError::Compile {
                pattern: self.pattern.clone(),
                source,
            })?;
        debug!(
            pattern = %self.pattern,
            groups = engine.capture_group_count(),
            "pattern compiled"
        );
        Ok(CompiledPattern {
            pattern: self.pattern,
            options: self.options,
            engine: Arc::new(engine),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_reports_groups() {
        let p = CompiledPattern::new(r"(\w+)@(?P<host>\w+)", PatternOptions::empty()).unwrap();
        assert_eq!(p.capture_group_count(), 2);
        assert_eq!(p.group_index("host"), Some(2));
        assert_eq!(p.pattern(), r"(\w+)@(?P<host>\w+)");
    }

    #[test]
    fn compile_error_keeps_pattern() {
        let err = CompiledPattern::new("(unclosed", PatternOptions::empty()).unwrap_err();
        match err {
            PatternError::Compile { pattern, .. } => assert_eq!(pattern, "(unclosed"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn escaped_pattern_is_literal() {
        let source = CompiledPattern::escaped_pattern("1+1=2?");
        let p = CompiledPattern::new(&source, PatternOptions::empty()).unwrap();
        assert_eq!(p.capture_group_count(), 0);
        assert_eq!(
            p.range_of_first_match("is 1+1=2?", Default::default(), 0..9).unwrap(),
            Some(3..9)
        );
    }

    #[test]
    fn builder_applies_config() {
        let config = PatternConfig { progress_interval: 2 };
        let p = CompiledPattern::builder("a")
            .options(PatternOptions::CASE_INSENSITIVE)
            .config(&config)
            .build()
            .unwrap();
        assert_eq!(p.options(), PatternOptions::CASE_INSENSITIVE);
        assert!(format!("{p:?}").contains("capture_groups: 0"));
    }
}
