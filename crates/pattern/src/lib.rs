//! Regular-expression match enumeration and template replacement.
//!
//! A [`CompiledPattern`] drives a [`MatchEngine`] over a byte range of a
//! subject string and reports matches, progress and completion through a
//! callback ([`CompiledPattern::enumerate_matches`]). Replacement templates
//! (`$n`, `\` escapes) are expanded per match, either into a new string or in
//! place.

pub mod engine;
mod enumerate;
pub mod error;
pub mod options;
pub mod pattern;
pub mod result;
mod template;

pub use engine::{EngineStep, MatchEngine, RegexEngine, SearchSummary};
pub use error::{EngineError, PatternError};
pub use options::{MatchFlags, MatchingOptions, PatternOptions};
pub use pattern::{CompiledPattern, PatternBuilder};
pub use result::MatchResult;
