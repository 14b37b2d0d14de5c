use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("invalid pattern {pattern:?}: {source}")]
    Compile {
        pattern: String,
        #[source]
        source: regex_automata::meta::BuildError,
    },

    #[error("range {start}..{end} is not valid for a subject of {len} bytes")]
    InvalidRange { start: usize, end: usize, len: usize },
}

/// Failure inside a match engine while searching. Reported to enumeration
/// callers through [`MatchFlags::INTERNAL_ERROR`](crate::MatchFlags), never
/// returned.
#[derive(Debug, Error)]
#[error("match engine error: {0}")]
pub struct EngineError(pub String);
