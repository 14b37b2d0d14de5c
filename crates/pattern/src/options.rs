use bitflags::bitflags;

bitflags! {
    /// Compile-time options for a [`CompiledPattern`](crate::CompiledPattern).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PatternOptions: u32 {
        const CASE_INSENSITIVE = 1;
        /// Whitespace in the pattern is ignored and `#` starts a comment.
        const ALLOW_COMMENTS_AND_WHITESPACE = 1 << 1;
        /// Treat the whole pattern as a literal string.
        const IGNORE_METACHARACTERS = 1 << 2;
        /// `.` also matches line terminators.
        const DOT_MATCHES_LINE_SEPARATORS = 1 << 3;
        /// `^` and `$` match at line starts and ends, not only at the
        /// subject edges.
        const ANCHORS_MATCH_LINES = 1 << 4;
        /// Only `\n` terminates a line. Without it `\r` does too.
        const USE_UNIX_LINE_SEPARATORS = 1 << 5;
        /// Accepted for compatibility: `\b` is always Unicode-aware here.
        const USE_UNICODE_WORD_BOUNDARIES = 1 << 6;
    }
}

bitflags! {
    /// Per-enumeration options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MatchingOptions: u32 {
        /// Invoke the callback periodically while scanning, with
        /// [`MatchFlags::PROGRESS`].
        const REPORT_PROGRESS = 1;
        /// Invoke the callback once more after the last match, with
        /// [`MatchFlags::COMPLETED`].
        const REPORT_COMPLETION = 1 << 1;
        /// Matches must start at the search position; enumeration goes on
        /// only while matches are contiguous.
        const ANCHORED = 1 << 2;
        /// Assertions may look at text outside the search range.
        const WITH_TRANSPARENT_BOUNDS = 1 << 3;
        /// `^` and `$` do not match at the edges of the search range.
        const WITHOUT_ANCHORING_BOUNDS = 1 << 4;
    }
}

impl MatchingOptions {
    /// The options with the callback-reporting bits removed.
    pub fn without_reporting(self) -> Self {
        self - (Self::REPORT_PROGRESS | Self::REPORT_COMPLETION)
    }
}

bitflags! {
    /// Flags passed to an enumeration callback.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MatchFlags: u32 {
        /// Progress report; no match accompanies it.
        const PROGRESS = 1;
        /// Final invocation; no match accompanies it.
        const COMPLETED = 1 << 1;
        /// The search reached the end of the range.
        const HIT_END = 1 << 2;
        /// More input could have turned a match into a non-match.
        const REQUIRED_END = 1 << 3;
        /// The engine failed; the enumeration may be incomplete.
        const INTERNAL_ERROR = 1 << 4;
    }
}
