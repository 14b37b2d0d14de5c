//! The matching backend behind a [`CompiledPattern`](crate::CompiledPattern).
//!
//! [`MatchEngine`] is the seam between enumeration and the regex
//! implementation. [`RegexEngine`] is the default, built on the meta regex
//! engine of `regex-automata` so a search span can sit inside a larger
//! haystack.

use std::ops::{ControlFlow, Range};

use regex_automata::meta::{BuildError, Regex};
use regex_automata::util::syntax;
use regex_automata::{Anchored, Input, PatternID};

use crate::error::EngineError;
use crate::options::{MatchingOptions, PatternOptions};
use crate::result::MatchResult;

/// What an engine reports while searching.
#[derive(Debug)]
pub enum EngineStep {
    Match(MatchResult),
    /// Another `progress_interval` bytes were scanned.
    Progress,
}

/// How a search ended, when it was not stopped by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchSummary {
    pub hit_end: bool,
    pub required_end: bool,
}

pub trait MatchEngine: Send + Sync {
    /// Number of capture groups, the overall match excluded.
    fn capture_group_count(&self) -> usize;

    /// Index of a named capture group.
    fn group_index(&self, _name: &str) -> Option<usize> {
        None
    }

    /// Report every match inside `range` of `subject`, in order, until
    /// `on_step` breaks or the range is exhausted.
    ///
    /// `range` has already been validated against `subject`.
    fn search(
        &self,
        subject: &str,
        range: Range<usize>,
        options: MatchingOptions,
        on_step: &mut dyn FnMut(EngineStep) -> ControlFlow<()>,
    ) -> Result<SearchSummary, EngineError>;
}

#[derive(Debug, Clone)]
pub struct RegexEngine {
    regex: Regex,
    progress_interval: usize,
}

impl RegexEngine {
    pub fn compile(
        pattern: &str,
        options: PatternOptions,
        progress_interval: usize,
    ) -> Result<Self, BuildError> {
        let source = if options.contains(PatternOptions::IGNORE_METACHARACTERS) {
            regex::escape(pattern)
        } else {
            pattern.to_string()
        };
        let syntax = syntax::Config::new()
            .case_insensitive(options.contains(PatternOptions::CASE_INSENSITIVE))
            .ignore_whitespace(options.contains(PatternOptions::ALLOW_COMMENTS_AND_WHITESPACE))
            .dot_matches_new_line(options.contains(PatternOptions::DOT_MATCHES_LINE_SEPARATORS))
            .multi_line(options.contains(PatternOptions::ANCHORS_MATCH_LINES))
            .crlf(!options.contains(PatternOptions::USE_UNIX_LINE_SEPARATORS));
        let regex = Regex::builder().syntax(syntax).build(&source)?;
        Ok(Self {
            regex,
            progress_interval: progress_interval.max(1),
        })
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

impl MatchEngine for RegexEngine {
    fn capture_group_count(&self) -> usize {
        self.regex
            .group_info()
            .group_len(PatternID::ZERO)
            .saturating_sub(1)
    }

    fn group_index(&self, name: &str) -> Option<usize> {
        self.regex.group_info().to_index(PatternID::ZERO, name)
    }

    fn search(
        &self,
        subject: &str,
        range: Range<usize>,
        options: MatchingOptions,
        on_step: &mut dyn FnMut(EngineStep) -> ControlFlow<()>,
    ) -> Result<SearchSummary, EngineError> {
        // Matches always lie inside the range. With opaque bounds the engine
        // sees only the range, so `^`, `$` and `\b` treat its edges as the
        // subject edges; otherwise the search span sits inside the whole
        // subject and assertions look past the range.
        let transparent = options.contains(MatchingOptions::WITH_TRANSPARENT_BOUNDS)
            || options.contains(MatchingOptions::WITHOUT_ANCHORING_BOUNDS);
        let (hay, base) = if transparent {
            (subject, 0)
        } else {
            (&subject[range.clone()], range.start)
        };
        let end = range.end - base;
        let anchored = if options.contains(MatchingOptions::ANCHORED) {
            Anchored::Yes
        } else {
            Anchored::No
        };

        let mut caps = self.regex.create_captures();
        let mut at = range.start - base;
        let mut reported = at;
        let mut summary = SearchSummary::default();

        while at <= end {
            let input = Input::new(hay).span(at..end).anchored(anchored);
            self.regex.search_captures(&input, &mut caps);
            let Some(m) = caps.get_match() else {
                // An anchored search gives up at the current position.
                summary.hit_end = anchored == Anchored::No || at == end;
                break;
            };

            let groups = (0..caps.group_len())
                .map(|i| caps.get_group(i).map(|span| span.start + base..span.end + base))
                .collect();
            if on_step(EngineStep::Match(MatchResult::new(groups))).is_break() {
                return Ok(summary);
            }

            at = if m.is_empty() {
                // Step over one character so an empty match is reported once.
                m.end() + hay[m.end()..].chars().next().map_or(1, char::len_utf8)
            } else {
                m.end()
            };
            if at > end {
                summary.hit_end = true;
            }

            let scanned = at.min(end);
            if scanned - reported >= self.progress_interval {
                reported = scanned;
                if on_step(EngineStep::Progress).is_break() {
                    return Ok(summary);
                }
            }
        }

        if summary.hit_end && end - reported.min(end) >= self.progress_interval {
            // Last step either way.
            let _ = on_step(EngineStep::Progress);
        }
        Ok(summary)
    }
}
