use std::ops::{ControlFlow, Range};

use tracing::{trace, warn};

use crate::engine::EngineStep;
use crate::error::PatternError;
use crate::options::{MatchFlags, MatchingOptions};
use crate::pattern::CompiledPattern;
use crate::result::MatchResult;

impl CompiledPattern {
    /// Call `block` once per match of the pattern inside `range` of
    /// `subject`, in order.
    ///
    /// With [`MatchingOptions::REPORT_PROGRESS`] the block is also called
    /// periodically with no match and [`MatchFlags::PROGRESS`]; with
    /// [`MatchingOptions::REPORT_COMPLETION`] it is called once more at the
    /// end with [`MatchFlags::COMPLETED`] (plus `HIT_END`, `REQUIRED_END` or
    /// `INTERNAL_ERROR` as they apply). Setting the `stop` argument to `true`
    /// ends the enumeration; no further calls happen, completion included.
    ///
    /// Fails only if `range` is out of bounds or splits a character.
    pub fn enumerate_matches<F>(
        &self,
        subject: &str,
        options: MatchingOptions,
        range: Range<usize>,
        mut block: F,
    ) -> Result<(), PatternError>
    where
        F: FnMut(Option<&MatchResult>, MatchFlags, &mut bool),
    {
        validate_range(subject, &range)?;

        let report_progress = options.contains(MatchingOptions::REPORT_PROGRESS);
        let mut stop = false;
        let searched = self.engine.search(subject, range.clone(), options, &mut |step| {
            match step {
                EngineStep::Match(result) => block(Some(&result), MatchFlags::empty(), &mut stop),
                EngineStep::Progress if report_progress => block(None, MatchFlags::PROGRESS, &mut stop),
                EngineStep::Progress => {}
            }
            if stop {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });

        if stop {
            trace!(pattern = %self.pattern(), "enumeration stopped by caller");
            return Ok(());
        }

        let mut flags = MatchFlags::COMPLETED;
        match searched {
            Ok(summary) => {
                flags.set(MatchFlags::HIT_END, summary.hit_end);
                flags.set(MatchFlags::REQUIRED_END, summary.required_end);
            }
            Err(err) => {
                warn!(pattern = %self.pattern(), error = %err, range = ?range, "match engine failed");
                flags |= MatchFlags::INTERNAL_ERROR;
            }
        }
        if options.contains(MatchingOptions::REPORT_COMPLETION) {
            block(None, flags, &mut stop);
        }
        Ok(())
    }

    /// Every match inside `range`.
    pub fn matches(
        &self,
        subject: &str,
        options: MatchingOptions,
        range: Range<usize>,
    ) -> Result<Vec<MatchResult>, PatternError> {
        let mut found = Vec::new();
        self.enumerate_matches(subject, options.without_reporting(), range, |result, _, _| {
            if let Some(result) = result {
                found.push(result.clone());
            }
        })?;
        Ok(found)
    }

    pub fn number_of_matches(
        &self,
        subject: &str,
        options: MatchingOptions,
        range: Range<usize>,
    ) -> Result<usize, PatternError> {
        let mut count = 0;
        self.enumerate_matches(subject, options.without_reporting(), range, |result, _, _| {
            if result.is_some() {
                count += 1;
            }
        })?;
        Ok(count)
    }

    /// The first match inside `range`; the search stops there.
    pub fn first_match(
        &self,
        subject: &str,
        options: MatchingOptions,
        range: Range<usize>,
    ) -> Result<Option<MatchResult>, PatternError> {
        let mut first = None;
        self.enumerate_matches(subject, options.without_reporting(), range, |result, _, stop| {
            if let Some(result) = result {
                first = Some(result.clone());
                *stop = true;
            }
        })?;
        Ok(first)
    }

    pub fn range_of_first_match(
        &self,
        subject: &str,
        options: MatchingOptions,
        range: Range<usize>,
    ) -> Result<Option<Range<usize>>, PatternError> {
        Ok(self
            .first_match(subject, options, range)?
            .map(|result| result.range()))
    }
}

fn validate_range(subject: &str, range: &Range<usize>) -> Result<(), PatternError> {
    let valid = range.start <= range.end
        && range.end <= subject.len()
        && subject.is_char_boundary(range.start)
        && subject.is_char_boundary(range.end);
    if valid {
        Ok(())
    } else {
        Err(PatternError::InvalidRange {
            start: range.start,
            end: range.end,
            len: subject.len(),
        })
    }
}
