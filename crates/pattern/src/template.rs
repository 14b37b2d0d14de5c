//! Replacement templates.
//!
//! `$n` inserts capture group `n` (group 0 is the whole match). Digits are
//! consumed greedily, but never more than the number of digits in the
//! pattern's group count. `\` makes the next character literal. A `$` with no
//! digit after it and a trailing lone `\` produce nothing.

use std::ops::Range;

use crate::error::PatternError;
use crate::options::MatchingOptions;
use crate::pattern::CompiledPattern;
use crate::result::{shift_range, MatchResult};

/// Upper bound on the digits read after `$`.
const MAX_GROUP_DIGITS: usize = 20;

impl CompiledPattern {
    /// Expand `template` for one match.
    ///
    /// `offset` is added to every captured range before the text is read from
    /// `subject`, for callers that already edited the subject in front of the
    /// match. Groups that did not participate, do not exist, or fall outside
    /// `subject` after shifting expand to nothing.
    pub fn replacement_string(
        &self,
        result: &MatchResult,
        subject: &str,
        offset: isize,
        template: &str,
    ) -> String {
        expand(result, subject, offset, template, self.capture_group_count())
    }

    /// A copy of `subject` with every match inside `range` replaced by the
    /// expanded template. Text outside the matches is kept.
    pub fn replace_matches_in(
        &self,
        subject: &str,
        options: MatchingOptions,
        range: Range<usize>,
        template: &str,
    ) -> Result<String, PatternError> {
        let found = self.matches(subject, options, range)?;
        if found.is_empty() {
            return Ok(subject.to_string());
        }

        let mut out = String::with_capacity(subject.len());
        let mut copied = 0;
        for result in &found {
            let matched = result.range();
            out.push_str(&subject[copied..matched.start]);
            out.push_str(&self.replacement_string(result, subject, 0, template));
            copied = matched.end;
        }
        out.push_str(&subject[copied..]);
        Ok(out)
    }

    /// Replace every match inside `range` in place. Returns the number of
    /// replacements.
    pub fn replace_matches(
        &self,
        subject: &mut String,
        options: MatchingOptions,
        range: Range<usize>,
        template: &str,
    ) -> Result<usize, PatternError> {
        let found = self.matches(subject.as_str(), options, range)?;

        let mut offset: isize = 0;
        for result in &found {
            let expansion = self.replacement_string(result, subject.as_str(), offset, template);
            let Some(target) = shift_range(result.range(), offset) else {
                continue;
            };
            let replaced = target.len() as isize;
            subject.replace_range(target, &expansion);
            offset += expansion.len() as isize - replaced;
        }
        Ok(found.len())
    }

    /// A template that expands to `text` literally.
    pub fn escaped_template(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            if c == '\\' || c == '$' {
                out.push('\\');
            }
            out.push(c);
        }
        out
    }
}

fn expand(
    result: &MatchResult,
    subject: &str,
    offset: isize,
    template: &str,
    group_count: usize,
) -> String {
    let max_digits = digit_count(group_count).clamp(1, MAX_GROUP_DIGITS);
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            '$' => {
                let mut group = 0usize;
                let mut digits = 0;
                while digits < max_digits {
                    let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) else {
                        break;
                    };
                    group = group.saturating_mul(10).saturating_add(d as usize);
                    digits += 1;
                    chars.next();
                }
                if digits == 0 {
                    continue;
                }
                let text = result
                    .range_at(group)
                    .and_then(|range| shift_range(range, offset))
                    .and_then(|range| subject.get(range));
                if let Some(text) = text {
                    out.push_str(text);
                }
            }
            _ => out.push(c),
        }
    }
    out
}

fn digit_count(mut n: usize) -> usize {
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}
