//! `strand matches` / `strand replace`.

use std::ops::Range;

use anyhow::Result;
use serde::Serialize;

use strand_pattern::{CompiledPattern, MatchingOptions};

/// One match as printed by `strand matches`.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct MatchReport {
    pub range: Range<usize>,
    pub text: String,
    /// Capture groups 1..n; `null` for groups that did not participate.
    pub groups: Vec<Option<String>>,
}

pub fn find_matches(
    pattern: &CompiledPattern,
    subject: &str,
    options: MatchingOptions,
) -> Result<Vec<MatchReport>> {
    let found = pattern.matches(subject, options, 0..subject.len())?;
    Ok(found
        .iter()
        .map(|m| MatchReport {
            range: m.range(),
            text: subject[m.range()].to_string(),
            groups: (1..m.number_of_ranges())
                .map(|i| m.group(subject, i).map(str::to_string))
                .collect(),
        })
        .collect())
}

pub fn replace_all(
    pattern: &CompiledPattern,
    subject: &str,
    options: MatchingOptions,
    template: &str,
) -> Result<String> {
    Ok(pattern.replace_matches_in(subject, options, 0..subject.len(), template)?)
}
