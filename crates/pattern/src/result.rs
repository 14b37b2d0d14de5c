use std::ops::Range;

use serde::Serialize;

/// One match: the overall range plus one entry per capture group.
///
/// Ranges are byte offsets into the subject. Index 0 is the whole match; a
/// group that did not take part in the match is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    groups: Vec<Option<Range<usize>>>,
}

impl MatchResult {
    /// Build from group ranges, the overall match first.
    ///
    /// # Panics
    /// If `groups` is empty or the overall range is missing.
    pub fn new(groups: Vec<Option<Range<usize>>>) -> Self {
        assert!(
            groups.first().is_some_and(Option::is_some),
            "a match result needs an overall range"
        );
        Self { groups }
    }

    pub fn range(&self) -> Range<usize> {
        self.groups[0].clone().unwrap_or_default()
    }

    /// Range of group `index`, `None` if it did not participate or does not
    /// exist.
    pub fn range_at(&self, index: usize) -> Option<Range<usize>> {
        self.groups.get(index).cloned().flatten()
    }

    /// Number of ranges, the overall match included.
    pub fn number_of_ranges(&self) -> usize {
        self.groups.len()
    }

    /// Text of group `index` within `subject`.
    pub fn group<'s>(&self, subject: &'s str, index: usize) -> Option<&'s str> {
        self.range_at(index).and_then(|range| subject.get(range))
    }

    /// The same match with every range moved by `offset` bytes. Group ranges
    /// that would start before zero become `None`; the overall range is
    /// clamped at zero.
    pub fn adjusting_ranges(&self, offset: isize) -> MatchResult {
        let mut groups: Vec<Option<Range<usize>>> = self
            .groups
            .iter()
            .map(|range| range.clone().and_then(|r| shift_range(r, offset)))
            .collect();
        if groups[0].is_none() {
            groups[0] = Some(0..0);
        }
        MatchResult { groups }
    }
}

/// Move `range` by a signed byte offset.
pub(crate) fn shift_range(range: Range<usize>, offset: isize) -> Option<Range<usize>> {
    let start = range.start.checked_add_signed(offset)?;
    let end = range.end.checked_add_signed(offset)?;
    Some(start..end)
}
