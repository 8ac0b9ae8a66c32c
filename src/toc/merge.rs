//! Deduplicating merge of overlapping extraction passes.

use std::collections::HashSet;

use crate::model::TocEntry;

/// Result of [`merge_counting`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Unique entries in first-seen order
    pub entries: Vec<TocEntry>,

    /// Number of later occurrences that were dropped
    pub duplicates: usize,
}

/// Merge passes into one list unique by `(title, page)`.
///
/// Passes are read in the order given and entries in their original
/// order; the first occurrence of a key wins even when a later one has a
/// different `level`. The result is not sorted.
pub fn merge<I, P>(passes: I) -> Vec<TocEntry>
where
    I: IntoIterator<Item = P>,
    P: IntoIterator<Item = TocEntry>,
{
    merge_counting(passes).entries
}

/// Like [`merge`], also reporting how many duplicates were dropped.
pub fn merge_counting<I, P>(passes: I) -> MergeOutcome
where
    I: IntoIterator<Item = P>,
    P: IntoIterator<Item = TocEntry>,
{
    let mut seen: HashSet<(String, i64)> = HashSet::new();
    let mut outcome = MergeOutcome::default();

    for entry in passes.into_iter().flatten() {
        let (title, page) = entry.key();
        if seen.insert((title.to_owned(), page)) {
            outcome.entries.push(entry);
        } else {
            log::debug!("Dropping duplicate entry {:?} (page {})", entry.title, entry.page);
            outcome.duplicates += 1;
        }
    }
    outcome
}
