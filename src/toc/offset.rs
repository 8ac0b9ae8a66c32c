//! Printed-to-physical page adjustment and range validation.

use std::ops::RangeInclusive;

use crate::model::TocEntry;

/// Result of [`apply_offset_counting`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetOutcome {
    /// Entries that survived, in input order
    pub entries: Vec<TocEntry>,

    /// Entries whose adjusted page fell outside the valid range
    pub dropped: usize,
}

/// Shift every resolved page by `offset` and drop entries that land outside
/// `valid`. Unresolved entries pass through untouched. Pages are never
/// clamped.
pub fn apply_offset(entries: Vec<TocEntry>, offset: i64, valid: RangeInclusive<i64>) -> Vec<TocEntry> {
    apply_offset_counting(entries, offset, valid).entries
}

/// Like [`apply_offset`], also reporting how many entries were dropped.
pub fn apply_offset_counting(
    entries: Vec<TocEntry>,
    offset: i64,
    valid: RangeInclusive<i64>,
) -> OffsetOutcome {
    let mut outcome = OffsetOutcome {
        entries: Vec::with_capacity(entries.len()),
        dropped: 0,
    };

    for mut entry in entries {
        if entry.is_unresolved() {
            outcome.entries.push(entry);
            continue;
        }

        match entry.page.checked_add(offset) {
            Some(adjusted) if valid.contains(&adjusted) => {
                entry.page = adjusted;
                outcome.entries.push(entry);
            }
            adjusted => {
                log::debug!(
                    "Dropping {:?}: page {} + offset {} = {:?} is outside {}..={}",
                    entry.title,
                    entry.page,
                    offset,
                    adjusted,
                    valid.start(),
                    valid.end()
                );
                outcome.dropped += 1;
            }
        }
    }

    if outcome.dropped > 0 {
        log::info!("Dropped {} entries with out-of-range pages", outcome.dropped);
    }
    outcome
}
