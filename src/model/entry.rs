//! TOC entry types.

use serde::{Deserialize, Serialize};

/// Page value of an entry whose target page is not known.
pub const UNRESOLVED_PAGE: i64 = -1;

/// A single bookmark candidate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TocEntry {
    /// Entry title as it should appear in the outline
    pub title: String,

    /// Target page (1-indexed), or [`UNRESOLVED_PAGE`]
    pub page: i64,

    /// Nesting level (1 = top level)
    pub level: u32,
}

impl TocEntry {
    /// Create a new entry. Levels below 1 are raised to 1.
    pub fn new(title: impl Into<String>, page: i64, level: u32) -> Self {
        Self {
            title: title.into(),
            page,
            level: level.max(1),
        }
    }

    /// Create an entry whose page is not known yet.
    pub fn unresolved(title: impl Into<String>, level: u32) -> Self {
        Self::new(title, UNRESOLVED_PAGE, level)
    }

    /// Whether the target page is still the unresolved sentinel.
    pub fn is_unresolved(&self) -> bool {
        self.page == UNRESOLVED_PAGE
    }

    /// Identity used for deduplication: title and page, level ignored.
    pub fn key(&self) -> (&str, i64) {
        (&self.title, self.page)
    }
}

/// One extraction pass: a page range sent to the model as a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionRequest {
    /// Pages read for this pass
    pub page_range: super::PageRange,

    /// Offset between printed and physical page numbers
    pub offset: i64,
}

impl ExtractionRequest {
    /// Create a new request.
    pub fn new(page_range: super::PageRange, offset: i64) -> Self {
        Self { page_range, offset }
    }
}
