//! Page range selection for extraction passes.

use crate::error::{Error, Result};
use std::fmt;
use std::ops::RangeInclusive;

/// An inclusive, 1-indexed range of physical pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    /// Create a new range. Fails if `start` is 0 or greater than `end`.
    pub fn new(start: u32, end: u32) -> Result<Self> {
        if start == 0 {
            return Err(Error::InvalidPageRange(format!(
                "{}-{}: pages are numbered from 1",
                start, end
            )));
        }
        if start > end {
            return Err(Error::InvalidPageRange(format!(
                "{}-{}: start is after end",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// A range covering a single page.
    pub fn single(page: u32) -> Result<Self> {
        Self::new(page, page)
    }

    /// Number of pages in the range.
    pub fn len(&self) -> u32 {
        self.end - self.start + 1
    }

    /// Always false: a constructed range holds at least one page.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Clamp the range to a document with `page_count` pages.
    ///
    /// Returns `None` when nothing of the range lies inside the document.
    pub fn clamp_to(&self, page_count: u32) -> Option<Self> {
        let end = self.end.min(page_count);
        if self.start > end {
            return None;
        }
        Some(Self {
            start: self.start,
            end,
        })
    }

    /// 0-based page indices covered by the range.
    pub fn indices(&self) -> RangeInclusive<u32> {
        (self.start - 1)..=(self.end - 1)
    }

    /// Parse a single range such as `"3"` or `"1-5"`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || Error::InvalidPageRange(s.to_string());

        if let Some((start, end)) = s.split_once('-') {
            let start: u32 = start.trim().parse().map_err(|_| invalid())?;
            let end: u32 = end.trim().parse().map_err(|_| invalid())?;
            Self::new(start, end)
        } else {
            let page: u32 = s.parse().map_err(|_| invalid())?;
            Self::single(page)
        }
    }

    /// Parse a comma-separated list of ranges, e.g. `"1-5,4-8,12"`.
    ///
    /// Order is kept and overlaps are allowed: each range becomes its own
    /// extraction pass.
    pub fn parse_list(s: &str) -> Result<Vec<Self>> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(Self::parse)
            .collect()
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}
