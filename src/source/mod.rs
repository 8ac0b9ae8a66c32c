//! Page access abstraction.
//!
//! Extraction only needs three things from a document: how many pages it
//! has, the text of a page, and an image of a page. [`PageSource`] isolates
//! the concrete PDF library (lopdf) from the extraction logic, and
//! [`CachedPageSource`] memoizes both artifacts for one document session.

mod cache;
mod pdf;

pub use cache::{CacheStats, CachedPageSource, PageCache};
pub use pdf::LopdfSource;

use crate::error::Result;
use crate::model::PageImage;

/// Abstract interface for page-level document access.
///
/// Page indices are 0-based. Failures are collaborator faults and are
/// propagated unchanged through the extraction pipeline.
pub trait PageSource {
    /// Total number of pages.
    fn page_count(&self) -> u32;

    /// Extracted text of a page.
    fn page_text(&self, index: u32) -> Result<String>;

    /// An image of a page at the requested resolution.
    fn page_image(&self, index: u32, dpi: u32) -> Result<PageImage>;
}

impl<S: PageSource + ?Sized> PageSource for &S {
    fn page_count(&self) -> u32 {
        (**self).page_count()
    }

    fn page_text(&self, index: u32) -> Result<String> {
        (**self).page_text(index)
    }

    fn page_image(&self, index: u32, dpi: u32) -> Result<PageImage> {
        (**self).page_image(index, dpi)
    }
}

impl<S: PageSource + ?Sized> PageSource for Box<S> {
    fn page_count(&self) -> u32 {
        (**self).page_count()
    }

    fn page_text(&self, index: u32) -> Result<String> {
        (**self).page_text(index)
    }

    fn page_image(&self, index: u32, dpi: u32) -> Result<PageImage> {
        (**self).page_image(index, dpi)
    }
}
