//! Data model shared by extraction, import and bookmark writing.
//!
//! Entries are flat (`title`, `page`, `level`) while they move through
//! parsing, merging and validation; [`Outline`] is the nested form used
//! only when bookmarks are written.

mod entry;
mod image;
mod outline;
mod range;

pub use entry::{ExtractionRequest, TocEntry, UNRESOLVED_PAGE};
pub use image::PageImage;
pub use outline::{Outline, OutlineItem};
pub use range::PageRange;
