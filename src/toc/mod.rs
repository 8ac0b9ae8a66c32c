//! TOC extraction and post-processing.
//!
//! The pipeline for one document:
//!
//! 1. [`TocExtractor`] reads each page range through the page cache and
//!    asks the model for a TOC.
//! 2. [`ResponseParser`] turns each raw response into entries.
//! 3. [`merge`] combines the passes, unique by `(title, page)`.
//! 4. [`apply_offset`] maps printed page numbers to physical pages and
//!    drops entries outside the document.

mod extractor;
mod heuristic;
mod json;
mod merge;
mod offset;
mod options;
mod parse;
mod schema;

pub use extractor::{ExtractionReport, PassSummary, PassTier, TocExtractor};
pub use heuristic::HeuristicParser;
pub use json::{import_json, to_json, JsonFormat};
pub use merge::{merge, merge_counting, MergeOutcome};
pub use offset::{apply_offset, apply_offset_counting, OffsetOutcome};
pub use options::{ExtractOptions, DEFAULT_DPI};
pub use parse::{parse_response, strip_code_fence, ParseOutcome, ParseTier, ResponseParser};
pub use schema::{check_array, check_value, FieldCheck, Rejection};
