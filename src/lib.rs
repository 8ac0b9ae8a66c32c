//! # easybookmark
//!
//! Extract a table of contents from a PDF with a large language model and
//! write it back as bookmarks.
//!
//! ## Quick Start
//!
//! ```no_run
//! use easybookmark::{EasyBookmark, OpenAiClient, OpenAiConfig, PageRange};
//!
//! fn main() -> easybookmark::Result<()> {
//!     let llm = OpenAiClient::new(OpenAiConfig::new("sk-...", "gpt-4o"))?;
//!
//!     // TOC printed on physical pages 3-8; printed page 1 is physical page 13
//!     let (extraction, written) = EasyBookmark::new()
//!         .with_ranges(PageRange::parse_list("3-5,5-8")?)
//!         .with_offset(12)
//!         .run("book.pdf", "book_bookmarked.pdf", llm)?;
//!
//!     println!("{} entries, {} bookmarks", extraction.entries.len(), written.written);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Tolerant response parsing**: fenced, chatty or truncated JSON
//! - **Overlapping passes**: deduplicated by `(title, page)` in first-seen order
//! - **Page cache**: page text and images decoded once per document
//! - **Vision models**: scanned pages sent as images
//! - **Parallel passes**: LLM calls fanned out with Rayon

pub mod bookmark;
pub mod config;
pub mod detect;
pub mod error;
pub mod llm;
pub mod model;
pub mod source;
pub mod toc;

// Re-export commonly used types
pub use bookmark::{
    add_bookmarks, outline_entries, prune_unreferenced, read_bookmarks, write_bookmarks, WriteReport,
};
pub use config::Config;
pub use detect::{is_pdf_bytes, pdf_version_of_bytes, pdf_version_of_file};
pub use error::{Error, Result};
#[cfg(feature = "openai")]
pub use llm::{OpenAiClient, OpenAiConfig};
pub use llm::{LlmClient, LlmRequest};
pub use model::{
    ExtractionRequest, Outline, OutlineItem, PageImage, PageRange, TocEntry, UNRESOLVED_PAGE,
};
pub use source::{CacheStats, CachedPageSource, LopdfSource, PageCache, PageSource};
pub use toc::{
    apply_offset, import_json, merge, parse_response, to_json, ExtractOptions, ExtractionReport,
    JsonFormat, ParseTier, PassSummary, PassTier, ResponseParser, TocExtractor,
};

use std::path::Path;

/// Extract a TOC from a PDF file with default options.
///
/// # Example
///
/// ```no_run
/// use easybookmark::{extract_toc, OpenAiClient, OpenAiConfig, PageRange};
///
/// let llm = OpenAiClient::new(OpenAiConfig::new("sk-...", "gpt-3.5-turbo")).unwrap();
/// let entries = extract_toc("book.pdf", llm, &[PageRange::new(1, 5).unwrap()], 0).unwrap();
/// ```
pub fn extract_toc<P: AsRef<Path>, L: LlmClient>(
    path: P,
    llm: L,
    ranges: &[PageRange],
    offset: i64,
) -> Result<Vec<TocEntry>> {
    extract_toc_with_options(path, llm, ranges, offset, ExtractOptions::default())
}

/// Extract a TOC from a PDF file with custom options.
pub fn extract_toc_with_options<P: AsRef<Path>, L: LlmClient>(
    path: P,
    llm: L,
    ranges: &[PageRange],
    offset: i64,
    options: ExtractOptions,
) -> Result<Vec<TocEntry>> {
    let source = LopdfSource::open(path)?;
    TocExtractor::new(source, llm)
        .with_options(options)
        .extract_toc(ranges, offset)
}

/// Load a TOC JSON file.
///
/// # Example
///
/// ```no_run
/// use easybookmark::import_toc_file;
///
/// let entries = import_toc_file("toc.json").unwrap();
/// ```
pub fn import_toc_file<P: AsRef<Path>>(path: P) -> Result<Vec<TocEntry>> {
    let text = std::fs::read_to_string(path)?;
    import_json(&text)
}

/// Default output path for a bookmarked copy: `<stem>_bookmarked.pdf`
/// next to the input.
pub fn default_output_path<P: AsRef<Path>>(input: P) -> std::path::PathBuf {
    let input = input.as_ref();
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{}_bookmarked.pdf", stem))
}

/// Builder for extracting a TOC and bookmarking a PDF.
///
/// # Example
///
/// ```no_run
/// use easybookmark::{EasyBookmark, OpenAiClient, OpenAiConfig, PageRange};
///
/// let llm = OpenAiClient::new(OpenAiConfig::new("sk-...", "qwen-vl-max"))?;
/// let report = EasyBookmark::new()
///     .with_ranges(vec![PageRange::new(2, 4)?])
///     .with_vision(true)
///     .sequential()
///     .extract("scan.pdf", llm)?;
/// # Ok::<(), easybookmark::Error>(())
/// ```
pub struct EasyBookmark {
    options: ExtractOptions,
    ranges: Vec<PageRange>,
    offset: i64,
}

impl EasyBookmark {
    /// Create a builder reading pages 1-5 with no offset.
    pub fn new() -> Self {
        Self {
            options: ExtractOptions::default(),
            ranges: vec![PageRange { start: 1, end: 5 }],
            offset: 0,
        }
    }

    /// Start from saved settings.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            options: config.extract_options(),
            ranges: vec![config.default_range()?],
            offset: config.default_offset,
        })
    }

    /// Set the page ranges to read.
    pub fn with_ranges(mut self, ranges: Vec<PageRange>) -> Self {
        self.ranges = ranges;
        self
    }

    /// Set the printed-to-physical page offset.
    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    /// Replace all extraction options.
    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    /// Enable or disable page images.
    pub fn with_vision(mut self, vision: bool) -> Self {
        self.options = self.options.with_vision(vision);
        self
    }

    /// Run LLM calls concurrently.
    pub fn parallel(mut self) -> Self {
        self.options = self.options.with_parallel(true);
        self
    }

    /// Run LLM calls one after another.
    pub fn sequential(mut self) -> Self {
        self.options = self.options.sequential();
        self
    }

    /// Disable the line heuristic for empty passes.
    pub fn without_heuristic(mut self) -> Self {
        self.options = self.options.with_heuristic_fallback(false);
        self
    }

    /// Extract a TOC from `path`.
    pub fn extract<P: AsRef<Path>, L: LlmClient>(&self, path: P, llm: L) -> Result<ExtractionReport> {
        let source = LopdfSource::open(path)?;
        TocExtractor::new(source, llm)
            .with_options(self.options.clone())
            .extract_toc_with_report(&self.ranges, self.offset)
    }

    /// Extract a TOC from `input` and save a bookmarked copy to `output`.
    pub fn run<P: AsRef<Path>, Q: AsRef<Path>, L: LlmClient>(
        &self,
        input: P,
        output: Q,
        llm: L,
    ) -> Result<(ExtractionReport, WriteReport)> {
        let input = input.as_ref();
        let source = LopdfSource::open(input)?;
        let mut extractor = TocExtractor::new(source, llm).with_options(self.options.clone());
        let report = extractor.extract_toc_with_report(&self.ranges, self.offset)?;

        let (source, _) = extractor.into_parts();
        let mut doc = source.into_document();
        let written = write_bookmarks(&mut doc, &report.entries)?;
        prune_unreferenced(&mut doc);

        let output = output.as_ref();
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        doc.save(output)?;
        Ok((report, written))
    }
}

impl Default for EasyBookmark {
    fn default() -> Self {
        Self::new()
    }
}
