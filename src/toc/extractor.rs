//! Multi-pass TOC extraction.

use rayon::prelude::*;
use serde::Serialize;

use super::heuristic::HeuristicParser;
use super::merge::merge_counting;
use super::offset::apply_offset_counting;
use super::options::ExtractOptions;
use super::parse::{ParseTier, ResponseParser};
use crate::error::{Error, Result};
use crate::llm::{page_section, user_prompt, LlmClient, LlmRequest, SYSTEM_PROMPT};
use crate::model::{ExtractionRequest, PageRange, TocEntry};
use crate::source::{CacheStats, CachedPageSource, PageSource};

/// How a pass produced its entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PassTier {
    /// The model response was parsed by one of the parser strategies.
    Parsed(ParseTier),
    /// The model response was unusable and the line heuristic was used.
    Heuristic,
}

impl std::fmt::Display for PassTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PassTier::Parsed(tier) => write!(f, "{}", tier),
            PassTier::Heuristic => f.write_str("heuristic"),
        }
    }
}

/// Outcome of one extraction pass, before merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassSummary {
    /// Pages read and the offset applied
    pub request: ExtractionRequest,

    /// Source of the entries, `None` when the pass produced nothing
    pub tier: Option<PassTier>,

    /// Number of entries the pass contributed before deduplication
    pub entries: usize,
}

/// Result of [`TocExtractor::extract_toc_with_report`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Final entries: merged, offset and validated
    pub entries: Vec<TocEntry>,

    /// Per-pass summaries in issued order
    pub passes: Vec<PassSummary>,

    /// Entries dropped as duplicates of an earlier `(title, page)`
    pub duplicates_dropped: usize,

    /// Entries dropped because the adjusted page was outside the document
    pub out_of_range_dropped: usize,
}

/// A pass with its prompt assembled, ready to be sent.
struct PreparedPass {
    range: PageRange,
    text: String,
    request: Option<LlmRequest>,
}

/// Extracts a TOC from page ranges of one document.
///
/// The extractor owns the document session; page text and images fetched
/// for one range are reused by any overlapping range.
///
/// # Example
///
/// ```no_run
/// use easybookmark::{LopdfSource, PageRange, TocExtractor};
/// # use easybookmark::{LlmClient, LlmRequest};
/// # struct Model;
/// # impl LlmClient for Model {
/// #     fn send(&self, _: &LlmRequest) -> easybookmark::Result<String> { Ok("[]".into()) }
/// # }
///
/// let source = LopdfSource::open("book.pdf")?;
/// let mut extractor = TocExtractor::new(source, Model);
/// let ranges = PageRange::parse_list("3-6,6-9")?;
/// let entries = extractor.extract_toc(&ranges, 12)?;
/// # Ok::<(), easybookmark::Error>(())
/// ```
pub struct TocExtractor<S, L> {
    session: CachedPageSource<S>,
    llm: L,
    options: ExtractOptions,
    parser: ResponseParser,
    heuristic: HeuristicParser,
}

impl<S: PageSource, L: LlmClient> TocExtractor<S, L> {
    /// Create an extractor with default options.
    pub fn new(source: S, llm: L) -> Self {
        Self {
            session: CachedPageSource::new(source),
            llm,
            options: ExtractOptions::default(),
            parser: ResponseParser::new(),
            heuristic: HeuristicParser::new(),
        }
    }

    /// Replace the options.
    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    /// Current options.
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Extract, merge and validate entries for `ranges`.
    ///
    /// `offset` is added to every resolved page; entries that then fall
    /// outside the document are dropped. Malformed model output never
    /// produces an error; page source and LLM failures do.
    pub fn extract_toc(&mut self, ranges: &[PageRange], offset: i64) -> Result<Vec<TocEntry>> {
        Ok(self.extract_toc_with_report(ranges, offset)?.entries)
    }

    /// Like [`extract_toc`](Self::extract_toc), with per-pass details.
    pub fn extract_toc_with_report(
        &mut self,
        ranges: &[PageRange],
        offset: i64,
    ) -> Result<ExtractionReport> {
        if ranges.is_empty() {
            log::info!("No page ranges given, nothing to extract");
            return Ok(ExtractionReport::default());
        }

        let page_count = self.session.page_count();
        let mut prepared = Vec::with_capacity(ranges.len());
        for (idx, range) in ranges.iter().enumerate() {
            let Some(clamped) = range.clamp_to(page_count) else {
                log::warn!(
                    "Skipping range {} ({}): document has {} pages",
                    idx + 1,
                    range,
                    page_count
                );
                continue;
            };
            log::info!("Preparing range {}/{}: pages {}", idx + 1, ranges.len(), clamped);
            prepared.push(self.prepare(clamped)?);
        }

        let responses = self.send_all(&prepared)?;

        let mut passes = Vec::with_capacity(prepared.len());
        let mut summaries = Vec::with_capacity(prepared.len());
        for (pass, response) in prepared.iter().zip(responses) {
            let (entries, tier) = self.interpret(pass, response.as_deref());
            if entries.is_empty() {
                log::info!("Pages {}: no TOC entries found", pass.range);
            } else {
                log::info!("Pages {}: {} entries", pass.range, entries.len());
            }
            summaries.push(PassSummary {
                request: ExtractionRequest::new(pass.range, offset),
                tier,
                entries: entries.len(),
            });
            passes.push(entries);
        }

        let merged = merge_counting(passes);
        let validated =
            apply_offset_counting(merged.entries, offset, 1..=i64::from(page_count));

        if validated.entries.is_empty() {
            log::info!("Extraction produced no entries");
        }

        Ok(ExtractionReport {
            entries: validated.entries,
            passes: summaries,
            duplicates_dropped: merged.duplicates,
            out_of_range_dropped: validated.dropped,
        })
    }

    /// Cache counters of the document session.
    pub fn cache_stats(&self) -> CacheStats {
        self.session.stats()
    }

    /// Drop cached page artifacts.
    pub fn clear_cache(&mut self) {
        self.session.clear();
    }

    /// Borrow the document session.
    pub fn session(&self) -> &CachedPageSource<S> {
        &self.session
    }

    /// End the session, returning the page source and the client.
    pub fn into_parts(self) -> (S, L) {
        (self.session.into_inner(), self.llm)
    }

    /// Fetch text and images for a range through the cache.
    fn prepare(&mut self, range: PageRange) -> Result<PreparedPass> {
        let mut sections = Vec::new();
        let mut images = Vec::new();

        for index in range.indices() {
            let text = self.session.page_text(index)?;
            if text.trim().is_empty() {
                log::debug!("Page {} has no extractable text", index + 1);
            } else {
                sections.push(page_section(index + 1, text));
            }

            if self.options.vision {
                match self.session.page_image(index, self.options.dpi) {
                    Ok(image) => images.push(image.clone()),
                    Err(Error::ImageUnavailable(page)) => {
                        log::debug!("Page {} has no usable image, sending text only", page);
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        let text = sections.join("\n\n");
        let request = if sections.is_empty() && images.is_empty() {
            log::warn!("Pages {} have neither text nor images, skipping LLM call", range);
            None
        } else {
            Some(LlmRequest::new(SYSTEM_PROMPT, user_prompt(&sections)).with_images(images))
        };

        Ok(PreparedPass {
            range,
            text,
            request,
        })
    }

    /// Send every prepared pass, returning responses in issued order.
    fn send_all(&self, prepared: &[PreparedPass]) -> Result<Vec<Option<String>>> {
        let llm = &self.llm;
        let send = |pass: &PreparedPass| -> Result<Option<String>> {
            match &pass.request {
                Some(request) => llm.send(request).map(Some),
                None => Ok(None),
            }
        };

        if self.options.parallel && prepared.len() > 1 {
            log::debug!("Sending {} passes concurrently", prepared.len());
            prepared.par_iter().map(send).collect()
        } else {
            prepared.iter().map(send).collect()
        }
    }

    /// Turn a pass's response into entries, falling back to the heuristic.
    fn interpret(&self, pass: &PreparedPass, response: Option<&str>) -> (Vec<TocEntry>, Option<PassTier>) {
        let outcome = response.map(|raw| self.parser.parse(raw)).unwrap_or_default();
        if !outcome.is_empty() {
            return (outcome.entries, outcome.tier.map(PassTier::Parsed));
        }

        if self.options.heuristic_fallback && !pass.text.is_empty() {
            let entries = self.heuristic.parse(&pass.text);
            if !entries.is_empty() {
                log::info!("Pages {}: using heuristic parse", pass.range);
                return (entries, Some(PassTier::Heuristic));
            }
        }
        (Vec::new(), None)
    }
}
