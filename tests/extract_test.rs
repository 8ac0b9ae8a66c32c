//! Integration tests for multi-pass TOC extraction.

mod common;

use std::time::Duration;

use common::{MockSource, ScriptedLlm};
use easybookmark::error::Error;
use easybookmark::{
    ExtractOptions, PageImage, PageRange, ParseTier, PassTier, TocEntry, TocExtractor,
};

const FIRST_PASS: &str = r#"```json
[
  {"title": "Chapter 1", "page": 1, "level": 1},
  {"title": "Chapter 2", "page": 4, "level": 1},
  {"title": "Section 2.1", "page": 6, "level": 2}
]
```"#;

const SECOND_PASS: &str = r#"Here is what I found:
[{"title": "Chapter 2", "page": 4, "level": 1}, {"title": "Chapter 3", "page": 9, "level": 1}, {"title": "Index", "page": -1, "level": 1}]
Let me know if you need more."#;

fn ranges(spec: &str) -> Vec<PageRange> {
    PageRange::parse_list(spec).unwrap()
}

#[test]
fn test_overlapping_passes_deduplicated_in_order() {
    let llm = ScriptedLlm::new().reply(1, FIRST_PASS).reply(4, SECOND_PASS);
    let mut extractor = TocExtractor::new(MockSource::new(20), llm);

    let report = extractor.extract_toc_with_report(&ranges("1-5,4-8"), 0).unwrap();

    assert_eq!(
        report.entries,
        vec![
            TocEntry::new("Chapter 1", 1, 1),
            TocEntry::new("Chapter 2", 4, 1),
            TocEntry::new("Section 2.1", 6, 2),
            TocEntry::new("Chapter 3", 9, 1),
            TocEntry::unresolved("Index", 1),
        ]
    );
    assert_eq!(report.duplicates_dropped, 1);
    assert_eq!(report.passes.len(), 2);
    assert_eq!(report.passes[0].tier, Some(PassTier::Parsed(ParseTier::Direct)));
    assert_eq!(report.passes[1].tier, Some(PassTier::Parsed(ParseTier::Bracketed)));
    assert_eq!(report.passes[0].entries, 3);
    assert_eq!(report.passes[1].entries, 3);
}

#[test]
fn test_offset_applied_after_merge() {
    let llm = ScriptedLlm::new().reply(1, FIRST_PASS).reply(4, SECOND_PASS);
    let mut extractor = TocExtractor::new(MockSource::new(12), llm);

    let report = extractor.extract_toc_with_report(&ranges("1-5,4-8"), 4).unwrap();

    // Chapter 3 lands on page 13 of a 12-page document
    assert_eq!(
        report.entries,
        vec![
            TocEntry::new("Chapter 1", 5, 1),
            TocEntry::new("Chapter 2", 8, 1),
            TocEntry::new("Section 2.1", 10, 2),
            TocEntry::unresolved("Index", 1),
        ]
    );
    assert_eq!(report.out_of_range_dropped, 1);
    assert!(report.passes.iter().all(|p| p.request.offset == 4));
}

#[test]
fn test_negative_offset_drops_front_matter() {
    let llm = ScriptedLlm::new().reply(
        1,
        r#"[{"title": "Preface", "page": 2, "level": 1}, {"title": "X", "page": 5, "level": 1}]"#,
    );
    let mut extractor = TocExtractor::new(MockSource::new(100), llm);

    let entries = extractor.extract_toc(&ranges("1-2"), -3).unwrap();
    assert_eq!(entries, vec![TocEntry::new("X", 2, 1)]);
}

#[test]
fn test_parallel_preserves_issued_order() {
    let make_llm = || {
        ScriptedLlm::new()
            .reply(1, FIRST_PASS)
            .reply(4, SECOND_PASS)
            .reply(9, r#"[{"title": "Appendix", "page": 15, "level": 1}]"#)
            // The first pass finishes last
            .delay(1, Duration::from_millis(150))
            .delay(4, Duration::from_millis(50))
    };

    let mut sequential = TocExtractor::new(MockSource::new(20), make_llm());
    let expected = sequential.extract_toc(&ranges("1-5,4-8,9-10"), 0).unwrap();

    let mut parallel = TocExtractor::new(MockSource::new(20), make_llm())
        .with_options(ExtractOptions::new().with_parallel(true));
    let actual = parallel.extract_toc(&ranges("1-5,4-8,9-10"), 0).unwrap();

    assert_eq!(actual, expected);
    assert_eq!(actual.last().unwrap().title, "Appendix");
}

#[test]
fn test_llm_failure_propagates() {
    let llm = ScriptedLlm::new().reply(1, FIRST_PASS).fail(4, 429);
    let mut extractor = TocExtractor::new(MockSource::new(10), llm);

    let result = extractor.extract_toc(&ranges("1-5,4-8"), 0);
    assert!(matches!(result, Err(Error::LlmStatus { status: 429, .. })));
}

#[test]
fn test_llm_failure_propagates_in_parallel() {
    let llm = ScriptedLlm::new().reply(1, FIRST_PASS).fail(4, 500);
    let mut extractor = TocExtractor::new(MockSource::new(10), llm)
        .with_options(ExtractOptions::new().with_parallel(true));

    let result = extractor.extract_toc(&ranges("1-5,4-8"), 0);
    assert!(matches!(result, Err(Error::LlmStatus { status: 500, .. })));
}

#[test]
fn test_page_source_failure_propagates() {
    let llm = ScriptedLlm::new();
    let mut extractor = TocExtractor::new(MockSource::new(10).failing_at(2), llm);

    let result = extractor.extract_toc(&ranges("1-5"), 0);
    assert!(matches!(result, Err(Error::TextExtract(_))));
}

#[test]
fn test_empty_ranges_no_calls() {
    let mut extractor = TocExtractor::new(MockSource::new(10), ScriptedLlm::new());

    assert!(extractor.extract_toc(&[], 0).unwrap().is_empty());
    let (source, llm) = extractor.into_parts();
    assert_eq!(llm.calls(), 0);
    assert_eq!(source.text_calls(), 0);
}

#[test]
fn test_malformed_output_never_errors() {
    let llm = ScriptedLlm::new()
        .reply(1, "I'm sorry, I can't read this document.")
        .reply(3, "{\"title\": \"Only this\", \"page\": \"7\", \"level\": 1, \"note\": ")
        .reply(5, "[{\"title\": }]");
    let mut extractor = TocExtractor::new(MockSource::new(10), llm)
        .with_options(ExtractOptions::new().with_heuristic_fallback(false));

    let report = extractor.extract_toc_with_report(&ranges("1-2,3-4,5-6"), 0).unwrap();
    assert_eq!(report.entries, vec![TocEntry::new("Only this", 7, 1)]);
    assert_eq!(report.passes[0].tier, None);
    assert_eq!(report.passes[1].tier, Some(PassTier::Parsed(ParseTier::Salvaged)));
    assert_eq!(report.passes[2].tier, None);
}

#[test]
fn test_overlap_served_from_cache() {
    let llm = ScriptedLlm::new();
    let mut extractor = TocExtractor::new(MockSource::new(10), llm);

    extractor.extract_toc(&ranges("1-5,4-8"), 0).unwrap();
    let stats = extractor.cache_stats();
    assert_eq!(stats.misses, 8);
    assert_eq!(stats.hits, 2);

    // A second extraction over the same session reads nothing new
    extractor.extract_toc(&ranges("2-3"), 0).unwrap();
    assert_eq!(extractor.session().source().text_calls(), 8);

    extractor.clear_cache();
    extractor.extract_toc(&ranges("2-3"), 0).unwrap();
    assert_eq!(extractor.session().source().text_calls(), 10);
}

#[test]
fn test_vision_attaches_available_images() {
    let source = MockSource::new(6)
        .with_image(1, PageImage::jpeg(vec![0xFF, 0xD8, 0x01]))
        .with_image(2, PageImage::jpeg(vec![0xFF, 0xD8, 0x02]));
    let llm = ScriptedLlm::new();
    let mut extractor = TocExtractor::new(source, llm)
        .with_options(ExtractOptions::new().with_vision(true).with_dpi(200));

    extractor.extract_toc(&ranges("1-4"), 0).unwrap();
    let (source, llm) = extractor.into_parts();

    let requests = llm.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].images.len(), 2);
    assert_eq!(requests[0].images[0].data, vec![0xFF, 0xD8, 0x01]);
    assert_eq!(source.image_calls.load(std::sync::atomic::Ordering::SeqCst), 4);
}

#[test]
fn test_text_only_skips_images() {
    let source = MockSource::new(3).with_image(0, PageImage::jpeg(vec![1]));
    let mut extractor = TocExtractor::new(source, ScriptedLlm::new())
        .with_options(ExtractOptions::new().text_only());

    extractor.extract_toc(&ranges("1-3"), 0).unwrap();
    let (source, llm) = extractor.into_parts();
    assert!(llm.requests.lock().unwrap()[0].images.is_empty());
    assert_eq!(source.image_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[test]
fn test_image_failure_propagates() {
    let source = MockSource::new(3).with_broken_image(1);
    let mut extractor = TocExtractor::new(source, ScriptedLlm::new())
        .with_options(ExtractOptions::new().with_vision(true));

    assert!(matches!(
        extractor.extract_toc(&ranges("1-3"), 0),
        Err(Error::PdfParse(_))
    ));
}

#[test]
fn test_heuristic_fallback_on_refusal() {
    let source = MockSource::with_texts(vec![
        "Contents".to_string(),
        "1 Getting Started ........ 3\n1.1 Installation ........ 4\n2 Usage ........ 9".to_string(),
        "Body".to_string(),
    ]);
    let llm = ScriptedLlm::new().reply(1, "No table of contents here.");
    let mut extractor = TocExtractor::new(source, llm);

    let report = extractor.extract_toc_with_report(&ranges("1-2"), 0).unwrap();
    // Pages 4 and 9 lie outside this 3-page document
    assert_eq!(report.entries, vec![TocEntry::new("Getting Started", 3, 1)]);
    assert_eq!(report.passes[0].tier, Some(PassTier::Heuristic));
    assert_eq!(report.out_of_range_dropped, 2);
}

#[test]
fn test_range_beyond_document_skipped() {
    let llm = ScriptedLlm::new().reply(4, r#"[{"title": "Tail", "page": 5, "level": 1}]"#);
    let mut extractor = TocExtractor::new(MockSource::new(5), llm);

    let report = extractor.extract_toc_with_report(&ranges("4-9,7-8"), 0).unwrap();
    assert_eq!(report.passes.len(), 1);
    assert_eq!(report.passes[0].request.page_range, PageRange::new(4, 5).unwrap());
    assert_eq!(report.entries, vec![TocEntry::new("Tail", 5, 1)]);
}
