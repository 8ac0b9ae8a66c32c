//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use easybookmark::error::{Error, Result};
use easybookmark::{LlmClient, LlmRequest, PageImage, PageSource};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// In-memory page source with call counters.
pub struct MockSource {
    pages: Vec<String>,
    images: HashMap<u32, PageImage>,
    broken_images: Vec<u32>,
    failing_page: Option<u32>,
    pub text_calls: AtomicUsize,
    pub image_calls: AtomicUsize,
}

impl MockSource {
    pub fn new(page_count: usize) -> Self {
        Self::with_texts((1..=page_count).map(|n| format!("text of page {}", n)).collect())
    }

    pub fn with_texts(pages: Vec<String>) -> Self {
        Self {
            pages,
            images: HashMap::new(),
            broken_images: Vec::new(),
            failing_page: None,
            text_calls: AtomicUsize::new(0),
            image_calls: AtomicUsize::new(0),
        }
    }

    /// Attach an image to a 0-based page index.
    pub fn with_image(mut self, index: u32, image: PageImage) -> Self {
        self.images.insert(index, image);
        self
    }

    /// Make image decoding fail hard for a 0-based page index.
    pub fn with_broken_image(mut self, index: u32) -> Self {
        self.broken_images.push(index);
        self
    }

    /// Make text extraction fail for a 0-based page index.
    pub fn failing_at(mut self, index: u32) -> Self {
        self.failing_page = Some(index);
        self
    }

    pub fn text_calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }
}

impl PageSource for MockSource {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_text(&self, index: u32) -> Result<String> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_page == Some(index) {
            return Err(Error::TextExtract(format!("Page {}: broken stream", index + 1)));
        }
        self.pages
            .get(index as usize)
            .cloned()
            .ok_or(Error::PageOutOfRange(index + 1, self.page_count()))
    }

    fn page_image(&self, index: u32, _dpi: u32) -> Result<PageImage> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        if self.broken_images.contains(&index) {
            return Err(Error::PdfParse(format!("bad image on page {}", index + 1)));
        }
        self.images
            .get(&index)
            .cloned()
            .ok_or(Error::ImageUnavailable(index + 1))
    }
}

/// Model stub answering by the first page number in the prompt.
pub struct ScriptedLlm {
    replies: HashMap<u32, Result<String>>,
    delays: HashMap<u32, Duration>,
    pub requests: Mutex<Vec<LlmRequest>>,
    pub calls: AtomicUsize,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self {
            replies: HashMap::new(),
            delays: HashMap::new(),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Reply for the pass starting at `first_page` (1-based).
    pub fn reply(mut self, first_page: u32, text: &str) -> Self {
        self.replies.insert(first_page, Ok(text.to_string()));
        self
    }

    pub fn fail(mut self, first_page: u32, status: u16) -> Self {
        self.replies.insert(
            first_page,
            Err(Error::LlmStatus {
                status,
                body: "rate limited".to_string(),
            }),
        );
        self
    }

    pub fn delay(mut self, first_page: u32, delay: Duration) -> Self {
        self.delays.insert(first_page, delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LlmClient for ScriptedLlm {
    fn send(&self, request: &LlmRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let page = first_page(&request.user).unwrap_or(0);
        if let Some(delay) = self.delays.get(&page) {
            std::thread::sleep(*delay);
        }
        match self.replies.get(&page) {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(Error::LlmStatus { status, body })) => Err(Error::LlmStatus {
                status: *status,
                body: body.clone(),
            }),
            Some(Err(e)) => Err(Error::Llm(e.to_string())),
            None => Ok("[]".to_string()),
        }
    }
}

/// First `=== Page N ===` marker of a prompt.
pub fn first_page(prompt: &str) -> Option<u32> {
    let start = prompt.find("=== Page ")? + "=== Page ".len();
    let rest = &prompt[start..];
    rest[..rest.find(' ')?].parse().ok()
}

/// Build a PDF whose pages show the given lines.
pub fn text_pdf(pages: &[&[&str]]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for lines in pages {
        let mut operations = Vec::new();
        for (idx, line) in lines.iter().enumerate() {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 11.into()]));
            operations.push(Operation::new(
                "Td",
                vec![72.into(), (720 - 16 * idx as i64).into()],
            ));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

/// Write a text PDF with `count` numbered pages into `dir`.
pub fn write_pdf(dir: &Path, name: &str, count: usize) -> PathBuf {
    let labels: Vec<String> = (1..=count).map(|n| format!("Page body {}", n)).collect();
    let lines: Vec<[&str; 1]> = labels.iter().map(|l| [l.as_str()]).collect();
    let pages: Vec<&[&str]> = lines.iter().map(|l| l.as_slice()).collect();

    let mut doc = text_pdf(&pages);
    let path = dir.join(name);
    doc.save(&path).unwrap();
    path
}
