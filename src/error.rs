//! Error types for easybookmark.

use std::io;
use thiserror::Error;

/// Result type alias for easybookmark operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while extracting or writing bookmarks.
///
/// Malformed LLM output is never an error: the response parser degrades to
/// an empty entry list instead. Everything here is either a collaborator
/// fault (PDF access, HTTP) or bad input supplied directly by the user.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file format is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted.
    #[error("Document is encrypted")]
    Encrypted,

    /// Page number is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// Invalid page range specification.
    #[error("Invalid page range: {0}")]
    InvalidPageRange(String),

    /// Error extracting text content.
    #[error("Text extraction error: {0}")]
    TextExtract(String),

    /// The page carries no image a vision model can consume.
    #[error("No usable image on page {0}")]
    ImageUnavailable(u32),

    /// The LLM request could not be completed.
    #[error("LLM request failed: {0}")]
    Llm(String),

    /// The LLM endpoint answered with a non-success status.
    #[error("LLM endpoint returned {status}: {body}")]
    LlmStatus { status: u16, body: String },

    /// The LLM endpoint answered with an unexpected envelope.
    #[error("Unexpected LLM response: {0}")]
    LlmResponse(String),

    /// A TOC document supplied for import is not usable.
    #[error("Invalid TOC document: {0}")]
    InvalidToc(String),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error while writing the outline into a document.
    #[error("Bookmark writing error: {0}")]
    Bookmark(String),
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

#[cfg(feature = "openai")]
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Llm(err.to_string())
    }
}
