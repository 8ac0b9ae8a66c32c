//! LLM access.
//!
//! The extraction pipeline only needs one operation from a model: send a
//! prompt (optionally with page images) and get raw text back. Anything
//! implementing [`LlmClient`] can be plugged in; [`OpenAiClient`] talks to
//! OpenAI-compatible chat-completions endpoints.

#[cfg(feature = "openai")]
mod openai;
mod prompt;

#[cfg(feature = "openai")]
pub use openai::{OpenAiClient, OpenAiConfig, DEFAULT_BASE_URL};
pub use prompt::{page_section, supports_vision, user_prompt, SYSTEM_PROMPT};

use crate::error::Result;
use crate::model::PageImage;

/// One model invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LlmRequest {
    /// Instructions for the model
    pub system: String,

    /// Page text for this pass
    pub user: String,

    /// Page images, in page order
    pub images: Vec<PageImage>,
}

impl LlmRequest {
    /// Create a text-only request.
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            images: Vec::new(),
        }
    }

    /// Attach page images.
    pub fn with_images(mut self, images: Vec<PageImage>) -> Self {
        self.images = images;
        self
    }

    /// Whether the request carries page images.
    pub fn has_images(&self) -> bool {
        !self.images.is_empty()
    }
}

/// A model endpoint.
///
/// `send` is called once per extraction pass and never retried. Errors are
/// propagated unchanged to the caller of the extraction.
pub trait LlmClient: Send + Sync {
    /// Send a request and return the raw response text.
    fn send(&self, request: &LlmRequest) -> Result<String>;
}

impl<C: LlmClient + ?Sized> LlmClient for &C {
    fn send(&self, request: &LlmRequest) -> Result<String> {
        (**self).send(request)
    }
}

impl<C: LlmClient + ?Sized> LlmClient for Box<C> {
    fn send(&self, request: &LlmRequest) -> Result<String> {
        (**self).send(request)
    }
}
