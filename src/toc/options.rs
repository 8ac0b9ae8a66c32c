//! Extraction options.

/// Default rendering resolution requested for page images.
pub const DEFAULT_DPI: u32 = 300;

/// Options for [`TocExtractor`](super::TocExtractor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Resolution requested for page images
    pub dpi: u32,

    /// Whether page images are attached to the prompt
    pub vision: bool,

    /// Whether LLM calls for different ranges run concurrently
    pub parallel: bool,

    /// Whether an empty pass falls back to the line heuristic
    pub heuristic_fallback: bool,
}

impl ExtractOptions {
    /// Create new extract options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the image resolution.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    /// Enable or disable page images.
    pub fn with_vision(mut self, vision: bool) -> Self {
        self.vision = vision;
        self
    }

    /// Send text only.
    pub fn text_only(mut self) -> Self {
        self.vision = false;
        self
    }

    /// Enable or disable concurrent LLM calls.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Issue passes one after another.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Enable or disable the heuristic fallback.
    pub fn with_heuristic_fallback(mut self, enabled: bool) -> Self {
        self.heuristic_fallback = enabled;
        self
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            vision: false,
            parallel: false,
            heuristic_fallback: true,
        }
    }
}
