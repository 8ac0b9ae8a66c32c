//! Persistent user configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::llm::supports_vision;
use crate::model::PageRange;
use crate::toc::{ExtractOptions, DEFAULT_DPI};

/// Default configuration file name, relative to the working directory.
pub const CONFIG_FILENAME: &str = "config.json";

/// Default model name.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Settings stored in `config.json`.
///
/// Missing keys take their defaults and unknown keys are ignored, so files
/// written by older versions keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: String,
    pub model_name: String,

    /// API root of an OpenAI-compatible endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    pub default_start_page: u32,
    pub default_end_page: u32,
    pub default_offset: i64,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub dpi: u32,
    pub timeout_secs: u64,

    /// Force page images on or off; by default decided from the model name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vision: Option<bool>,

    pub parallel: bool,
    pub heuristic_fallback: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model_name: DEFAULT_MODEL.to_string(),
            base_url: None,
            default_start_page: 1,
            default_end_page: 5,
            default_offset: 0,
            temperature: 0.0,
            max_tokens: Some(2000),
            dpi: DEFAULT_DPI,
            timeout_secs: 120,
            vision: None,
            parallel: false,
            heuristic_fallback: true,
        }
    }
}

impl Config {
    /// Load a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load a configuration file, falling back to defaults when it does
    /// not exist or cannot be read.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            log::warn!("Failed to load config: {}", e);
            Self::default()
        })
    }

    /// Write the configuration as pretty JSON, creating parent directories.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        log::info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Restore every setting to its default.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Whether page images should be sent.
    pub fn vision_enabled(&self) -> bool {
        self.vision
            .unwrap_or_else(|| supports_vision(&self.model_name))
    }

    /// The default page range, from `default_start_page` to `default_end_page`.
    pub fn default_range(&self) -> Result<PageRange> {
        PageRange::new(self.default_start_page, self.default_end_page)
    }

    /// Extraction options derived from these settings.
    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions::new()
            .with_dpi(self.dpi)
            .with_vision(self.vision_enabled())
            .with_parallel(self.parallel)
            .with_heuristic_fallback(self.heuristic_fallback)
    }

    /// Client settings for an OpenAI-compatible endpoint.
    #[cfg(feature = "openai")]
    pub fn openai_config(&self) -> crate::llm::OpenAiConfig {
        let mut config = crate::llm::OpenAiConfig::new(&self.api_key, &self.model_name)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
            .with_timeout(std::time::Duration::from_secs(self.timeout_secs));
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url);
        }
        config
    }

    /// API key suitable for display: first and last four characters only.
    pub fn masked_api_key(&self) -> String {
        mask_secret(&self.api_key)
    }
}

fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    match chars.len() {
        0 => "(not set)".to_string(),
        n if n <= 8 => "*".repeat(n),
        n => format!(
            "{}{}{}",
            chars[..4].iter().collect::<String>(),
            "*".repeat(n - 8),
            chars[n - 4..].iter().collect::<String>()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.model_name, "gpt-3.5-turbo");
        assert_eq!(config.default_range().unwrap(), PageRange::new(1, 5).unwrap());
        assert_eq!(config.default_offset, 0);
        assert_eq!(config.max_tokens, Some(2000));
        assert!(!config.vision_enabled());
    }

    #[test]
    fn test_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"model_name": "gpt-4o", "default_offset": 12, "theme": "dark"}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.model_name, "gpt-4o");
        assert_eq!(config.default_offset, 12);
        assert_eq!(config.dpi, DEFAULT_DPI);
        assert!(config.vision_enabled());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            api_key: "sk-abcdefghijkl".to_string(),
            vision: Some(false),
            parallel: true,
            ..Config::default()
        };
        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_or_default() {
        let dir = TempDir::new().unwrap();
        assert_eq!(Config::load_or_default(dir.path().join("missing.json")), Config::default());

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ not json").unwrap();
        assert_eq!(Config::load_or_default(&broken), Config::default());
        assert!(matches!(Config::load(&broken), Err(Error::Config(_))));
    }

    #[test]
    fn test_reset() {
        let mut config = Config {
            default_offset: 7,
            ..Config::default()
        };
        config.reset();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_extract_options() {
        let config = Config {
            model_name: "qwen-vl-plus".to_string(),
            dpi: 150,
            heuristic_fallback: false,
            ..Config::default()
        };
        let options = config.extract_options();
        assert!(options.vision);
        assert_eq!(options.dpi, 150);
        assert!(!options.heuristic_fallback);
    }

    #[test]
    fn test_masked_api_key() {
        assert_eq!(mask_secret(""), "(not set)");
        assert_eq!(mask_secret("short"), "*****");
        assert_eq!(mask_secret("sk-abcdefghijkl"), "sk-a*******ijkl");
    }
}
