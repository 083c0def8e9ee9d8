//! Configuration management for textlift.
//!
//! Settings are loaded from an optional TOML file plus environment
//! overrides. The resulting `Settings` value is immutable and built once
//! at startup; every request borrows it, no mutable shared state exists
//! beyond this object.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default bind address for the web server.
pub const DEFAULT_BIND: &str = "127.0.0.1:3030";

/// Configuration for the vision-language-model extraction client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    /// OpenAI-compatible API base URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// API key. Usually supplied via VISION_API_KEY or OPENAI_API_KEY.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Vision-capable model to use.
    #[serde(default = "default_model")]
    pub model: String,
    /// Maximum tokens in the extraction response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Per-attempt request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Total attempts per extraction (first try + retries).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base retry delay in milliseconds; attempt n waits base * n.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_model() -> String {
    "gpt-4o".to_string()
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_attempts() -> u32 {
    3
}
fn default_retry_base_delay_ms() -> u64 {
    500
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

impl VisionConfig {
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }
}

/// Configuration for the local Tesseract fallback engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TesseractConfig {
    /// Path or name of the tesseract binary.
    #[serde(default = "default_tesseract_binary")]
    pub binary: String,
    /// Language models to load, in priority order.
    #[serde(default = "default_tesseract_languages")]
    pub languages: Vec<String>,
}

fn default_tesseract_binary() -> String {
    "tesseract".to_string()
}

fn default_tesseract_languages() -> Vec<String> {
    [
        "eng", "ara", "chi_sim", "jpn", "kor", "rus", "spa", "fra", "deu", "por", "ita", "hin",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            binary: default_tesseract_binary(),
            languages: default_tesseract_languages(),
        }
    }
}

impl TesseractConfig {
    /// Language combination string in Tesseract's `eng+ara` format.
    pub fn language_combination(&self) -> String {
        self.languages.join("+")
    }
}

/// Validation thresholds for extraction results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Minimum trimmed character count for accepted text.
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,
    /// Minimum decoded upload size accepted at the HTTP boundary.
    #[serde(default = "default_min_upload_bytes")]
    pub min_upload_bytes: usize,
}

fn default_min_text_chars() -> usize {
    3
}
fn default_min_upload_bytes() -> usize {
    128
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_text_chars: default_min_text_chars(),
            min_upload_bytes: default_min_upload_bytes(),
        }
    }
}

/// Web server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address, either `host:port`, a bare host, or a bare port.
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Top-level application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub vision: VisionConfig,
    #[serde(default)]
    pub tesseract: TesseractConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Settings {
    /// Load settings from an optional config file plus environment overrides.
    ///
    /// Resolution order: explicit `--config` path, then `TEXTLIFT_CONFIG`,
    /// then `textlift.toml` in the working directory, then built-in
    /// defaults. The vision API key is always overridable from the
    /// environment so it never has to live in a file.
    pub fn load(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let path = config_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("TEXTLIFT_CONFIG").ok().map(PathBuf::from))
            .or_else(|| {
                let default = PathBuf::from("textlift.toml");
                default.exists().then_some(default)
            });

        let mut settings = match path {
            Some(ref p) => {
                let raw = std::fs::read_to_string(p)
                    .map_err(|e| anyhow::anyhow!("cannot read config {}: {}", p.display(), e))?;
                toml::from_str(&raw)
                    .map_err(|e| anyhow::anyhow!("invalid config {}: {}", p.display(), e))?
            }
            None => Settings::default(),
        };

        settings.apply_env_overrides();
        Ok(settings)
    }

    /// Apply environment variable overrides on top of file values.
    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("VISION_API_KEY") {
            if !key.is_empty() {
                self.vision.api_key = Some(key);
            }
        }
        if self.vision.api_key.is_none() {
            if let Ok(key) = std::env::var("OPENAI_API_KEY") {
                if !key.is_empty() {
                    self.vision.api_key = Some(key);
                }
            }
        }
        if let Ok(endpoint) = std::env::var("VISION_ENDPOINT") {
            if !endpoint.is_empty() {
                self.vision.endpoint = endpoint;
            }
        }
        if let Ok(model) = std::env::var("VISION_MODEL") {
            if !model.is_empty() {
                self.vision.model = model;
            }
        }
    }
}
