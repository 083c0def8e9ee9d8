//! Text extraction engines.
//!
//! Two engines implement the [`TextEngine`] trait:
//!
//! - **Vision** ([`VisionEngine`]): sends the enhanced image to a
//!   vision-capable language-model API. Highest accuracy, used first,
//!   retries transient failures.
//! - **Tesseract** ([`TesseractEngine`]): local OCR via the tesseract
//!   binary. No network dependency; used when the vision engine fails
//!   or its output is rejected.
//!
//! Engines return raw text; acceptance rules live in the extraction
//! service, not here.

mod tesseract;
mod vision;

pub use tesseract::TesseractEngine;
pub use vision::VisionEngine;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::EngineKind;

/// Errors that can occur during engine invocation.
///
/// These are fail-loud, unlike the preprocessing stages: exhausted
/// retries and broken responses surface here so the caller can decide
/// to fall back or report.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine not available: {0}")]
    NotAvailable(String),

    #[error("extraction request failed: {0}")]
    RequestFailed(String),

    #[error("malformed engine response: {0}")]
    MalformedResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Raw output of a single engine invocation.
#[derive(Debug, Clone)]
pub struct EngineOutput {
    /// Extracted text, whitespace-normalized but not yet validated.
    pub text: String,
    /// Engine-reported confidence percentage, when the engine has one.
    pub confidence: Option<u8>,
}

/// A text extraction engine.
#[async_trait]
pub trait TextEngine: Send + Sync {
    /// Which engine this is.
    fn kind(&self) -> EngineKind;

    /// Whether the engine can currently run (key configured, binary found).
    fn is_available(&self) -> bool;

    /// Human-readable availability status for diagnostics.
    fn availability_hint(&self) -> String;

    /// Extract text from an encoded image buffer.
    async fn extract(&self, image: &[u8]) -> Result<EngineOutput, EngineError>;
}

/// Check if a binary is available in PATH.
pub fn check_binary(name: &str) -> bool {
    which::which(name).is_ok()
}
