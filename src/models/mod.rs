//! Domain models shared between the pipeline, server, and CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which engine produced an extraction result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Vision-language-model API, used first.
    Vision,
    /// Local Tesseract OCR, used when the vision engine fails or is rejected.
    Tesseract,
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineKind::Vision => write!(f, "vision"),
            EngineKind::Tesseract => write!(f, "tesseract"),
        }
    }
}

/// A completed text extraction.
///
/// Created once per successful pipeline run and immutable afterwards.
/// Serialized camelCase to match the shape history-keeping clients store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    /// The extracted text, trimmed, non-empty.
    pub content: String,
    /// Original file name as reported by the caller; may be empty.
    pub source_file: String,
    /// When the extraction completed.
    pub extracted_at: DateTime<Utc>,
    /// Engine that produced the accepted text.
    pub ocr_engine: EngineKind,
    /// Detected language families, comma-joined; "unknown" if none matched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Engine-reported confidence percentage, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u8>,
}

/// Wire-level response for extraction requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResponse {
    pub success: bool,
    pub data: Option<ExtractionResult>,
    pub error: String,
}

impl ExtractionResponse {
    pub fn ok(data: ExtractionResult) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: String::new(),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: message.into(),
        }
    }
}
