//! Extraction pipeline orchestration.
//!
//! Runs one request start to finish: preprocess the image, try the
//! vision engine, validate, fall back to Tesseract when the primary
//! fails or is rejected, validate again, and either return an accepted
//! result or a terminal error naming the failure mode.
//!
//! The two engine calls are strictly sequential; whether the fallback is
//! needed is only known after validating the primary's output. All state
//! is request-local.

pub mod validate;

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Settings;
use crate::models::ExtractionResult;
use crate::ocr::{EngineError, TesseractEngine, TextEngine, VisionEngine};
use crate::preprocess;
use validate::Rejection;

/// Terminal extraction failures, surfaced to the caller as typed results.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no text could be detected in the image")]
    NoText,

    #[error("extracted text is too short ({length} characters, minimum {min})")]
    InsufficientText { length: usize, min: usize },

    #[error("both extraction engines failed: {0}")]
    EnginesExhausted(String),
}

/// The extraction pipeline, constructed once at startup and shared
/// immutably across requests.
pub struct ExtractionService {
    primary: Arc<dyn TextEngine>,
    fallback: Arc<dyn TextEngine>,
    min_text_chars: usize,
}

impl ExtractionService {
    /// Build the production pipeline from settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Arc::new(VisionEngine::new(settings.vision.clone())),
            Arc::new(TesseractEngine::new(settings.tesseract.clone())),
            settings.extraction.min_text_chars,
        )
    }

    /// Build a pipeline from explicit engines.
    pub fn new(
        primary: Arc<dyn TextEngine>,
        fallback: Arc<dyn TextEngine>,
        min_text_chars: usize,
    ) -> Self {
        Self {
            primary,
            fallback,
            min_text_chars,
        }
    }

    /// The engines in invocation order, for diagnostics surfaces.
    pub fn engines(&self) -> [&dyn TextEngine; 2] {
        [self.primary.as_ref(), self.fallback.as_ref()]
    }

    /// Run the full pipeline over raw image bytes.
    pub async fn extract(
        &self,
        image: &[u8],
        source_file: &str,
    ) -> Result<ExtractionResult, ExtractError> {
        let request_id = Uuid::new_v4();
        info!(%request_id, bytes = image.len(), "starting extraction");

        let prepared = preprocess::prepare(image);

        let mut rejection: Option<Rejection> = None;
        let mut last_error: Option<EngineError> = None;

        for engine in [&self.primary, &self.fallback] {
            let kind = engine.kind();
            match engine.extract(&prepared).await {
                Ok(output) => match validate::validate(&output.text, self.min_text_chars) {
                    Ok(trimmed) => {
                        let language = validate::tag_languages(trimmed);
                        info!(
                            %request_id,
                            engine = %kind,
                            chars = trimmed.chars().count(),
                            %language,
                            "extraction accepted"
                        );
                        return Ok(ExtractionResult {
                            content: trimmed.to_string(),
                            source_file: source_file.to_string(),
                            extracted_at: Utc::now(),
                            ocr_engine: kind,
                            language: Some(language),
                            confidence: output.confidence,
                        });
                    }
                    Err(r) => {
                        warn!(%request_id, engine = %kind, "engine output rejected: {:?}", r);
                        // Keep the most informative rejection across engines
                        rejection = match (rejection, r) {
                            (Some(Rejection::TooShort { length }), _) => {
                                Some(Rejection::TooShort { length })
                            }
                            (_, r) => Some(r),
                        };
                    }
                },
                Err(e) => {
                    warn!(%request_id, engine = %kind, "engine failed: {}", e);
                    last_error = Some(e);
                }
            }
        }

        Err(match rejection {
            Some(Rejection::TooShort { length }) => ExtractError::InsufficientText {
                length,
                min: self.min_text_chars,
            },
            Some(Rejection::Empty) => ExtractError::NoText,
            None => ExtractError::EnginesExhausted(
                last_error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "no engine produced output".to_string()),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use crate::models::EngineKind;
    use crate::ocr::EngineOutput;

    enum Scripted {
        Text(&'static str, Option<u8>),
        Fail(&'static str),
    }

    struct FakeEngine {
        kind: EngineKind,
        outcome: Scripted,
        calls: AtomicUsize,
    }

    impl FakeEngine {
        fn new(kind: EngineKind, outcome: Scripted) -> Arc<Self> {
            Arc::new(Self {
                kind,
                outcome,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TextEngine for FakeEngine {
        fn kind(&self) -> EngineKind {
            self.kind
        }

        fn is_available(&self) -> bool {
            true
        }

        fn availability_hint(&self) -> String {
            "fake".to_string()
        }

        async fn extract(&self, _image: &[u8]) -> Result<EngineOutput, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.outcome {
                Scripted::Text(text, confidence) => Ok(EngineOutput {
                    text: text.to_string(),
                    confidence: *confidence,
                }),
                Scripted::Fail(message) => {
                    Err(EngineError::RequestFailed(message.to_string()))
                }
            }
        }
    }

    fn service(primary: Arc<FakeEngine>, fallback: Arc<FakeEngine>) -> ExtractionService {
        ExtractionService::new(primary, fallback, 3)
    }

    #[tokio::test]
    async fn test_clean_scan_accepted_from_primary() {
        let primary = FakeEngine::new(
            EngineKind::Vision,
            Scripted::Text("هذا نص عربي واضح من مستند ممسوح", None),
        );
        let fallback = FakeEngine::new(EngineKind::Tesseract, Scripted::Text("unused", None));

        let result = service(primary.clone(), fallback.clone())
            .extract(b"image", "scan.jpg")
            .await
            .unwrap();

        assert_eq!(result.ocr_engine, EngineKind::Vision);
        assert_eq!(result.source_file, "scan.jpg");
        assert!(result.language.as_deref().unwrap().contains("arabic"));
        // The fallback is never consulted when the primary is accepted
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_primary_failure_falls_back() {
        let primary = FakeEngine::new(EngineKind::Vision, Scripted::Fail("network error"));
        let fallback = FakeEngine::new(
            EngineKind::Tesseract,
            Scripted::Text("Recovered text from the local engine, forty!", Some(82)),
        );

        let result = service(primary.clone(), fallback.clone())
            .extract(b"image", "photo.png")
            .await
            .unwrap();

        assert_eq!(result.ocr_engine, EngineKind::Tesseract);
        assert_eq!(result.confidence, Some(82));
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejected_primary_falls_back() {
        let primary = FakeEngine::new(EngineKind::Vision, Scripted::Text("؟", None));
        let fallback = FakeEngine::new(
            EngineKind::Tesseract,
            Scripted::Text("نص صالح من المحرك الاحتياطي", None),
        );

        let result = service(primary, fallback)
            .extract(b"image", "")
            .await
            .unwrap();

        assert_eq!(result.ocr_engine, EngineKind::Tesseract);
    }

    #[tokio::test]
    async fn test_short_garbage_beats_empty_in_error_message() {
        let primary = FakeEngine::new(EngineKind::Vision, Scripted::Text("؟", None));
        let fallback = FakeEngine::new(EngineKind::Tesseract, Scripted::Text("", None));

        let err = service(primary, fallback)
            .extract(b"image", "")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ExtractError::InsufficientText { length: 1, min: 3 }
        ));
    }

    #[tokio::test]
    async fn test_both_empty_reports_no_text() {
        let primary = FakeEngine::new(EngineKind::Vision, Scripted::Text("  \n ", None));
        let fallback = FakeEngine::new(EngineKind::Tesseract, Scripted::Text("", None));

        let err = service(primary, fallback)
            .extract(b"image", "")
            .await
            .unwrap_err();

        assert!(matches!(err, ExtractError::NoText));
    }

    #[tokio::test]
    async fn test_both_engines_failing_reports_exhaustion() {
        let primary = FakeEngine::new(EngineKind::Vision, Scripted::Fail("timeout"));
        let fallback = FakeEngine::new(EngineKind::Tesseract, Scripted::Fail("binary missing"));

        let err = service(primary, fallback)
            .extract(b"image", "")
            .await
            .unwrap_err();

        match err {
            ExtractError::EnginesExhausted(message) => {
                assert!(message.contains("binary missing"));
            }
            other => panic!("expected EnginesExhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_content_is_trimmed_in_result() {
        let primary = FakeEngine::new(
            EngineKind::Vision,
            Scripted::Text("\n  extracted paragraph here  \n", None),
        );
        let fallback = FakeEngine::new(EngineKind::Tesseract, Scripted::Text("", None));

        let result = service(primary, fallback)
            .extract(b"image", "")
            .await
            .unwrap();

        assert_eq!(result.content, "extracted paragraph here");
    }
}
