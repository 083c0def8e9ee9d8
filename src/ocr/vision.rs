//! Vision-language-model extraction client.
//!
//! Sends the enhanced image to an OpenAI-compatible chat-completions
//! endpoint with a strict transcription prompt and zero sampling
//! temperature, retrying transient failures with a linear backoff.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{EngineError, EngineOutput, TextEngine};
use crate::config::VisionConfig;
use crate::models::EngineKind;

/// System instruction establishing strict OCR behavior.
const SYSTEM_PROMPT: &str = "You are a precise OCR engine for document images. \
You transcribe text in any language exactly as it appears, preserving the \
original formatting and script. You never translate, interpret, or invent text.";

/// Per-request extraction rules.
const EXTRACTION_PROMPT: &str = "Extract all text from this image.

Rules:
- Preserve paragraph breaks, line breaks, lists, and headings.
- Keep right-to-left text (Arabic, Hebrew) in its original order.
- Keep formulas, numbers, and code indentation exactly as written.
- Do not translate, summarize, or describe the image.
- Return only the extracted text, with no commentary and no added characters.";

/// Vision-language-model OCR engine (the primary engine).
pub struct VisionEngine {
    config: VisionConfig,
    client: reqwest::Client,
}

/// Chat-completions request format.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
    detail: &'static str,
}

/// Chat-completions response format.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl VisionEngine {
    /// Create a new vision engine with the given configuration.
    pub fn new(config: VisionConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// One chat-completions request carrying the image at high detail.
    async fn request_once(&self, image: &[u8]) -> Result<String, EngineError> {
        let encoded = BASE64_STANDARD.encode(image);
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(SYSTEM_PROMPT.to_string()),
                },
                ChatMessage {
                    role: "user",
                    content: MessageContent::Parts(vec![
                        ContentPart::Text {
                            text: EXTRACTION_PROMPT.to_string(),
                        },
                        ContentPart::ImageUrl {
                            image_url: ImageUrl {
                                url: format!("data:image/jpeg;base64,{}", encoded),
                                detail: "high",
                            },
                        },
                    ]),
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: 0.0,
        };

        let url = format!(
            "{}/chat/completions",
            self.config.endpoint.trim_end_matches('/')
        );
        let mut req = self.client.post(&url).json(&request);
        if let Some(key) = &self.config.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| EngineError::RequestFailed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(EngineError::RequestFailed(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| EngineError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                EngineError::MalformedResponse("response contained no content".to_string())
            })
    }
}

#[async_trait]
impl TextEngine for VisionEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Vision
    }

    fn is_available(&self) -> bool {
        self.config.api_key.is_some()
    }

    fn availability_hint(&self) -> String {
        if self.config.api_key.is_none() {
            "Vision API key not configured. Set VISION_API_KEY or OPENAI_API_KEY".to_string()
        } else {
            format!(
                "Vision engine is available (model: {}, endpoint: {})",
                self.config.model, self.config.endpoint
            )
        }
    }

    /// Extract text, retrying transient failures.
    ///
    /// Attempt n waits `retry_base_delay_ms * n` before the next try;
    /// the wait suspends only this request's task. After the configured
    /// attempt ceiling, the last error is surfaced to the caller.
    async fn extract(&self, image: &[u8]) -> Result<EngineOutput, EngineError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            match self.request_once(image).await {
                Ok(text) => {
                    debug!(attempt, "vision extraction succeeded");
                    return Ok(EngineOutput {
                        text,
                        confidence: None,
                    });
                }
                Err(e) => {
                    warn!(attempt, max_attempts, "vision extraction attempt failed: {}", e);
                    if attempt < max_attempts {
                        let wait = std::time::Duration::from_millis(
                            self.config.retry_base_delay_ms * attempt as u64,
                        );
                        tokio::time::sleep(wait).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| EngineError::RequestFailed("no attempts were made".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::{Json, Router};

    struct MockProvider {
        attempts: AtomicUsize,
        fail_first: usize,
        last_body: Mutex<Option<serde_json::Value>>,
    }

    async fn mock_handler(
        State(state): State<Arc<MockProvider>>,
        Json(body): Json<serde_json::Value>,
    ) -> axum::response::Response {
        let attempt = state.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        *state.last_body.lock().unwrap() = Some(body);

        if attempt <= state.fail_first {
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        } else {
            Json(serde_json::json!({
                "choices": [{"message": {"content": "نص مستخرج من الصورة"}}]
            }))
            .into_response()
        }
    }

    async fn spawn_mock(fail_first: usize) -> (Arc<MockProvider>, String) {
        let state = Arc::new(MockProvider {
            attempts: AtomicUsize::new(0),
            fail_first,
            last_body: Mutex::new(None),
        });

        let app = Router::new()
            .route("/chat/completions", post(mock_handler))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (state, format!("http://{}", addr))
    }

    fn test_config(endpoint: &str) -> VisionConfig {
        VisionConfig {
            retry_base_delay_ms: 50,
            ..VisionConfig::default().with_endpoint(endpoint).with_api_key("test-key")
        }
    }

    #[tokio::test]
    async fn test_retry_recovers_after_transient_failures() {
        let (state, endpoint) = spawn_mock(2).await;
        let engine = VisionEngine::new(test_config(&endpoint));

        let start = std::time::Instant::now();
        let output = engine.extract(b"fake-jpeg-bytes").await.unwrap();
        let elapsed = start.elapsed();

        assert_eq!(output.text, "نص مستخرج من الصورة");
        assert_eq!(state.attempts.load(Ordering::SeqCst), 3);
        // Two backoff waits happened: 50ms * 1 + 50ms * 2
        assert!(elapsed >= std::time::Duration::from_millis(150));
    }

    #[tokio::test]
    async fn test_exhausts_exactly_three_attempts() {
        let (state, endpoint) = spawn_mock(usize::MAX).await;
        let engine = VisionEngine::new(test_config(&endpoint));

        let result = engine.extract(b"fake-jpeg-bytes").await;
        assert!(matches!(result, Err(EngineError::RequestFailed(_))));
        assert_eq!(state.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_request_shape() {
        let (state, endpoint) = spawn_mock(0).await;
        let engine = VisionEngine::new(test_config(&endpoint));

        engine.extract(b"fake-jpeg-bytes").await.unwrap();

        let body = state.last_body.lock().unwrap().clone().unwrap();
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["messages"][0]["role"], "system");

        let parts = body["messages"][1]["content"].as_array().unwrap();
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(parts[1]["image_url"]["detail"], "high");
        let url = parts[1]["image_url"]["url"].as_str().unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_reports_request_failure() {
        // Nothing listens on this port; connection is refused immediately.
        let config = VisionConfig {
            retry_base_delay_ms: 1,
            ..VisionConfig::default()
                .with_endpoint("http://127.0.0.1:9")
                .with_api_key("test-key")
        };
        let engine = VisionEngine::new(config);

        let result = engine.extract(b"fake-jpeg-bytes").await;
        assert!(matches!(result, Err(EngineError::RequestFailed(_))));
    }

    #[test]
    fn test_availability_tracks_api_key() {
        let without = VisionEngine::new(VisionConfig::default());
        assert!(!without.is_available());
        assert!(without.availability_hint().contains("not configured"));

        let with = VisionEngine::new(VisionConfig::default().with_api_key("k"));
        assert!(with.is_available());
    }
}
