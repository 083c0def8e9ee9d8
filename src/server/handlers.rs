//! HTTP handlers for the extraction API.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::Deserialize;

use super::AppState;
use crate::models::ExtractionResponse;

/// Inbound extraction request.
///
/// `base64Image` may be a bare base64 string or a full `data:` URL, as
/// browser clients produce both.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    pub base64_image: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
}

/// Health check endpoint for container orchestration.
pub async fn health() -> impl IntoResponse {
    StatusCode::OK
}

/// Engine availability report.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let engines: Vec<_> = state
        .extraction
        .engines()
        .iter()
        .map(|engine| {
            serde_json::json!({
                "id": engine.kind().to_string(),
                "available": engine.is_available(),
                "hint": engine.availability_hint(),
            })
        })
        .collect();

    Json(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "engines": engines,
    }))
}

/// Run the extraction pipeline over an uploaded image.
///
/// Malformed or undersized payloads are rejected here with HTTP 400;
/// pipeline-level failures come back as HTTP 200 with `success: false`
/// so clients can render the message deterministically.
pub async fn extract(
    State(state): State<AppState>,
    Json(request): Json<ExtractRequest>,
) -> (StatusCode, Json<ExtractionResponse>) {
    let Some(payload) = request.base64_image.filter(|p| !p.is_empty()) else {
        return reject("No image provided");
    };

    // Browser clients send data URLs; keep only the payload
    let encoded = match payload.find("base64,") {
        Some(index) if payload.starts_with("data:") => &payload[index + "base64,".len()..],
        _ => payload.as_str(),
    };

    let bytes = match BASE64_STANDARD.decode(encoded.trim()) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!("rejecting malformed base64 payload: {}", e);
            return reject("Invalid base64 image data");
        }
    };

    if bytes.len() < state.settings.extraction.min_upload_bytes {
        return reject("Image payload too small");
    }

    let looks_like_image = infer::get(&bytes)
        .map(|kind| kind.matcher_type() == infer::MatcherType::Image)
        .unwrap_or(false);
    if !looks_like_image {
        return reject("Uploaded data is not an image");
    }

    let source_file = request.file_name.unwrap_or_default();
    match state.extraction.extract(&bytes, &source_file).await {
        Ok(result) => (StatusCode::OK, Json(ExtractionResponse::ok(result))),
        Err(e) => (StatusCode::OK, Json(ExtractionResponse::err(e.to_string()))),
    }
}

fn reject(message: &str) -> (StatusCode, Json<ExtractionResponse>) {
    (StatusCode::BAD_REQUEST, Json(ExtractionResponse::err(message)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::config::Settings;
    use crate::models::EngineKind;
    use crate::ocr::{EngineError, EngineOutput, TextEngine};
    use crate::server::{create_router, AppState};
    use crate::services::ExtractionService;

    struct StaticEngine {
        kind: EngineKind,
        text: &'static str,
    }

    #[async_trait]
    impl TextEngine for StaticEngine {
        fn kind(&self) -> EngineKind {
            self.kind
        }

        fn is_available(&self) -> bool {
            true
        }

        fn availability_hint(&self) -> String {
            "static test engine".to_string()
        }

        async fn extract(&self, _image: &[u8]) -> Result<EngineOutput, EngineError> {
            Ok(EngineOutput {
                text: self.text.to_string(),
                confidence: None,
            })
        }
    }

    fn test_app(primary_text: &'static str) -> axum::Router {
        let extraction = ExtractionService::new(
            Arc::new(StaticEngine {
                kind: EngineKind::Vision,
                text: primary_text,
            }),
            Arc::new(StaticEngine {
                kind: EngineKind::Tesseract,
                text: "",
            }),
            3,
        );
        let state = AppState {
            settings: Arc::new(Settings::default()),
            extraction: Arc::new(extraction),
        };
        create_router(state)
    }

    fn png_base64() -> String {
        let img = image::RgbImage::from_fn(32, 32, |x, y| {
            image::Rgb([(x * 8) as u8, (y * 8) as u8, 128])
        });
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        BASE64_STANDARD.encode(buf.into_inner())
    }

    async fn post_extract(app: axum::Router, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/extract")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app("ok");
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_status_lists_both_engines() {
        let app = test_app("ok");
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let engines = json["engines"].as_array().unwrap();
        assert_eq!(engines.len(), 2);
        assert_eq!(engines[0]["id"], "vision");
        assert_eq!(engines[1]["id"], "tesseract");
    }

    #[tokio::test]
    async fn test_missing_image_rejected() {
        let app = test_app("ok");
        let (status, json) = post_extract(app, serde_json::json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "No image provided");
    }

    #[tokio::test]
    async fn test_malformed_base64_rejected() {
        let app = test_app("ok");
        let (status, json) =
            post_extract(app, serde_json::json!({"base64Image": "!!not-base64!!"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_undersized_payload_rejected() {
        let app = test_app("ok");
        let tiny = BASE64_STANDARD.encode(b"tiny");
        let (status, json) = post_extract(app, serde_json::json!({"base64Image": tiny})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_non_image_payload_rejected() {
        let app = test_app("ok");
        let text = BASE64_STANDARD.encode(vec![b'a'; 4096]);
        let (status, json) = post_extract(app, serde_json::json!({"base64Image": text})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Uploaded data is not an image");
    }

    #[tokio::test]
    async fn test_extract_success_round_trip() {
        let app = test_app("نص مستخرج للاختبار hello");
        let (status, json) = post_extract(
            app,
            serde_json::json!({"base64Image": png_base64(), "fileName": "page.png"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["ocrEngine"], "vision");
        assert_eq!(json["data"]["sourceFile"], "page.png");
        let language = json["data"]["language"].as_str().unwrap();
        assert!(language.contains("arabic") && language.contains("latin"));
    }

    #[tokio::test]
    async fn test_extract_accepts_data_url_prefix() {
        let app = test_app("recovered text");
        let payload = format!("data:image/png;base64,{}", png_base64());
        let (status, json) = post_extract(app, serde_json::json!({"base64Image": payload})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
    }

    #[tokio::test]
    async fn test_pipeline_failure_is_200_with_success_false() {
        // Both engines return nothing useful
        let app = test_app("");
        let (status, json) = post_extract(app, serde_json::json!({"base64Image": png_base64()})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], false);
        assert_eq!(json["data"], serde_json::Value::Null);
        assert!(!json["error"].as_str().unwrap().is_empty());
    }
}
