//! Web server exposing the extraction pipeline.
//!
//! A thin boundary over the core: one POST route that accepts a base64
//! image and returns the extraction result, plus health and engine
//! status endpoints.

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::Settings;
use crate::services::ExtractionService;

/// Shared state for the web server.
///
/// Everything here is immutable after startup; requests share it by
/// reference only.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub extraction: Arc<ExtractionService>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let extraction = Arc::new(ExtractionService::from_settings(&settings));
        Self {
            settings: Arc::new(settings),
            extraction,
        }
    }
}

/// Start the web server.
pub async fn serve(settings: Settings, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState::new(settings);
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
