//! HTTP front end: upload form, card generation, card files and the gallery.

use std::num::NonZeroU16;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};

use crate::constants::MAX_UPLOAD_BYTES;
use crate::pipeline::CardPipeline;

mod generate;
mod images;
mod views;

#[derive(Clone)]
pub(crate) struct AppState {
    pipeline: Arc<CardPipeline>,
}

impl AppState {
    pub(crate) fn new(pipeline: CardPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(views::index_handler))
        .route("/generate", post(generate::generate_handler))
        .route("/card/{filename}", get(images::card_handler))
        .route("/download/{filename}", get(images::download_handler))
        .route("/gallery", get(views::gallery_handler))
        .route("/api/cards", get(views::api_cards_handler))
        .route("/health", get(views::health_handler))
        .route("/static/styles.css", get(views::styles_handler))
        // multipart needs the axum default lifted; the tower layer enforces the cap
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES))
}

/// Serves the app until the process is stopped.
pub async fn setup_server(
    listen_addr: &str,
    port: NonZeroU16,
    pipeline: CardPipeline,
) -> Result<(), anyhow::Error> {
    let app = create_router().with_state(AppState::new(pipeline));

    let addr = format!("{}:{}", listen_addr, port);
    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", err);
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", err);
        return;
    }
    info!("Shutting down");
}
