//! Ember Chat - a lightweight streaming chat server for Ollama models
//!
//! A Rust backend that relays WebSocket chat sessions to a local Ollama
//! instance, separates `<think>` reasoning output from answer text while
//! streaming, and persists conversations in SQLite.

mod api;
mod config;
mod db;
mod ollama;
mod protocol;
mod session;
mod think;
mod ws;

use api::{create_router, AppState};
use config::AppConfig;
use db::Database;
use ollama::OllamaClient;
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ember_chat=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = AppConfig::from_env();

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;

    let ollama = OllamaClient::new(config.ollama_url.clone());
    match ollama.list_models().await {
        Ok(models) => tracing::info!(
            count = models.len(),
            url = %config.ollama_url,
            "Connected to Ollama"
        ),
        Err(e) => tracing::warn!(
            error = %e,
            url = %config.ollama_url,
            "Cannot reach Ollama; generation will fail until it is available"
        ),
    }

    let port = config.port;
    let state = AppState::new(db, ollama, config);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state).layer(cors).layer(compression);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Ember Chat server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
