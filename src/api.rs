//! HTTP API for Ember Chat

mod assets;
mod handlers;
mod types;

pub use handlers::create_router;

use crate::config::AppConfig;
use crate::db::Database;
use crate::ollama::OllamaClient;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub ollama: OllamaClient,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(db: Database, ollama: OllamaClient, config: AppConfig) -> Self {
        Self { db, ollama, config }
    }
}
