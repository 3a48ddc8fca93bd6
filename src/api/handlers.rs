//! HTTP request handlers

use super::assets::{get_index_html, serve_static};
use super::types::{
    ConfigResponse, ConversationListResponse, ConversationWithMessagesResponse,
    CreateConversationRequest, CreateConversationResponse, ErrorResponse,
};
use super::AppState;
use crate::db::{derive_title, DbError, Role};
use crate::ollama::ModelInfo;
use crate::ws::ws_upgrade;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Root serves the SPA
        .route("/", get(serve_spa))
        // Live chat sessions
        .route("/ws", get(ws_upgrade))
        // Conversation CRUD
        .route(
            "/api/conversations",
            get(list_conversations).post(create_conversation),
        )
        .route(
            "/api/conversations/:id",
            get(get_conversation).delete(delete_conversation),
        )
        // Ollama passthrough
        .route("/api/models", get(list_models))
        // Client-visible configuration
        .route("/api/config", get(get_config))
        // Version
        .route("/version", get(get_version))
        // Static assets with SPA fallback for client-side routes
        .fallback(serve_static)
        .with_state(state)
}

// ============================================================
// SPA Handler
// ============================================================

/// Serve the SPA index.html
async fn serve_spa() -> impl IntoResponse {
    match get_index_html() {
        Some(content) => Html(content).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Html("<h1>404 - UI not found</h1>".to_string()),
        )
            .into_response(),
    }
}

// ============================================================
// Conversation CRUD
// ============================================================

async fn list_conversations(
    State(state): State<AppState>,
) -> Result<Json<ConversationListResponse>, AppError> {
    let conversations = state
        .db
        .list_conversations()
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(ConversationListResponse { conversations }))
}

async fn create_conversation(
    State(state): State<AppState>,
    Json(req): Json<CreateConversationRequest>,
) -> Result<Json<CreateConversationResponse>, AppError> {
    let title = derive_title(&req.message);

    let convo = state
        .db
        .create_conversation(&title, &req.model)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    state
        .db
        .add_message(&convo.id, Role::User, &req.message)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(CreateConversationResponse {
        id: convo.id,
        title: convo.title,
        model: convo.model,
    }))
}

async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationWithMessagesResponse>, AppError> {
    let conversation = state.db.get_conversation(&id).map_err(not_found_or_internal)?;

    let messages = state
        .db
        .get_messages(&id)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(ConversationWithMessagesResponse {
        conversation,
        messages,
    }))
}

async fn delete_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .db
        .delete_conversation(&id)
        .map_err(not_found_or_internal)?;

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================
// Ollama Passthrough
// ============================================================

async fn list_models(State(state): State<AppState>) -> Result<Json<Vec<ModelInfo>>, AppError> {
    let models = state
        .ollama
        .list_models()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch models: {e}")))?;

    Ok(Json(models))
}

// ============================================================
// Configuration
// ============================================================

async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        ollama_url: state.config.ollama_url.clone(),
        server_port: state.config.port,
    })
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("ember-chat ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

fn not_found_or_internal(e: DbError) -> AppError {
    match e {
        DbError::ConversationNotFound(_) => AppError::NotFound("Conversation not found".to_string()),
        other => AppError::Internal(other.to_string()),
    }
}

enum AppError {
    NotFound(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
