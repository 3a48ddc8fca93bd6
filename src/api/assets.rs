//! Embedded static assets for production builds
//!
//! In development, falls back to serving from the filesystem. Unknown
//! non-API paths get index.html so client-side routing works.

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    response::{Html, IntoResponse},
};
use rust_embed::Embed;
use std::path::PathBuf;

#[derive(Embed)]
#[folder = "static"]
struct Assets;

/// Serve embedded static files, with filesystem fallback for development
/// and an index.html fallback for client-side routes.
pub async fn serve_static(req: Request<Body>) -> impl IntoResponse {
    let path = req.uri().path().trim_start_matches('/');

    // API and socket paths never fall through to the SPA
    if path.starts_with("api/") || path == "ws" {
        return StatusCode::NOT_FOUND.into_response();
    }

    // Try embedded assets first
    if let Some(content) = Assets::get(path) {
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        return Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, mime.as_ref())
            .body(Body::from(content.data.to_vec()))
            .unwrap()
            .into_response();
    }

    // Fallback to filesystem in development
    let fs_path = PathBuf::from("static").join(path);
    if fs_path.is_file() {
        if let Ok(content) = std::fs::read(&fs_path) {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            return Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, mime.as_ref())
                .body(Body::from(content))
                .unwrap()
                .into_response();
        }
    }

    // Client-side route: hand back the SPA shell
    match get_index_html() {
        Some(content) => Html(content).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Html("<h1>404 - UI not found</h1>".to_string()),
        )
            .into_response(),
    }
}

/// Get the index.html content (embedded or from filesystem)
pub fn get_index_html() -> Option<String> {
    if let Some(content) = Assets::get("index.html") {
        return String::from_utf8(content.data.to_vec()).ok();
    }

    std::fs::read_to_string("static/index.html").ok()
}
