//! Process configuration
//!
//! All values come from `EMBER_*` environment variables with defaults
//! suited to a local Ollama setup. The config is built once in `main`
//! and handed to the components that need it; nothing reads it through
//! global state.

use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub ollama_url: String,
    pub db_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let port = std::env::var("EMBER_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let ollama_url = std::env::var("EMBER_OLLAMA_URL")
            .map(|url| normalize_url(&url))
            .unwrap_or_else(|_| DEFAULT_OLLAMA_URL.to_string());

        let db_path = std::env::var("EMBER_DB_PATH").map(PathBuf::from).unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".ember-chat").join("chat.db")
        });

        Self {
            port,
            ollama_url,
            db_path,
        }
    }
}

/// Prepend `http://` when the configured URL carries no scheme, and drop
/// any trailing slash so path joins stay predictable.
fn normalize_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url_adds_scheme() {
        assert_eq!(normalize_url("localhost:11434"), "http://localhost:11434");
        assert_eq!(
            normalize_url("192.168.1.100:11434"),
            "http://192.168.1.100:11434"
        );
    }

    #[test]
    fn test_normalize_url_keeps_scheme() {
        assert_eq!(normalize_url("http://localhost:11434"), "http://localhost:11434");
        assert_eq!(normalize_url("https://ollama.example.com"), "https://ollama.example.com");
    }

    #[test]
    fn test_normalize_url_strips_trailing_slash() {
        assert_eq!(normalize_url("http://localhost:11434/"), "http://localhost:11434");
    }
}
