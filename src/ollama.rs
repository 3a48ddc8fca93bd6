//! Ollama API client
//!
//! Streams completions from an Ollama instance and lists the models it
//! has installed. The generate endpoint answers with newline-delimited
//! JSON chunks; [`NdjsonStream`] reassembles lines that arrive split
//! across network reads.

use crate::db::Role;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OllamaError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Ollama returned HTTP {0}")]
    Status(reqwest::StatusCode),
}

/// One role-attributed turn of the prompt context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTurn {
    pub role: Role,
    pub content: String,
}

impl PromptTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// One line of the NDJSON generation stream
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GenerateChunk {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelDetails {
    #[serde(default)]
    pub parameter_size: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub model: String,
    #[serde(default)]
    pub details: ModelDetails,
}

#[derive(Debug, Deserialize)]
struct ListModelsResponse {
    models: Vec<ModelInfo>,
}

/// Source of generation chunks for a single turn
#[async_trait]
pub trait TokenSource: Send {
    /// Next chunk, or `None` once the underlying stream is exhausted
    async fn next_chunk(&mut self) -> Result<Option<GenerateChunk>, OllamaError>;
}

/// Client able to open a generation stream
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate_stream(
        &self,
        model: &str,
        turns: &[PromptTurn],
    ) -> Result<Box<dyn TokenSource>, OllamaError>;
}

#[async_trait]
impl<T: GenerationClient + ?Sized> GenerationClient for Arc<T> {
    async fn generate_stream(
        &self,
        model: &str,
        turns: &[PromptTurn],
    ) -> Result<Box<dyn TokenSource>, OllamaError> {
        (**self).generate_stream(model, turns).await
    }
}

#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    http: reqwest::Client,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.into(),
            http,
        }
    }

    /// List models installed on the Ollama instance
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, OllamaError> {
        let resp = self
            .http
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(OllamaError::Status(resp.status()));
        }

        let parsed: ListModelsResponse = resp.json().await?;
        Ok(parsed.models)
    }
}

#[async_trait]
impl GenerationClient for OllamaClient {
    async fn generate_stream(
        &self,
        model: &str,
        turns: &[PromptTurn],
    ) -> Result<Box<dyn TokenSource>, OllamaError> {
        let body = GenerateRequest {
            model,
            prompt: build_prompt(turns),
            stream: true,
        };

        let resp = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(OllamaError::Status(resp.status()));
        }

        Ok(Box::new(NdjsonStream::new(resp)))
    }
}

/// Flatten role-attributed turns into the plain completion prompt the
/// generate endpoint expects.
fn build_prompt(turns: &[PromptTurn]) -> String {
    let mut prompt = String::new();
    for turn in turns {
        prompt.push_str(&format!("{}: {}\n", turn.role, turn.content));
    }
    prompt
}

/// NDJSON reader over a streaming generate response.
///
/// Malformed lines are logged and skipped rather than ending the stream.
pub struct NdjsonStream {
    resp: reqwest::Response,
    buf: Vec<u8>,
    eof: bool,
}

impl NdjsonStream {
    fn new(resp: reqwest::Response) -> Self {
        Self {
            resp,
            buf: Vec::new(),
            eof: false,
        }
    }
}

#[async_trait]
impl TokenSource for NdjsonStream {
    async fn next_chunk(&mut self) -> Result<Option<GenerateChunk>, OllamaError> {
        loop {
            if let Some(line) = take_line(&mut self.buf) {
                if let Some(chunk) = parse_chunk_line(&line) {
                    return Ok(Some(chunk));
                }
                continue;
            }

            if self.eof {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                // Final line without a trailing newline
                let rest = std::mem::take(&mut self.buf);
                return Ok(parse_chunk_line(&rest));
            }

            match self.resp.chunk().await? {
                Some(bytes) => self.buf.extend_from_slice(&bytes),
                None => self.eof = true,
            }
        }
    }
}

/// Take the next complete line out of the buffer, stripping the newline
/// and any carriage return.
fn take_line(buf: &mut Vec<u8>) -> Option<Vec<u8>> {
    let pos = buf.iter().position(|&b| b == b'\n')?;
    let mut line: Vec<u8> = buf.drain(..=pos).collect();
    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Some(line)
}

fn parse_chunk_line(line: &[u8]) -> Option<GenerateChunk> {
    if line.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    match serde_json::from_slice(line) {
        Ok(chunk) => Some(chunk),
        Err(e) => {
            tracing::warn!(error = %e, "Skipping malformed generate chunk");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_line_waits_for_newline() {
        let mut buf = b"abc".to_vec();
        assert_eq!(take_line(&mut buf), None);

        buf.extend_from_slice(b"def\nsecond\n");
        assert_eq!(take_line(&mut buf), Some(b"abcdef".to_vec()));
        assert_eq!(take_line(&mut buf), Some(b"second".to_vec()));
        assert_eq!(take_line(&mut buf), None);
    }

    #[test]
    fn test_take_line_strips_carriage_return() {
        let mut buf = b"line\r\n".to_vec();
        assert_eq!(take_line(&mut buf), Some(b"line".to_vec()));
    }

    #[test]
    fn test_parse_chunk_line() {
        let chunk = parse_chunk_line(br#"{"response":"hi","done":false}"#).unwrap();
        assert_eq!(chunk.response, "hi");
        assert!(!chunk.done);
    }

    #[test]
    fn test_parse_chunk_line_defaults() {
        let chunk = parse_chunk_line(br#"{"done":true}"#).unwrap();
        assert_eq!(chunk.response, "");
        assert!(chunk.done);
    }

    #[test]
    fn test_malformed_chunk_line_is_skipped() {
        assert_eq!(parse_chunk_line(b"not json"), None);
        assert_eq!(parse_chunk_line(b"  "), None);
        assert_eq!(parse_chunk_line(b""), None);
    }

    #[test]
    fn test_build_prompt_flattens_turns() {
        let turns = vec![
            PromptTurn::new(Role::User, "What is Rust?"),
            PromptTurn::new(Role::Assistant, "A systems language."),
            PromptTurn::new(Role::User, "Tell me more"),
        ];
        assert_eq!(
            build_prompt(&turns),
            "user: What is Rust?\nassistant: A systems language.\nuser: Tell me more\n"
        );
    }
}
