//! API request and response types

use crate::db::{Conversation, Message};
use serde::{Deserialize, Serialize};

/// Request to create a new conversation
#[derive(Debug, Deserialize)]
pub struct CreateConversationRequest {
    pub message: String,
    #[serde(default)]
    pub model: String,
}

/// Response after creating a conversation
#[derive(Debug, Serialize)]
pub struct CreateConversationResponse {
    pub id: String,
    pub title: String,
    pub model: String,
}

/// Response with a list of conversations
#[derive(Debug, Serialize)]
pub struct ConversationListResponse {
    pub conversations: Vec<Conversation>,
}

/// Response with a conversation and its ordered messages
#[derive(Debug, Serialize)]
pub struct ConversationWithMessagesResponse {
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}

/// Server configuration exposed to the client
#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    #[serde(rename = "ollamaUrl")]
    pub ollama_url: String,
    #[serde(rename = "serverPort")]
    pub server_port: u16,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
