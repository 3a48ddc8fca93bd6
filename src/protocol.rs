//! WebSocket wire protocol
//!
//! Frames are flat JSON objects in both directions. Inbound commands are
//! tagged by `type`; a tag this server does not know decodes to
//! [`ClientCommand::Unknown`] so the read loop can skip the frame, while
//! a frame that fails to decode at all tears the connection down.
//! Outbound events always serialize to `{"type": ..., "content": ...}`.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// Commands a client may send over the session socket
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    StartConversation {
        #[serde(default)]
        message: String,
        #[serde(default)]
        model: String,
    },
    ResumeConversation {
        #[serde(default)]
        convo_id: String,
    },
    Message {
        #[serde(default)]
        message: String,
        #[serde(default)]
        model: String,
    },
    /// Any type tag this server does not understand
    #[serde(other)]
    Unknown,
}

/// Events the server emits on the session socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    ConversationStarted(String),
    ConversationResumed(String),
    ThinkingStart,
    ThinkingChunk(String),
    ThinkingEnd(String),
    ResponseChunk(String),
    Done,
    Error(String),
}

impl ServerEvent {
    /// Wire `type` tag and `content` payload
    fn wire(&self) -> (&'static str, &str) {
        match self {
            ServerEvent::ConversationStarted(id) => ("conversation_started", id),
            ServerEvent::ConversationResumed(id) => ("conversation_resumed", id),
            ServerEvent::ThinkingStart => ("thinking_start", ""),
            ServerEvent::ThinkingChunk(text) => ("thinking_chunk", text),
            ServerEvent::ThinkingEnd(text) => ("thinking_end", text),
            ServerEvent::ResponseChunk(text) => ("response_chunk", text),
            ServerEvent::Done => ("done", ""),
            ServerEvent::Error(message) => ("error", message),
        }
    }
}

impl Serialize for ServerEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (kind, content) = self.wire();
        let mut frame = serializer.serialize_struct("ServerEvent", 2)?;
        frame.serialize_field("type", kind)?;
        frame.serialize_field("content", content)?;
        frame.end()
    }
}
