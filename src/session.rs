//! Per-connection conversation session
//!
//! Owns the active conversation for one WebSocket connection, validates
//! commands against it, and drives generation turns: persist the user
//! message, stream the model output through the tag scanner, forward
//! each notification as it happens, persist the assembled assistant
//! message exactly once, emit `done`.
//!
//! The session is exclusively owned by its connection's read loop, so a
//! turn runs to completion before the next inbound frame is even read;
//! nothing here is shared across connections except the database handle.

mod turn;

pub use turn::{CompletedTurn, TurnAccumulator};

use crate::db::{derive_title, Database, DbError, Role};
use crate::ollama::{GenerationClient, PromptTurn};
use crate::protocol::{ClientCommand, ServerEvent};
use crate::think::TagScanner;
use tokio::sync::mpsc;

/// The client went away; the connection handler should exit.
#[derive(Debug, PartialEq, Eq)]
pub struct Disconnected;

pub struct ChatSession<G> {
    db: Database,
    upstream: G,
    outbound: mpsc::UnboundedSender<ServerEvent>,
    active_conversation: Option<String>,
}

impl<G: GenerationClient> ChatSession<G> {
    pub fn new(db: Database, upstream: G, outbound: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self {
            db,
            upstream,
            outbound,
            active_conversation: None,
        }
    }

    /// Handle one decoded client command to completion.
    ///
    /// Returns `Err(Disconnected)` once the outbound channel is closed,
    /// which means the client is no longer reachable and any turn in
    /// flight has been abandoned unpersisted.
    pub async fn handle(&mut self, command: ClientCommand) -> Result<(), Disconnected> {
        match command {
            ClientCommand::StartConversation { message, model } => {
                self.start_conversation(&message, &model).await
            }
            ClientCommand::ResumeConversation { convo_id } => self.resume_conversation(&convo_id),
            ClientCommand::Message { message, model } => self.message(&message, &model).await,
            ClientCommand::Unknown => Ok(()),
        }
    }

    async fn start_conversation(&mut self, message: &str, model: &str) -> Result<(), Disconnected> {
        tracing::info!(model = %model, "Starting new conversation");

        let title = derive_title(message);
        let convo = match self.db.create_conversation(&title, model) {
            Ok(convo) => convo,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create conversation");
                return self.send(ServerEvent::Error("Failed to create conversation".into()));
            }
        };
        self.active_conversation = Some(convo.id.clone());

        if let Err(e) = self.db.add_message(&convo.id, Role::User, message) {
            tracing::error!(error = %e, "Failed to save initial message");
            return self.send(ServerEvent::Error("Failed to save message".into()));
        }

        self.send(ServerEvent::ConversationStarted(convo.id.clone()))?;
        self.run_turn(&convo.id, model, message, true).await
    }

    fn resume_conversation(&mut self, convo_id: &str) -> Result<(), Disconnected> {
        match self.db.get_conversation(convo_id) {
            Ok(_) => {
                self.active_conversation = Some(convo_id.to_string());
                tracing::info!(convo_id = %convo_id, "Resumed conversation");
                self.send(ServerEvent::ConversationResumed(convo_id.to_string()))
            }
            Err(DbError::ConversationNotFound(_)) => {
                tracing::warn!(convo_id = %convo_id, "Conversation not found");
                self.send(ServerEvent::Error("Conversation not found".into()))
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load conversation");
                self.send(ServerEvent::Error("Failed to resume conversation".into()))
            }
        }
    }

    async fn message(&mut self, message: &str, model: &str) -> Result<(), Disconnected> {
        let Some(convo_id) = self.active_conversation.clone() else {
            tracing::warn!("Received message without active conversation");
            return self.send(ServerEvent::Error("No active conversation".into()));
        };

        if let Err(e) = self.db.add_message(&convo_id, Role::User, message) {
            tracing::error!(error = %e, "Failed to save user message");
            return self.send(ServerEvent::Error("Failed to save message".into()));
        }

        self.run_turn(&convo_id, model, message, false).await
    }

    /// Drive one generation turn end to end.
    ///
    /// The user message is already persisted when this runs. For a fresh
    /// conversation that message is the whole prompt context; otherwise
    /// the context is every persisted message of the conversation, the
    /// new one included.
    async fn run_turn(
        &mut self,
        convo_id: &str,
        model: &str,
        message: &str,
        first_message: bool,
    ) -> Result<(), Disconnected> {
        let turns = if first_message {
            vec![PromptTurn::new(Role::User, message)]
        } else {
            match self.db.get_messages(convo_id) {
                Ok(messages) => messages
                    .into_iter()
                    .map(|m| PromptTurn::new(m.role, m.content))
                    .collect(),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to load conversation history");
                    return self.send(ServerEvent::Error(
                        "Failed to get conversation history".into(),
                    ));
                }
            }
        };

        tracing::debug!(convo_id = %convo_id, context_len = turns.len(), "Requesting generation");

        let mut source = match self.upstream.generate_stream(model, &turns).await {
            Ok(source) => source,
            Err(e) => {
                tracing::error!(error = %e, "Upstream request failed");
                return self.send(ServerEvent::Error("Failed to generate response".into()));
            }
        };

        let mut scanner = TagScanner::new();
        let mut turn = TurnAccumulator::new();

        loop {
            match source.next_chunk().await {
                Ok(Some(chunk)) => {
                    turn.push_raw(&chunk.response);
                    for event in scanner.push(&chunk.response) {
                        self.send(turn.apply(event))?;
                    }
                    if chunk.done {
                        break;
                    }
                }
                // Stream closing without a done chunk ends the turn the
                // same way a done chunk does
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Generation stream failed");
                    return self.send(ServerEvent::Error("Failed to generate response".into()));
                }
            }
        }

        for event in scanner.finish() {
            self.send(turn.apply(event))?;
        }

        let completed = turn.finish();
        let saved = self.db.add_message_with_thinking(
            convo_id,
            Role::Assistant,
            &completed.answer,
            &completed.raw,
            completed.reasoning.as_deref(),
            completed.thinking_seconds,
        );

        match saved {
            Ok(_) => {
                tracing::debug!(convo_id = %convo_id, "Assistant message saved");
                self.send(ServerEvent::Done)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to save assistant message");
                self.send(ServerEvent::Error("Failed to save response".into()))
            }
        }
    }

    fn send(&self, event: ServerEvent) -> Result<(), Disconnected> {
        self.outbound.send(event).map_err(|_| Disconnected)
    }
}
