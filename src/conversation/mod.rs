//! Conversation types and session state management

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Text shown as the seeded assistant greeting in a fresh session.
pub const WELCOME_MESSAGE: &str =
    "Hi! I'm Genie. Ask me questions about your data in plain English and \
     I'll answer with generated queries and results.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

/// Delivery lifecycle of a user-originated message.
///
/// A message moves `Sending -> Sent` or `Sending -> Error` exactly once and
/// never returns to `Sending`. Assistant messages carry no status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sending,
    Sent,
    Error,
}

/// Tabular result payload attached to an assistant reply.
///
/// `row_count` is the true total reported by the query service; rendering may
/// show fewer rows but never changes this number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResults {
    pub columns: Vec<String>,
    #[serde(default)]
    pub column_types: Vec<String>,
    pub data: Vec<Vec<serde_json::Value>>,
    pub row_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    /// Present only on user-originated messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MessageStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_results: Option<QueryResults>,
}

impl Message {
    /// A freshly submitted user message, provisional until settled or failed.
    pub fn user(content: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.to_string(),
            sender: Sender::User,
            timestamp: Utc::now(),
            status: Some(MessageStatus::Sending),
            sql_query: None,
            query_results: None,
        }
    }

    pub fn assistant(content: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.to_string(),
            sender: Sender::Assistant,
            timestamp: Utc::now(),
            status: None,
            sql_query: None,
            query_results: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == Some(MessageStatus::Sending)
    }
}

/// The single in-memory conversation session.
///
/// Holds the ordered message sequence, the conversation identifier assigned
/// by the query service, and the error from the most recent failed exchange.
/// This is the only source of truth for what the client renders; it is
/// mutated exclusively by the exchange controller.
#[derive(Debug, Clone)]
pub struct Session {
    conversation_id: Option<String>,
    messages: Vec<Message>,
    error: Option<String>,
}

impl Session {
    /// Create a session seeded with the synthetic welcome message.
    pub fn new() -> Self {
        let mut welcome = Message::assistant(WELCOME_MESSAGE);
        welcome.id = "welcome".to_string();
        Self {
            conversation_id: None,
            messages: vec![welcome],
            error: None,
        }
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// True while a user message is still awaiting its exchange result.
    pub fn has_pending(&self) -> bool {
        self.messages.iter().any(Message::is_pending)
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Adopt the conversation identifier returned by the first successful
    /// exchange. Once set, later calls are ignored so the identifier is
    /// reused verbatim for the rest of the session.
    pub fn adopt_conversation(&mut self, id: &str) {
        if self.conversation_id.is_none() {
            self.conversation_id = Some(id.to_string());
        }
    }

    /// Mark the pending message with the given id as delivered.
    ///
    /// Addressed by id rather than position so the transition stays correct
    /// even if more than one exchange were ever allowed in flight. Returns
    /// false when the id is unknown or the message is not pending.
    pub fn settle(&mut self, id: &str) -> bool {
        self.transition(id, MessageStatus::Sent)
    }

    /// Mark the pending message with the given id as failed.
    pub fn fail(&mut self, id: &str) -> bool {
        self.transition(id, MessageStatus::Error)
    }

    fn transition(&mut self, id: &str, to: MessageStatus) -> bool {
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(m) if m.is_pending() => {
                m.status = Some(to);
                true
            }
            _ => false,
        }
    }

    pub fn set_error(&mut self, reason: &str) {
        self.error = Some(reason.to_string());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
