//! Message exchange controller
//!
//! The controller is the only writer of the conversation session. One call to
//! [`ExchangeController::submit`] performs one full exchange:
//! 1. Validates the input and the single-in-flight guard
//! 2. Appends a provisional user message and clears any prior error
//! 3. Issues exactly one outbound call through the [`MessageRelay`] seam
//! 4. Reconciles the result back into the session: settle + assistant reply
//!    on success, fail + session error on failure

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conversation::{Message, QueryResults, Session};

/// Shown when a failed exchange carries no `detail` of its own.
pub const GENERIC_SEND_ERROR: &str =
    "Something went wrong while sending your message. Please try again.";

/// One reply from the relay, as carried on the wire.
///
/// `content` is the only required field; everything else is whatever the
/// query service produced for this turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeReply {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_results: Option<QueryResults>,
}

/// Errors from the outbound hop.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("relay returned HTTP {status}")]
    Api { status: u16, detail: Option<String> },
}

impl RelayError {
    /// The reason surfaced to the user: the server's `detail` when the
    /// response carried one, a generic message otherwise.
    pub fn reason(&self) -> String {
        match self {
            RelayError::Api {
                detail: Some(detail),
                ..
            } => detail.clone(),
            _ => GENERIC_SEND_ERROR.to_string(),
        }
    }
}

/// Outbound seam between the controller and the relay.
#[async_trait]
pub trait MessageRelay {
    async fn send_message(
        &self,
        content: &str,
        conversation_id: Option<&str>,
    ) -> Result<ExchangeReply, RelayError>;
}

/// What a `submit` call did, for the caller's rendering convenience.
///
/// The session itself remains the source of truth for all state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Empty input, or another exchange was still pending; nothing changed.
    Skipped,
    /// The exchange settled and an assistant reply was appended.
    Replied,
    /// The exchange failed; the session error says why.
    Failed,
}

pub struct ExchangeController<R> {
    session: Session,
    relay: R,
}

impl<R: MessageRelay> ExchangeController<R> {
    pub fn new(relay: R) -> Self {
        Self {
            session: Session::new(),
            relay,
        }
    }

    /// Attach an existing session, e.g. one seeded by a test.
    pub fn with_session(session: Session, relay: R) -> Self {
        Self { session, relay }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run one exchange for the submitted text.
    ///
    /// At most one exchange is ever in flight: `&mut self` serializes calls,
    /// and the pending-message guard rejects a submit even if a stalled
    /// exchange left a message in `Sending`.
    pub async fn submit(&mut self, text: &str) -> Outcome {
        let text = text.trim();
        if text.is_empty() {
            return Outcome::Skipped;
        }
        if self.session.has_pending() {
            tracing::debug!("submit ignored: an exchange is already pending");
            return Outcome::Skipped;
        }

        let message = Message::user(text);
        let message_id = message.id.clone();
        self.session.append(message);
        self.session.clear_error();

        let conversation_id = self.session.conversation_id().map(str::to_string);
        tracing::debug!(
            conversation_id = conversation_id.as_deref().unwrap_or("<new>"),
            "sending message"
        );

        match self
            .relay
            .send_message(text, conversation_id.as_deref())
            .await
        {
            Ok(reply) => {
                if let Some(id) = reply.conversation_id.as_deref() {
                    self.session.adopt_conversation(id);
                }
                self.session.settle(&message_id);
                self.session.append(assistant_message(reply));
                Outcome::Replied
            }
            Err(err) => {
                tracing::warn!("exchange failed: {err}");
                self.session.fail(&message_id);
                self.session.set_error(&err.reason());
                Outcome::Failed
            }
        }
    }
}

/// Build the assistant message for a successful reply, keeping the service's
/// message id and timestamp when it reported them.
fn assistant_message(reply: ExchangeReply) -> Message {
    let mut message = Message::assistant(&reply.content);
    if let Some(id) = reply.message_id {
        message.id = id;
    }
    if let Some(timestamp) = reply.timestamp {
        message.timestamp = timestamp;
    }
    message.sql_query = reply.sql_query;
    message.query_results = reply.query_results;
    message
}
