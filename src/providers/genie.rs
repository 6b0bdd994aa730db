//! Databricks Genie conversational API client
//!
//! Genie answers a message asynchronously: the message is created, then moves
//! through statuses until it completes, and any generated query result is
//! fetched from a separate attachment endpoint. This client hides that shape
//! behind a single send-and-wait call that produces one [`ExchangeReply`].

use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::config::Config;
use crate::conversation::QueryResults;
use crate::core::ExchangeReply;

use super::GenieError;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(300);

/// Used when a completed message offers neither a description nor any text.
const COMPLETION_NOTICE: &str = "Query completed successfully.";

#[derive(Debug)]
pub struct GenieClient {
    client: Client,
    host: String,
    token: String,
    space_id: String,
    poll_interval: Duration,
    wait_timeout: Duration,
}

#[derive(Debug, Serialize)]
struct CreateMessageRequest<'a> {
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct StartConversationResponse {
    conversation_id: String,
    message_id: String,
}

#[derive(Debug, Deserialize)]
struct GenieMessage {
    id: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    attachments: Vec<Attachment>,
    #[serde(default)]
    error: Option<MessageError>,
}

#[derive(Debug, Deserialize)]
struct MessageError {
    #[serde(default)]
    error: Option<String>,
    #[serde(default, rename = "type")]
    error_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Attachment {
    #[serde(default)]
    attachment_id: Option<String>,
    #[serde(default)]
    text: Option<TextAttachment>,
    #[serde(default)]
    query: Option<QueryAttachment>,
}

#[derive(Debug, Deserialize)]
struct TextAttachment {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryAttachment {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryResultResponse {
    #[serde(default)]
    statement_response: Option<StatementResponse>,
}

#[derive(Debug, Deserialize)]
struct StatementResponse {
    #[serde(default)]
    manifest: Option<StatementManifest>,
    #[serde(default)]
    result: Option<StatementResult>,
}

#[derive(Debug, Deserialize)]
struct StatementManifest {
    #[serde(default)]
    schema: Option<StatementSchema>,
}

#[derive(Debug, Deserialize)]
struct StatementSchema {
    #[serde(default)]
    columns: Vec<SchemaColumn>,
}

#[derive(Debug, Deserialize)]
struct SchemaColumn {
    name: String,
    #[serde(default)]
    type_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    data_array: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct SpaceResponse {
    #[serde(default)]
    name: Option<String>,
}

impl GenieClient {
    /// Build a client from the environment-derived config, failing with the
    /// name of the first missing setting.
    pub fn from_config(config: &Config) -> Result<Self, GenieError> {
        let host = config
            .databricks_host
            .as_deref()
            .ok_or(GenieError::NotConfigured("DATABRICKS_HOST"))?;
        let token = config
            .databricks_token
            .as_deref()
            .ok_or(GenieError::NotConfigured("DATABRICKS_TOKEN"))?;
        let space_id = config
            .genie_space_id
            .as_deref()
            .ok_or(GenieError::NotConfigured("DATABRICKS_GENIE_SPACE_ID"))?;

        Ok(Self {
            client: Client::new(),
            host: host.trim_end_matches('/').to_string(),
            token: token.to_string(),
            space_id: space_id.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
        })
    }

    /// Override the polling cadence, mainly for tests.
    pub fn with_poll_settings(mut self, interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = interval;
        self.wait_timeout = timeout;
        self
    }

    pub fn space_id(&self) -> &str {
        &self.space_id
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Start or continue a conversation, wait for the answer, and assemble
    /// the reply.
    pub async fn send_and_wait(
        &self,
        content: &str,
        conversation_id: Option<&str>,
    ) -> Result<ExchangeReply, GenieError> {
        let (conversation_id, message_id) = match conversation_id {
            None => {
                tracing::info!("starting new Genie conversation");
                let started: StartConversationResponse = self
                    .post_json(
                        format!("{}/start-conversation", self.space_url()),
                        &CreateMessageRequest { content },
                    )
                    .await?;
                (started.conversation_id, started.message_id)
            }
            Some(existing) => {
                tracing::info!(conversation_id = existing, "continuing Genie conversation");
                let message: GenieMessage = self
                    .post_json(
                        format!("{}/conversations/{existing}/messages", self.space_url()),
                        &CreateMessageRequest { content },
                    )
                    .await?;
                (existing.to_string(), message.id)
            }
        };

        let message = self.wait_for_completion(&conversation_id, &message_id).await?;
        self.build_reply(conversation_id, message).await
    }

    /// Fetch the space name, used by the relay health probe.
    pub async fn space_name(&self) -> Result<Option<String>, GenieError> {
        let space: SpaceResponse = self.get_json(self.space_url()).await?;
        Ok(space.name)
    }

    /// Poll the message until it reaches a terminal status.
    async fn wait_for_completion(
        &self,
        conversation_id: &str,
        message_id: &str,
    ) -> Result<GenieMessage, GenieError> {
        let deadline = Instant::now() + self.wait_timeout;

        loop {
            let message: GenieMessage = self
                .get_json(format!(
                    "{}/conversations/{conversation_id}/messages/{message_id}",
                    self.space_url()
                ))
                .await?;

            let status = message.status.as_deref().unwrap_or("UNKNOWN");
            tracing::debug!(message_id, status, "polled Genie message");

            match status {
                "COMPLETED" => return Ok(message),
                "FAILED" | "CANCELLED" | "QUERY_RESULT_EXPIRED" => {
                    let reason = message
                        .error
                        .and_then(|e| e.error.or(e.error_type))
                        .unwrap_or_else(|| status.to_string());
                    return Err(GenieError::Failed(reason));
                }
                _ => {
                    if Instant::now() >= deadline {
                        return Err(GenieError::Timeout(self.wait_timeout.as_secs()));
                    }
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    /// Turn a completed message and its attachments into one reply.
    ///
    /// Reply text precedence: query description, then text attachment, then
    /// the message's own content, then a fixed completion notice.
    async fn build_reply(
        &self,
        conversation_id: String,
        message: GenieMessage,
    ) -> Result<ExchangeReply, GenieError> {
        let mut text_content = None;
        let mut description = None;
        let mut sql_query = None;
        let mut query_results = None;

        for attachment in &message.attachments {
            if let Some(text) = &attachment.text {
                text_content = text.content.clone();
            }
            if let Some(query) = &attachment.query {
                sql_query = query.query.clone();
                description = query.description.clone();

                if let Some(attachment_id) = &attachment.attachment_id {
                    match self
                        .attachment_query_result(&conversation_id, &message.id, attachment_id)
                        .await
                    {
                        Ok(results) => query_results = results,
                        Err(err) => {
                            // A reply without its table is still useful.
                            tracing::warn!("failed to fetch query results: {err}");
                        }
                    }
                }
            }
        }

        let content = description
            .or(text_content)
            .or(message.content.filter(|c| !c.is_empty()))
            .unwrap_or_else(|| COMPLETION_NOTICE.to_string());

        Ok(ExchangeReply {
            content,
            conversation_id: Some(conversation_id),
            message_id: Some(message.id),
            status: Some("COMPLETED".to_string()),
            timestamp: Some(Utc::now()),
            sql_query,
            query_results,
        })
    }

    async fn attachment_query_result(
        &self,
        conversation_id: &str,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<Option<QueryResults>, GenieError> {
        let response: QueryResultResponse = self
            .get_json(format!(
                "{}/conversations/{conversation_id}/messages/{message_id}/attachments/{attachment_id}/query-result",
                self.space_url()
            ))
            .await?;

        let Some(statement) = response.statement_response else {
            return Ok(None);
        };

        let data = statement
            .result
            .map(|r| r.data_array)
            .unwrap_or_default();
        let columns = statement
            .manifest
            .and_then(|m| m.schema)
            .map(|s| s.columns)
            .unwrap_or_default();

        if columns.is_empty() || data.is_empty() {
            return Ok(None);
        }

        let row_count = data.len();
        tracing::info!(row_count, "retrieved query results");

        Ok(Some(QueryResults {
            column_types: columns
                .iter()
                .map(|c| c.type_text.clone().unwrap_or_default())
                .collect(),
            columns: columns.into_iter().map(|c| c.name).collect(),
            data,
            row_count,
        }))
    }

    fn space_url(&self) -> String {
        format!("{}/api/2.0/genie/spaces/{}", self.host, self.space_id)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, GenieError> {
        let response = self.client.get(url).bearer_auth(&self.token).send().await?;
        Self::decode(response).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        url: String,
        body: &B,
    ) -> Result<T, GenieError> {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GenieError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenieError::InvalidResponse(format!("{status}: {body}")));
        }
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| GenieError::InvalidResponse(format!("failed to parse response: {e}")))
    }
}
