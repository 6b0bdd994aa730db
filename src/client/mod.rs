//! HTTP client for the backend relay

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::core::{ExchangeReply, MessageRelay, RelayError};

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    content: &'a str,
    conversation_id: Option<&'a str>,
}

/// Error body shape the relay uses for non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

pub struct RelayClient {
    client: Client,
    base_url: String,
}

impl RelayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MessageRelay for RelayClient {
    async fn send_message(
        &self,
        content: &str,
        conversation_id: Option<&str>,
    ) -> Result<ExchangeReply, RelayError> {
        let response = self
            .client
            .post(format!("{}/api/genie/send-message", self.base_url))
            .json(&SendMessageRequest {
                content,
                conversation_id,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.detail);
            return Err(RelayError::Api {
                status: status.as_u16(),
                detail,
            });
        }

        Ok(response.json::<ExchangeReply>().await?)
    }
}
