//! Relay API routes

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::config::Config;
use crate::core::ExchangeReply;
use crate::providers::{GenieClient, GenieError};

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// Non-2xx responses carry a JSON body with a `detail` string.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

impl From<GenieError> for ApiError {
    fn from(err: GenieError) -> Self {
        let detail = match &err {
            GenieError::NotConfigured(_) => err.to_string(),
            _ => format!("Failed to communicate with Genie: {err}"),
        };
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail,
        }
    }
}

async fn send_message(
    State(config): State<Config>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<ExchangeReply>, ApiError> {
    let genie = GenieClient::from_config(&config)?;

    let reply = genie
        .send_and_wait(&request.content, request.conversation_id.as_deref())
        .await?;

    Ok(Json(reply))
}

/// Configuration probe. Always answers 200; the body says how healthy we are.
async fn health(State(config): State<Config>) -> Json<serde_json::Value> {
    let genie = match GenieClient::from_config(&config) {
        Ok(genie) => genie,
        Err(err) => {
            return Json(json!({
                "status": "not_configured",
                "configured": false,
                "error": err.to_string(),
            }));
        }
    };

    match genie.space_name().await {
        Ok(space_name) => Json(json!({
            "status": "healthy",
            "configured": true,
            "space_id": redact(genie.space_id(), 8),
            "space_name": space_name,
            "host": redact(genie.host(), 30),
        })),
        Err(err) => {
            tracing::warn!("failed to verify Genie space: {err}");
            Json(json!({
                "status": "space_not_accessible",
                "configured": true,
                "space_id": redact(genie.space_id(), 8),
                "host": redact(genie.host(), 30),
                "error": err.to_string(),
            }))
        }
    }
}

/// Keep only a prefix of an identifier for health output.
fn redact(value: &str, keep: usize) -> String {
    if value.chars().count() > keep {
        let prefix: String = value.chars().take(keep).collect();
        format!("{prefix}...")
    } else {
        value.to_string()
    }
}

pub fn router() -> Router<Config> {
    Router::new()
        .route("/api/genie/health", get(health))
        .route("/api/genie/send-message", post(send_message))
}
