//! End-to-end exchange tests: chat client -> relay -> mocked Genie upstream.

use axum::Router;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use genie_chat::client::RelayClient;
use genie_chat::config::Config;
use genie_chat::conversation::{MessageStatus, Sender};
use genie_chat::core::{ExchangeController, Outcome};
use genie_chat::routes;

fn config_for(upstream: Option<&MockServer>) -> Config {
    Config {
        host: "127.0.0.1".into(),
        port: 0,
        databricks_host: upstream.map(|s| s.uri()),
        databricks_token: upstream.map(|_| "test-token".into()),
        genie_space_id: upstream.map(|_| "space1".into()),
        relay_url: String::new(),
    }
}

/// Serve the real relay on an ephemeral port, returning its base URL.
async fn spawn_relay(config: Config) -> String {
    let app = Router::new().merge(routes::router()).with_state(config);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn first_exchange_adopts_conversation_and_carries_results() {
    let upstream = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/2.0/genie/spaces/space1/start-conversation"))
        .and(body_json(json!({ "content": "What tables are available?" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conversation_id": "abc123",
            "message_id": "msg-1",
        })))
        .expect(1)
        .mount(&upstream)
        .await;

    Mock::given(method("GET"))
        .and(path(
            "/api/2.0/genie/spaces/space1/conversations/abc123/messages/msg-1",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg-1",
            "status": "COMPLETED",
            "attachments": [{
                "attachment_id": "att-1",
                "query": { "query": "SHOW TABLES", "description": "Here are your tables" },
            }],
        })))
        .mount(&upstream)
        .await;

    Mock::given(method("GET"))
        .and(path(
            "/api/2.0/genie/spaces/space1/conversations/abc123/messages/msg-1/attachments/att-1/query-result",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "statement_response": {
                "manifest": { "schema": { "columns": [{ "name": "name", "type_text": "string" }] } },
                "result": { "data_array": [["orders"], ["users"]] },
            },
        })))
        .mount(&upstream)
        .await;

    let relay_url = spawn_relay(config_for(Some(&upstream))).await;
    let mut controller = ExchangeController::new(RelayClient::new(relay_url));

    let outcome = controller.submit("What tables are available?").await;
    assert_eq!(outcome, Outcome::Replied);

    let session = controller.session();
    assert_eq!(session.conversation_id(), Some("abc123"));
    assert!(session.error().is_none());

    let messages = session.messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].sender, Sender::User);
    assert_eq!(messages[1].status, Some(MessageStatus::Sent));

    let reply = &messages[2];
    assert_eq!(reply.sender, Sender::Assistant);
    assert_eq!(reply.content, "Here are your tables");
    assert_eq!(reply.id, "msg-1");
    assert_eq!(reply.sql_query.as_deref(), Some("SHOW TABLES"));
    let results = reply.query_results.as_ref().unwrap();
    assert_eq!(results.columns, vec!["name"]);
    assert_eq!(results.row_count, 2);
    assert_eq!(results.data.len(), 2);
}

#[tokio::test]
async fn second_exchange_reuses_the_adopted_conversation() {
    let upstream = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/2.0/genie/spaces/space1/start-conversation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conversation_id": "abc123",
            "message_id": "msg-1",
        })))
        .expect(1)
        .mount(&upstream)
        .await;

    Mock::given(method("GET"))
        .and(path(
            "/api/2.0/genie/spaces/space1/conversations/abc123/messages/msg-1",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg-1",
            "status": "COMPLETED",
            "attachments": [{ "text": { "content": "First answer." } }],
        })))
        .mount(&upstream)
        .await;

    // The follow-up must land on the existing conversation, not start a new one.
    Mock::given(method("POST"))
        .and(path(
            "/api/2.0/genie/spaces/space1/conversations/abc123/messages",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg-2",
            "status": "SUBMITTED",
        })))
        .expect(1)
        .mount(&upstream)
        .await;

    Mock::given(method("GET"))
        .and(path(
            "/api/2.0/genie/spaces/space1/conversations/abc123/messages/msg-2",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg-2",
            "status": "COMPLETED",
            "attachments": [{ "text": { "content": "Second answer." } }],
        })))
        .mount(&upstream)
        .await;

    let relay_url = spawn_relay(config_for(Some(&upstream))).await;
    let mut controller = ExchangeController::new(RelayClient::new(relay_url));

    assert_eq!(controller.submit("first question").await, Outcome::Replied);
    assert_eq!(controller.submit("second question").await, Outcome::Replied);

    let session = controller.session();
    assert_eq!(session.conversation_id(), Some("abc123"));
    assert_eq!(session.messages().len(), 5);
    assert_eq!(session.messages()[4].content, "Second answer.");
}

#[tokio::test]
async fn relay_detail_reaches_the_session_error() {
    // No upstream configuration at all: the relay answers 500 with a detail.
    let relay_url = spawn_relay(config_for(None)).await;
    let mut controller = ExchangeController::new(RelayClient::new(relay_url));

    let outcome = controller.submit("anything").await;
    assert_eq!(outcome, Outcome::Failed);

    let session = controller.session();
    let messages = session.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].status, Some(MessageStatus::Error));
    assert_eq!(
        session.error(),
        Some("Genie is not configured. Please set DATABRICKS_HOST.")
    );
    assert!(session.conversation_id().is_none());
}

#[tokio::test]
async fn upstream_failure_keeps_prior_conversation_and_appends_no_reply() {
    let upstream = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/2.0/genie/spaces/space1/start-conversation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conversation_id": "abc123",
            "message_id": "msg-1",
        })))
        .mount(&upstream)
        .await;

    Mock::given(method("GET"))
        .and(path(
            "/api/2.0/genie/spaces/space1/conversations/abc123/messages/msg-1",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg-1",
            "status": "COMPLETED",
            "content": "ok",
        })))
        .mount(&upstream)
        .await;

    Mock::given(method("POST"))
        .and(path(
            "/api/2.0/genie/spaces/space1/conversations/abc123/messages",
        ))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&upstream)
        .await;

    let relay_url = spawn_relay(config_for(Some(&upstream))).await;
    let mut controller = ExchangeController::new(RelayClient::new(relay_url));

    assert_eq!(controller.submit("first").await, Outcome::Replied);
    assert_eq!(controller.submit("second").await, Outcome::Failed);

    let session = controller.session();
    assert_eq!(session.conversation_id(), Some("abc123"));
    // welcome + 2 user turns + 1 assistant turn; no reply for the failure.
    assert_eq!(session.messages().len(), 4);
    assert_eq!(session.messages()[3].status, Some(MessageStatus::Error));
    let error = session.error().unwrap();
    assert!(error.contains("Failed to communicate with Genie"));
}
