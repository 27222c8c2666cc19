//! `POST /chatbot` handler.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use super::Concierge;
use crate::message::{ResponseEnvelope, Unwrapped, unwrap_body};

/// Router serving the concierge on `/chatbot`.
pub fn router(concierge: Arc<Concierge>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods([Method::OPTIONS, Method::POST]);

    Router::new()
        .route("/chatbot", post(chatbot_handler))
        .layer(cors)
        .with_state(concierge)
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

/// Accepts either the request itself or an event wrapping it in `body`.
///
/// Fields are read leniently: scalar ids are taken as strings and a null first
/// message counts as a message without text.
pub async fn chatbot_handler(State(concierge): State<Arc<Concierge>>, raw: String) -> Response {
    let request = match parse_request(&raw) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let Some(first) = request
        .get("messages")
        .and_then(Value::as_array)
        .and_then(|messages| messages.first())
    else {
        return bad_request("Missing messages[]");
    };
    let unstructured = first.get("unstructured");
    let field = |key: &str| unstructured.and_then(|u| u.get(key)).and_then(scalar_string);

    let Some(text) = field("text").filter(|t| !t.is_empty()) else {
        return bad_request("Missing unstructured.text");
    };

    let session_id = request
        .get("sessionId")
        .and_then(scalar_string)
        .filter(|s| !s.is_empty())
        .or_else(|| field("id").filter(|s| !s.is_empty()))
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let user_id = request
        .get("userId")
        .and_then(scalar_string)
        .filter(|s| !s.is_empty())
        .or_else(|| field("userId").filter(|s| !s.is_empty()));

    tracing::info!(
        name: "concierge.request",
        session_id = %session_id,
        text_length = text.len(),
        "Chatbot request"
    );

    match concierge.respond(&session_id, user_id.as_deref(), &text) {
        Ok(messages) => (StatusCode::OK, Json(ResponseEnvelope::new(messages))).into_response(),
        Err(e) => {
            tracing::error!(name: "concierge.request.failed", error = %e, "Chatbot request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

fn parse_request(raw: &str) -> Result<Value, Response> {
    let value: Value = serde_json::from_str(raw).map_err(|_| bad_request("Invalid JSON body"))?;
    match unwrap_body(value) {
        Ok(Unwrapped::Payload(inner)) => Ok(inner),
        Ok(Unwrapped::Failed { .. }) | Err(_) => Err(bad_request("Invalid JSON body")),
    }
}

/// Trimmed string form of a string, number or boolean.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concierge::{Catalog, GREETING, SuggestionQueue};
    use axum_test::TestServer;

    fn server() -> (TestServer, tokio::sync::mpsc::Receiver<crate::concierge::DiningRequest>) {
        let (queue, rx) = SuggestionQueue::bounded(4);
        let concierge = Arc::new(Concierge::new(Arc::new(Catalog::default()), queue));
        (TestServer::new(router(concierge)).unwrap(), rx)
    }

    fn hello(session_id: Option<&str>) -> Value {
        json!({
            "userId": "u-1",
            "sessionId": session_id,
            "messages": [{"type": "unstructured", "unstructured": {"id": "m-1", "userId": "u-1", "text": "hello"}}]
        })
    }

    #[tokio::test]
    async fn test_plain_and_wrapped_requests_answer_alike() {
        let (server, _rx) = server();

        let plain = server.post("/chatbot").json(&hello(Some("s-1"))).await;
        plain.assert_status_ok();
        let plain: ResponseEnvelope = plain.json();

        let wrapped = server
            .post("/chatbot")
            .json(&json!({ "body": hello(None).to_string() }))
            .await;
        wrapped.assert_status_ok();
        let wrapped: ResponseEnvelope = wrapped.json();

        assert_eq!(plain.messages.len(), 1);
        assert_eq!(wrapped.messages.len(), 1);
        for envelope in [plain, wrapped] {
            match &envelope.messages[0] {
                crate::message::BotMessage::Unstructured { unstructured } => {
                    assert_eq!(unstructured.text, GREETING);
                    assert!(unstructured.id.is_some());
                    assert!(unstructured.timestamp.is_some());
                }
                other => panic!("unexpected reply {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_missing_fields_are_rejected() {
        let (server, _rx) = server();

        let resp = server.post("/chatbot").json(&json!({})).await;
        resp.assert_status(StatusCode::BAD_REQUEST);
        resp.assert_json(&json!({"error": "Missing messages[]"}));

        let resp = server
            .post("/chatbot")
            .json(&json!({"messages": [{"type": "unstructured", "unstructured": {"text": "  "}}]}))
            .await;
        resp.assert_status(StatusCode::BAD_REQUEST);
        resp.assert_json(&json!({"error": "Missing unstructured.text"}));

        let resp = server.post("/chatbot").json(&json!({"messages": []})).await;
        resp.assert_status(StatusCode::BAD_REQUEST);
        resp.assert_json(&json!({"error": "Missing messages[]"}));

        let resp = server.post("/chatbot").json(&json!({"messages": [null]})).await;
        resp.assert_status(StatusCode::BAD_REQUEST);
        resp.assert_json(&json!({"error": "Missing unstructured.text"}));

        let resp = server.post("/chatbot").text("not json").await;
        resp.assert_status(StatusCode::BAD_REQUEST);
        resp.assert_json(&json!({"error": "Invalid JSON body"}));
    }

    #[tokio::test]
    async fn test_scalar_ids_are_read_as_strings() {
        let (server, _rx) = server();

        let resp = server
            .post("/chatbot")
            .json(&json!({
                "sessionId": 42,
                "messages": [{"type": "unstructured", "unstructured": {"text": "hello"}}]
            }))
            .await;
        resp.assert_status_ok();

        let resp = server
            .post("/chatbot")
            .json(&json!({
                "messages": [{"type": "unstructured", "unstructured": {"id": 7, "userId": 9, "text": "hello"}}]
            }))
            .await;
        resp.assert_status_ok();
        let envelope: ResponseEnvelope = resp.json();
        assert_eq!(envelope.messages.len(), 1);
    }

    #[test]
    fn test_scalar_string() {
        assert_eq!(scalar_string(&json!(" s-1 ")).as_deref(), Some("s-1"));
        assert_eq!(scalar_string(&json!(42)).as_deref(), Some("42"));
        assert_eq!(scalar_string(&json!(true)).as_deref(), Some("true"));
        assert_eq!(scalar_string(&json!(null)), None);
        assert_eq!(scalar_string(&json!({"id": 1})), None);
    }
}
