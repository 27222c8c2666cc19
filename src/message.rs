//! Wire types exchanged with the chatbot backend.
//!
//! The widget sends one [`ChatbotRequest`] per user message and receives a
//! [`ResponseEnvelope`] holding an ordered list of [`BotMessage`]s. Some
//! transports (API gateways in proxy mode, for instance) wrap the envelope in a
//! string-valued `body` field; [`decode_envelope`] strips that layer.
//!
//! # Example
//!
//! ```rust
//! use concierge_chat::message::{BotMessage, decode_envelope};
//!
//! let raw = r#"{"body": "{\"messages\":[{\"type\":\"unstructured\",\"unstructured\":{\"text\":\"Hi\"}}]}"}"#;
//! let envelope = decode_envelope(200, raw).unwrap();
//! assert!(matches!(&envelope.messages[0], BotMessage::Unstructured { .. }));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ChatError;

/// Message type tag used for plain text in both directions.
pub const UNSTRUCTURED: &str = "unstructured";

/// A single user message, created on submit and discarded after sending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub text: String,
}

impl ChatMessage {
    /// Create a message with a fresh id.
    #[must_use]
    pub fn new(user_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            text: text.into(),
        }
    }
}

/// One entry of the outbound `messages` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unstructured: Option<ChatMessage>,
}

/// Body of the outbound chatbot call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatbotRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub messages: Vec<OutboundMessage>,
}

impl ChatbotRequest {
    /// Wrap a single user message for the given session.
    #[must_use]
    pub fn new(session_id: impl Into<String>, message: ChatMessage) -> Self {
        Self {
            user_id: message.user_id.clone(),
            session_id: Some(session_id.into()),
            messages: vec![OutboundMessage {
                kind: UNSTRUCTURED.to_string(),
                unstructured: Some(message),
            }],
        }
    }

    /// The first plain-text message, if any.
    #[must_use]
    pub fn first_text(&self) -> Option<&ChatMessage> {
        self.messages.first().and_then(|m| m.unstructured.as_ref())
    }
}

/// Plain text reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnstructuredReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Fields used to build a product card.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPayload {
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub click_action: String,
    #[serde(default)]
    pub button_label: String,
}

/// Structured reply, discriminated by its own `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StructuredReply {
    Product {
        #[serde(default)]
        text: String,
        payload: ProductPayload,
    },
    #[serde(other)]
    Unsupported,
}

/// A message from the bot, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BotMessage {
    Unstructured { unstructured: UnstructuredReply },
    Structured { structured: StructuredReply },
    #[serde(other)]
    Unsupported,
}

impl BotMessage {
    /// Plain text reply stamped with a fresh id and the current time.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Unstructured {
            unstructured: UnstructuredReply {
                id: Some(Uuid::new_v4().to_string()),
                text: text.into(),
                timestamp: Some(chrono::Utc::now().to_rfc3339()),
            },
        }
    }

    /// Product card reply with a summary line.
    #[must_use]
    pub fn product(text: impl Into<String>, payload: ProductPayload) -> Self {
        Self::Structured {
            structured: StructuredReply::Product {
                text: text.into(),
                payload,
            },
        }
    }
}

/// Top-level response object.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default)]
    pub messages: Vec<BotMessage>,
}

impl ResponseEnvelope {
    #[must_use]
    pub fn new(messages: Vec<BotMessage>) -> Self {
        Self { messages }
    }
}

/// Outcome of peeling a transport wrapper off a JSON document.
#[derive(Debug, Clone, PartialEq)]
pub enum Unwrapped {
    /// The payload itself.
    Payload(Value),
    /// The wrapper reported an error status; `detail` comes from the inner
    /// `error` or `message` field.
    Failed { status: u16, detail: Option<String> },
}

/// Strip a `body` wrapper (string or object) from a JSON value.
///
/// A wrapper carrying `statusCode >= 400` is reported as [`Unwrapped::Failed`].
pub fn unwrap_body(value: Value) -> Result<Unwrapped, serde_json::Error> {
    let Value::Object(mut map) = value else {
        return Ok(Unwrapped::Payload(value));
    };

    let inner = match map.remove("body") {
        Some(Value::String(raw)) => serde_json::from_str(&raw)?,
        Some(body @ Value::Object(_)) => body,
        Some(other) => {
            map.insert("body".to_string(), other);
            return Ok(Unwrapped::Payload(Value::Object(map)));
        }
        None => return Ok(Unwrapped::Payload(Value::Object(map))),
    };

    let status = map
        .get("statusCode")
        .and_then(Value::as_u64)
        .and_then(|s| u16::try_from(s).ok());

    match status {
        Some(status) if status >= 400 => Ok(Unwrapped::Failed {
            status,
            detail: error_detail(&inner),
        }),
        _ => Ok(Unwrapped::Payload(inner)),
    }
}

/// Pull a human readable error out of `{"error": ..}` or `{"message": ..}`.
pub fn error_detail(value: &Value) -> Option<String> {
    ["error", "message"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Decode a response envelope received with HTTP `status`, unwrapping a
/// double-encoded `body` if present.
///
/// A wrapper reporting `statusCode >= 400` becomes [`ChatError::Status`] with
/// the wrapper's status, not the transport's.
pub fn decode_envelope(status: u16, raw: &str) -> Result<ResponseEnvelope, ChatError> {
    let decode_err = |source| ChatError::Decode { status, source };
    let value: Value = serde_json::from_str(raw).map_err(decode_err)?;
    match unwrap_body(value).map_err(decode_err)? {
        Unwrapped::Payload(inner) => serde_json::from_value(inner).map_err(decode_err),
        Unwrapped::Failed { status, detail } => Err(ChatError::Status { status, detail }),
    }
}
