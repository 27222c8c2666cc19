//! Outbound chatbot call.
//!
//! One [`ChatbotRequest`] goes out per user message; the reply is decoded into
//! a [`ResponseEnvelope`]. Failures are never retried.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::ChatbotConfig;
use crate::error::ChatError;
use crate::message::{
    ChatbotRequest, ResponseEnvelope, Unwrapped, decode_envelope, error_detail, unwrap_body,
};

/// Anything that can answer a chatbot request.
#[async_trait]
pub trait ChatBackend: Send + Sync + std::fmt::Debug {
    async fn send(&self, request: &ChatbotRequest) -> Result<ResponseEnvelope, ChatError>;
}

/// HTTP chatbot backend.
#[derive(Clone)]
pub struct HttpChatbot {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for HttpChatbot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpChatbot")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl HttpChatbot {
    /// Build a client for the configured endpoint.
    pub fn new(config: &ChatbotConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatBackend for HttpChatbot {
    async fn send(&self, request: &ChatbotRequest) -> Result<ResponseEnvelope, ChatError> {
        let mut rb = self.http.post(&self.endpoint).json(request);
        if let Some(key) = &self.api_key {
            rb = rb.header("x-api-key", key);
        }

        let resp = rb.send().await?;
        let status = resp.status().as_u16();
        // Headers arrived, so a broken body still counts as an HTTP failure.
        let body = resp
            .text()
            .await
            .map_err(|_| ChatError::Status { status, detail: None })?;

        tracing::debug!(
            name: "chatbot.response",
            status,
            body_length = body.len(),
            "Chatbot responded"
        );

        if !(200..300).contains(&status) {
            let detail = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| match unwrap_body(v) {
                    Ok(Unwrapped::Payload(inner)) => error_detail(&inner),
                    Ok(Unwrapped::Failed { detail, .. }) => detail,
                    Err(_) => None,
                });
            return Err(ChatError::Status { status, detail });
        }

        decode_envelope(status, &body)
    }
}
