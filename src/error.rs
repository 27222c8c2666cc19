//! Errors raised by the outbound chatbot call.

use thiserror::Error;

/// Failure of the single outbound call made per user message.
#[derive(Error, Debug)]
pub enum ChatError {
    /// No HTTP status is available: connect failure, timeout, reset.
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with an error status.
    #[error("chatbot returned status {status}")]
    Status {
        /// HTTP status code (or the `statusCode` of a wrapped response).
        status: u16,
        /// Error message embedded in the response body, if any.
        detail: Option<String>,
    },

    /// The response could not be decoded as an envelope.
    #[error("invalid chatbot response (status {status}): {source}")]
    Decode {
        status: u16,
        #[source]
        source: serde_json::Error,
    },
}

impl ChatError {
    /// HTTP status associated with this failure, if one was received.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(_) => None,
            Self::Status { status, .. } | Self::Decode { status, .. } => Some(*status),
        }
    }

    /// Embedded error message, if any.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// Text of the fallback bubble shown in place of a reply.
    #[must_use]
    pub fn fallback_text(&self) -> String {
        fallback_text(self.status(), self.detail())
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Status {
                status: status.as_u16(),
                detail: None,
            },
            None => Self::Transport(err.to_string()),
        }
    }
}

/// Map an HTTP status (or its absence) to a human readable message.
#[must_use]
pub fn fallback_text(status: Option<u16>, detail: Option<&str>) -> String {
    match status {
        None => "Network error: could not reach the chatbot. Check your connection and try again."
            .to_string(),
        Some(403) => "Access denied (403). The chatbot API key or CORS configuration is not set up correctly."
            .to_string(),
        Some(502) => "Bad gateway (502). The chatbot integration returned an invalid response."
            .to_string(),
        Some(status) if status >= 500 => match detail {
            Some(detail) => format!("Server error ({status}): {detail}"),
            None => format!("Server error ({status}). Please try again later."),
        },
        Some(status) => format!("Request failed ({status}). Please try again."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_status_mentions_network() {
        let err = ChatError::Transport("connection refused".to_string());
        assert!(err.fallback_text().contains("Network"));
    }

    #[test]
    fn test_403_and_502_are_named() {
        assert!(fallback_text(Some(403), None).contains("403"));
        assert!(fallback_text(Some(502), Some("ignored")).contains("502"));
    }

    #[test]
    fn test_server_error_carries_detail() {
        let err = ChatError::Status {
            status: 500,
            detail: Some("lex unavailable".to_string()),
        };
        let text = err.fallback_text();
        assert!(text.contains("500"));
        assert!(text.contains("lex unavailable"));

        assert!(!fallback_text(Some(503), None).contains(':'));
    }

    #[test]
    fn test_other_status_is_generic() {
        let text = fallback_text(Some(400), Some("Missing messages[]"));
        assert_eq!(text, "Request failed (400). Please try again.");
    }

    #[test]
    fn test_decode_failure_uses_its_status() {
        let source = serde_json::from_str::<serde_json::Value>("nope").unwrap_err();
        let err = ChatError::Decode {
            status: 200,
            source,
        };
        assert_eq!(err.status(), Some(200));
        assert!(err.fallback_text().starts_with("Request failed (200)"));
    }
}
