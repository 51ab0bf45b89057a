use thiserror::Error;

/// Phrases the backend emits while a container has not started serving logs
/// yet. A 400 carrying one of these is retryable; everything else is not.
const STARTING_PHRASES: &[&str] = &[
    "ContainerCreating",
    "container is starting",
    "still starting",
    "is not ready",
    "PodInitializing",
];

/// Errors from the platform API, classified for the retry policy
#[derive(Debug, Error)]
pub enum ApiError {
    /// Expired or invalid credential. Terminal; the user must re-authenticate.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The deployment or pod no longer exists or is inaccessible. Terminal.
    #[error("not found: {0}")]
    NotFound(String),

    /// The container is still starting up. Retryable with a fixed delay.
    #[error("container starting: {0}")]
    Starting(String),

    /// Transport-level failure (connect, timeout, TLS)
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Any other non-success response
    #[error("{0}")]
    Api(String),
}

impl ApiError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Starting(_))
    }
}

/// Classify a non-success response into the error taxonomy.
///
/// 401 is always an auth failure, 404 a missing resource. A 400 whose body
/// mentions a known starting-up phrase is the transient "container still
/// starting" condition.
pub fn classify_status(status: u16, body: &str) -> ApiError {
    match status {
        401 => ApiError::Auth(short_body(body, "invalid or expired token")),
        404 => ApiError::NotFound(short_body(body, "deployment or pod not found")),
        400 if STARTING_PHRASES.iter().any(|p| body.contains(p)) => {
            ApiError::Starting(short_body(body, "container is starting"))
        }
        _ => ApiError::Api(format!("HTTP {}: {}", status, short_body(body, "request failed"))),
    }
}

fn short_body(body: &str, fallback: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return fallback.to_string();
    }
    // Error bodies are JSON like {"error": "..."} or plain text; keep the
    // message field when present, otherwise the first line.
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        for key in ["error", "message", "detail"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str()) {
                return msg.to_string();
            }
        }
    }
    trimmed.lines().next().unwrap_or(fallback).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_auth() {
        let err = classify_status(401, r#"{"error": "token expired"}"#);
        assert!(matches!(err, ApiError::Auth(msg) if msg == "token expired"));
    }

    #[test]
    fn test_classify_not_found() {
        let err = classify_status(404, "");
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn test_classify_starting_phrase() {
        let err = classify_status(400, r#"{"error": "Pod web-0 is not ready (phase: Pending)"}"#);
        assert!(err.is_retryable());
        assert!(matches!(err, ApiError::Starting(_)));

        let err = classify_status(400, r#"{"error": "ContainerCreating"}"#);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_classify_generic_400_is_terminal() {
        let err = classify_status(400, r#"{"error": "invalid tail parameter"}"#);
        assert!(!err.is_retryable());
        assert!(matches!(err, ApiError::Api(_)));
    }

    #[test]
    fn test_classify_server_error() {
        let err = classify_status(500, "internal error");
        assert!(matches!(err, ApiError::Api(msg) if msg.contains("HTTP 500")));
    }
}
