use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Maximum number of body bytes kept on a [`RastroError::Remote`].
pub const REMOTE_BODY_LIMIT: usize = 512;

pub type Result<T> = std::result::Result<T, RastroError>;

/// Errors returned by the tracking client and the batch reader.
#[derive(Debug, Error)]
pub enum RastroError {
    /// The request could not be assembled (bad URL, missing token, client build failure).
    #[error("invalid request configuration: {0}")]
    Config(String),

    /// The request never produced an HTTP response, or the body could not be read.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a status other than the one the operation expects.
    #[error("{operation} failed with status {status}")]
    Remote {
        operation: &'static str,
        status: StatusCode,
        body: String,
    },

    /// The expected status came back but the body is not the expected JSON.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A batch file line does not look like a tracking code.
    #[error("line {line}: {code}: tracking code does not match the expected pattern")]
    Validation { code: String, line: usize },

    /// A batch file could not be read from disk.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RastroError {
    pub(crate) fn remote(operation: &'static str, status: StatusCode, body: &str) -> Self {
        RastroError::Remote {
            operation,
            status,
            body: truncate(body, REMOTE_BODY_LIMIT).to_string(),
        }
    }

    /// HTTP status of a [`RastroError::Remote`], `None` for every other kind.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            RastroError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn truncate(body: &str, limit: usize) -> &str {
    if body.len() <= limit {
        return body;
    }
    let mut end = limit;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_body_is_truncated() {
        let body = "x".repeat(REMOTE_BODY_LIMIT * 2);
        let err = RastroError::remote("tracking", StatusCode::BAD_GATEWAY, &body);
        match err {
            RastroError::Remote { body, .. } => assert_eq!(body.len(), REMOTE_BODY_LIMIT),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let body = format!("{}ção", "a".repeat(REMOTE_BODY_LIMIT - 1));
        let cut = truncate(&body, REMOTE_BODY_LIMIT);
        assert_eq!(cut.len(), REMOTE_BODY_LIMIT - 1);
    }

    #[test]
    fn remote_display_carries_status_line() {
        let err = RastroError::remote("tracking", StatusCode::NOT_FOUND, "");
        assert_eq!(err.to_string(), "tracking failed with status 404 Not Found");
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn validation_names_offending_code() {
        let err = RastroError::Validation {
            code: "invalid".to_string(),
            line: 2,
        };
        assert!(err.to_string().contains("invalid"));
        assert!(err.status().is_none());
    }
}
