use thiserror::Error;

/// Top-level error type for the `wgpanel-api` crate.
///
/// Every non-2xx answer from the panel is folded into either
/// [`Authentication`](Self::Authentication) (HTTP 401) or [`Api`](Self::Api),
/// so callers only branch on "log in again" versus "show the message".
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The panel answered 401: the session cookie is missing or expired.
    #[error("Authentication required: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Panel API ───────────────────────────────────────────────────
    /// Non-2xx response other than 401.
    ///
    /// `message` is resolved from the body's `error` / `message` fields,
    /// the raw text, or the HTTP status, in that order. `data` keeps the
    /// full JSON body when there was one.
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        data: Option<serde_json::Value>,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

/// Normalized failure shape handed to presentation code.
///
/// Callers branch on either the human `message` or the machine fields in
/// `structured_data` (e.g. `error_params` from the offset validator).
#[derive(Debug, Clone, PartialEq)]
pub struct ApiFailure {
    pub message: String,
    pub structured_data: Option<serde_json::Value>,
}

impl Error {
    /// Returns `true` for the 401 "log in again" signal.
    pub fn is_auth_required(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if the panel answered 404.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Api { status: 404, .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// HTTP status of the failed response, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication { .. } => Some(401),
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Name of the offending request parameter reported by validation
    /// endpoints (`{"error": "...", "error_params": "offset"}`).
    pub fn invalid_param(&self) -> Option<&str> {
        match self {
            Self::Api {
                data: Some(data), ..
            } => data.get("error_params").and_then(serde_json::Value::as_str),
            _ => None,
        }
    }

    /// Collapse into the `{message, structured_data}` shape.
    pub fn failure(&self) -> ApiFailure {
        match self {
            Self::Api { message, data, .. } => ApiFailure {
                message: message.clone(),
                structured_data: data.clone(),
            },
            other => ApiFailure {
                message: other.to_string(),
                structured_data: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn invalid_param_reads_error_params() {
        let err = Error::Api {
            status: 400,
            message: "Invalid offset".into(),
            data: Some(json!({"error": "Invalid offset", "error_params": "offset"})),
        };
        assert_eq!(err.invalid_param(), Some("offset"));
        assert_eq!(err.failure().message, "Invalid offset");
    }

    #[test]
    fn failure_of_auth_error_has_no_data() {
        let err = Error::Authentication {
            message: "session expired".into(),
        };
        let failure = err.failure();
        assert!(failure.structured_data.is_none());
        assert!(failure.message.contains("session expired"));
        assert!(err.is_auth_required());
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn server_errors_are_transient() {
        let err = Error::Api {
            status: 503,
            message: "unavailable".into(),
            data: None,
        };
        assert!(err.is_transient());
        assert!(!err.is_not_found());
    }
}
