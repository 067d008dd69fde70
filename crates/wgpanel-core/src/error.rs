// ── Core error types ──
//
// User-facing errors from wgpanel-core. Callers never see reqwest or
// JSON parse failures directly; `From<wgpanel_api::Error>` folds them
// into read-side variants, and the console re-tags mutation paths.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to panel at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    /// The panel answered 401; the caller should prompt for a login.
    #[error("Authentication required: {message}")]
    AuthenticationRequired { message: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    /// A listing or detail fetch failed. The affected view should be
    /// reset to empty rather than keep stale rows.
    #[error("{message}")]
    ReadFailed {
        message: String,
        data: Option<serde_json::Value>,
    },

    // ── Operation errors ─────────────────────────────────────────────
    /// A create/update/delete/toggle was rejected. Local state is unchanged.
    #[error("{message}")]
    MutationFailed {
        message: String,
        data: Option<serde_json::Value>,
    },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    // ── Local state ──────────────────────────────────────────────────
    #[error("Preference storage error: {message}")]
    Persistence { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Machine-readable body that came with the failure, if any.
    pub fn data(&self) -> Option<&serde_json::Value> {
        match self {
            Self::ReadFailed { data, .. } | Self::MutationFailed { data, .. } => data.as_ref(),
            _ => None,
        }
    }

    /// Re-tag a read-side failure as a mutation failure.
    ///
    /// Auth and connection errors keep their identity so the caller can
    /// still prompt for a login or report the network problem.
    pub(crate) fn into_mutation(self) -> Self {
        match self {
            Self::ReadFailed { message, data } => Self::MutationFailed { message, data },
            Self::NotFound {
                entity_type,
                identifier,
            } => Self::MutationFailed {
                message: format!("{entity_type} not found: {identifier}"),
                data: None,
            },
            other => other,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<wgpanel_api::Error> for CoreError {
    fn from(err: wgpanel_api::Error) -> Self {
        match err {
            wgpanel_api::Error::Authentication { message } => {
                CoreError::AuthenticationRequired { message }
            }
            wgpanel_api::Error::Transport(ref e) if e.is_connect() || e.is_timeout() => {
                CoreError::ConnectionFailed {
                    url: e
                        .url()
                        .map_or_else(|| "<unknown>".into(), ToString::to_string),
                    reason: e.to_string(),
                }
            }
            wgpanel_api::Error::Transport(e) => CoreError::ReadFailed {
                message: e.to_string(),
                data: None,
            },
            wgpanel_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            wgpanel_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            wgpanel_api::Error::Api {
                status: 404,
                message,
                ..
            } => CoreError::NotFound {
                entity_type: "Resource".into(),
                identifier: message,
            },
            wgpanel_api::Error::Api { message, data, .. } => {
                CoreError::ReadFailed { message, data }
            }
            wgpanel_api::Error::Deserialization { message, body: _ } => CoreError::ReadFailed {
                message: format!("Unexpected response from panel: {message}"),
                data: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn api_error_keeps_structured_data() {
        let err: CoreError = wgpanel_api::Error::Api {
            status: 400,
            message: "invalid offset".into(),
            data: Some(json!({"error": "invalid offset", "error_params": "offset"})),
        }
        .into();
        let err = err.into_mutation();
        assert!(matches!(err, CoreError::MutationFailed { .. }));
        assert_eq!(err.to_string(), "invalid offset");
        assert_eq!(err.data().and_then(|d| d.get("error_params")), Some(&json!("offset")));
    }

    #[test]
    fn auth_survives_mutation_retag() {
        let err: CoreError = wgpanel_api::Error::Authentication {
            message: "expired".into(),
        }
        .into();
        assert!(matches!(
            err.into_mutation(),
            CoreError::AuthenticationRequired { .. }
        ));
    }
}
