//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use wgpanel_config::ConfigError;
use wgpanel_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to panel at {url}")]
    #[diagnostic(
        code(wgpanel::connection_failed),
        help(
            "Check that the panel is running and the URL includes its API prefix.\n\
             {reason}\n\
             Self-signed certificate? Try --insecure (-k)."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(wgpanel::auth_failed),
        help(
            "Check the username and password of the profile.\n\
             Run: wgpanel config init"
        )
    )]
    AuthFailed { message: String },

    #[error("No password configured for profile '{profile}'")]
    #[diagnostic(
        code(wgpanel::no_credentials),
        help(
            "Configure credentials with: wgpanel config init\n\
             Or set the WGPANEL_PASSWORD environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(wgpanel::not_found),
        help("Run: wgpanel {list_command} to see what exists")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("No interface selected")]
    #[diagnostic(
        code(wgpanel::no_interface),
        help(
            "Pass --interface (-i), or pick one with: wgpanel interfaces select <id>"
        )
    )]
    NoInterface,

    // ── API ──────────────────────────────────────────────────────────
    #[error("Panel rejected the request: {message}")]
    #[diagnostic(code(wgpanel::api_error))]
    ApiError { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(wgpanel::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(wgpanel::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: wgpanel config init, or pass --url"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(wgpanel::config))]
    Config(ConfigError),

    #[error("Preference storage failed: {message}")]
    #[diagnostic(code(wgpanel::preferences))]
    Preferences { message: String },

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(wgpanel::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(wgpanel::json), help("Check the JSON contents and try again."))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } | Self::NoInterface => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }

    /// Fold an API failure, naming the offending field when the panel
    /// reports one (`error_params`).
    pub fn from_api(err: &wgpanel_api::Error) -> Self {
        match err.invalid_param() {
            Some(field) => Self::Validation {
                field: field.to_owned(),
                reason: err.failure().message,
            },
            None => Self::ApiError {
                message: err.failure().message,
            },
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => {
                CliError::ConnectionFailed { url, reason }
            }

            CoreError::AuthenticationRequired { message } => CliError::AuthFailed { message },

            CoreError::NotFound {
                entity_type,
                identifier,
            } => CliError::NotFound {
                list_command: format!("{}s list", entity_type.to_lowercase()),
                resource_type: entity_type,
                identifier,
            },

            CoreError::Validation { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            err @ (CoreError::ReadFailed { .. } | CoreError::MutationFailed { .. }) => {
                match err
                    .data()
                    .and_then(|d| d.get("error_params"))
                    .and_then(serde_json::Value::as_str)
                {
                    Some(field) => CliError::Validation {
                        field: field.to_owned(),
                        reason: err.to_string(),
                    },
                    None => CliError::ApiError {
                        message: err.to_string(),
                    },
                }
            }

            CoreError::Persistence { message } => CliError::Preferences { message },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config(other),
        }
    }
}

impl From<wgpanel_api::Error> for CliError {
    fn from(err: wgpanel_api::Error) -> Self {
        if err.invalid_param().is_some() {
            return Self::from_api(&err);
        }
        CoreError::from(err).into()
    }
}
