// ── Runtime connection configuration ──
//
// These types describe how to reach a panel. They carry credential data
// and connection tuning but never touch disk; the CLI builds a
// `ConsoleConfig` from its profile and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// Username/password for the panel's cookie session.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed panels).
    DangerAcceptInvalid,
}

/// Configuration for talking to a single panel.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// API root, including the panel's API prefix
    /// (e.g. `https://vpn.example.com/api`).
    pub url: Url,
    /// Log in during `connect()` when present. Without credentials the
    /// console relies on an existing session (or gets a 401 later).
    pub credentials: Option<Credentials>,
    /// Injected scope identity for the preference store. When `None` the
    /// panel id is read from `/service/config`.
    pub panel_id: Option<String>,
    pub tls: TlsVerification,
    pub timeout: Duration,
}

impl ConsoleConfig {
    /// Minimal config for the given API root.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            credentials: None,
            panel_id: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
        }
    }
}
