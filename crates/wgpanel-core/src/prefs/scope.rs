// ── Scope identity resolution ──
//
// The preference store namespaces every key by the panel id. Where that
// id comes from is injected: a fixed value from the profile, or the
// panel's own `/service/config`.

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use thiserror::Error;
use wgpanel_api::ApiClient;

/// The scope identity could not be determined.
#[derive(Debug, Error)]
#[error("cannot resolve panel id: {message}")]
pub struct ScopeError {
    pub message: String,
}

impl From<wgpanel_api::Error> for ScopeError {
    fn from(err: wgpanel_api::Error) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

/// Source of the namespace for persisted preferences.
///
/// `Ok(None)` means the source answered but carries no identity.
pub trait ScopeResolver: Send + Sync {
    fn resolve(&self) -> BoxFuture<'_, Result<Option<String>, ScopeError>>;
}

/// Identity injected at construction.
#[derive(Debug, Clone)]
pub struct FixedScope(pub Option<String>);

impl FixedScope {
    pub fn new(scope: impl Into<String>) -> Self {
        Self(Some(scope.into()))
    }
}

impl ScopeResolver for FixedScope {
    fn resolve(&self) -> BoxFuture<'_, Result<Option<String>, ScopeError>> {
        let scope = self.0.clone();
        async move { Ok(scope) }.boxed()
    }
}

impl ScopeResolver for ApiClient {
    fn resolve(&self) -> BoxFuture<'_, Result<Option<String>, ScopeError>> {
        async move {
            let config = self.service_config().await?;
            Ok(config.panel_id.filter(|id| !id.is_empty()))
        }
        .boxed()
    }
}
