// Panel REST client
//
// Wraps `reqwest::Client` with panel URL construction and error-body
// resolution. Endpoint groups (interfaces, servers, clients, service)
// live in sibling files as inherent methods on `ApiClient`.

use std::sync::Arc;

use reqwest::cookie::{CookieStore, Jar};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// HTTP client for the WireGuard panel API.
///
/// `base_url` is the API root including the panel's API prefix
/// (e.g. `https://vpn.example.com/api`). The session lives in the cookie
/// jar and is sent with every request.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    cookie_jar: Option<Arc<Jar>>,
}

impl ApiClient {
    /// Create a client from a `TransportConfig`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let (http, jar) = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            cookie_jar: Some(jar),
        })
    }

    /// Create a client around a pre-built `reqwest::Client`.
    ///
    /// The caller is responsible for having attached a cookie store.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            cookie_jar: None,
        }
    }

    /// The API root URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The session `Cookie` header the jar would send, if any.
    pub fn cookie_header(&self) -> Option<String> {
        let jar = self.cookie_jar.as_ref()?;
        let cookies = jar.cookies(&self.base_url)?;
        cookies.to_str().ok().map(String::from)
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Append path segments to the API root, percent-encoding each one.
    ///
    /// `url(&["interfaces", id, "servers"])` → `{base}/interfaces/{id}/servers`
    pub(crate) fn url(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase)
            })?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// GET and decode a JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {url}");
        let resp = self.http.get(url).send().await?;
        handle_response(resp).await
    }

    /// GET and return the body as text (for `text/plain` endpoints).
    pub(crate) async fn get_text(&self, url: Url) -> Result<String, Error> {
        debug!("GET {url}");
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(resp.text().await?)
        } else {
            Err(parse_error(status, resp).await)
        }
    }

    /// GET with query parameters and decode a JSON body.
    pub(crate) async fn get_with_query<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        debug!("GET {url} (with query)");
        let resp = self.http.get(url).query(query).send().await?;
        handle_response(resp).await
    }

    /// POST a JSON body and decode the JSON answer.
    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        debug!("POST {url}");
        let resp = self.http.post(url).json(body).send().await?;
        handle_response(resp).await
    }

    /// POST a JSON body, ignoring whatever the panel answers on success.
    pub(crate) async fn post_no_response(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<(), Error> {
        debug!("POST {url}");
        let resp = self.http.post(url).json(body).send().await?;
        handle_empty(resp).await
    }

    /// PUT a JSON body and decode the JSON answer.
    pub(crate) async fn put<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        debug!("PUT {url}");
        let resp = self.http.put(url).json(body).send().await?;
        handle_response(resp).await
    }

    /// PUT a JSON body, ignoring the answer on success.
    pub(crate) async fn put_no_response(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<(), Error> {
        debug!("PUT {url}");
        let resp = self.http.put(url).json(body).send().await?;
        handle_empty(resp).await
    }

    /// DELETE, ignoring the answer on success.
    pub(crate) async fn delete(&self, url: Url) -> Result<(), Error> {
        debug!("DELETE {url}");
        let resp = self.http.delete(url).send().await?;
        handle_empty(resp).await
    }
}

// ── Response handling ────────────────────────────────────────────

async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();
    if !status.is_success() {
        return Err(parse_error(status, resp).await);
    }

    let body = resp.text().await?;
    trace!(len = body.len(), "response body received");
    serde_json::from_str(&body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body: body.clone(),
        }
    })
}

async fn handle_empty(resp: reqwest::Response) -> Result<(), Error> {
    let status = resp.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(parse_error(status, resp).await)
    }
}

async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
    let raw = resp.text().await.unwrap_or_default();

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Error::Authentication {
            message: error_message(status, &raw).0,
        };
    }

    let (message, data) = error_message(status, &raw);
    debug!(status = status.as_u16(), %message, "panel returned an error");
    Error::Api {
        status: status.as_u16(),
        message,
        data,
    }
}

/// Resolve a human message from an error body.
///
/// JSON bodies yield their `error` field, else `message`, else the
/// re-serialized body. Other non-empty bodies are used verbatim; an empty
/// body falls back to `HTTP error! status: N`.
fn error_message(status: reqwest::StatusCode, raw: &str) -> (String, Option<serde_json::Value>) {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(raw) {
        let message = ["error", "message"]
            .iter()
            .find_map(|field| {
                json.get(*field)
                    .and_then(serde_json::Value::as_str)
                    .filter(|m| !m.is_empty())
            })
            .map_or_else(|| json.to_string(), str::to_owned);
        return (message, Some(json));
    }

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        (format!("HTTP error! status: {}", status.as_u16()), None)
    } else {
        (trimmed.to_owned(), None)
    }
}
