//! HTTP client configuration and request execution.

use crate::error::{Error, Result};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use url::Url;

/// Default admin API base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";

/// Default user agent.
pub const DEFAULT_USER_AGENT: &str = concat!("radmin/", env!("CARGO_PKG_VERSION"));

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Base URL for API requests.
    pub base_url: String,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Read timeout.
    pub read_timeout: Duration,
    /// Custom user agent.
    pub custom_user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(20),
            custom_user_agent: None,
        }
    }
}

impl HttpConfig {
    /// User agent sent with every request.
    pub fn user_agent(&self) -> &str {
        self.custom_user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }

    /// Resolve an API path (`chat/messages/7`) against the base URL.
    ///
    /// The base URL keeps its own path (`/api`) whether or not it ends with a
    /// slash.
    pub fn resolve_url(&self, api: &str) -> Result<Url> {
        if api.starts_with("http://") || api.starts_with("https://") {
            return Url::parse(api).map_err(Error::Url);
        }

        let base = format!("{}/", self.base_url.trim_end_matches('/'));
        Url::parse(&base)
            .and_then(|b| b.join(api.trim_start_matches('/')))
            .map_err(Error::Url)
    }
}

/// Build a reqwest client with the given configuration.
pub fn build_client(config: &HttpConfig) -> Result<Client> {
    Client::builder()
        .connect_timeout(config.connect_timeout)
        .read_timeout(config.read_timeout)
        .user_agent(config.user_agent())
        .gzip(true)
        .build()
        .map_err(Error::Network)
}

/// HTTP request executor.
pub struct HttpExecutor<'a> {
    client: &'a Client,
    config: &'a HttpConfig,
}

impl<'a> HttpExecutor<'a> {
    /// Create a new executor.
    pub fn new(client: &'a Client, config: &'a HttpConfig) -> Self {
        Self { client, config }
    }

    fn build_request(&self, method: Method, url: Url, bearer: Option<&str>) -> RequestBuilder {
        let request = self.client.request(method, url);
        match bearer {
            Some(value) => request.header(reqwest::header::AUTHORIZATION, value),
            None => request,
        }
    }

    /// Execute a request with an optional JSON body and decode the JSON reply.
    pub async fn send_json<B, T>(
        &self,
        method: Method,
        api: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
        bearer: Option<&str>,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let text = self.send(method, api, query, body, bearer).await?;
        parse_json_response(&text)
    }

    /// Execute a request and return the raw response text.
    pub async fn send<B>(
        &self,
        method: Method,
        api: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
        bearer: Option<&str>,
    ) -> Result<String>
    where
        B: Serialize + ?Sized,
    {
        let url = self.config.resolve_url(api)?;
        log::debug!("{} {}", method, url);

        let query: Vec<(&str, &str)> = query
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .copied()
            .collect();

        let mut request = self.build_request(method, url, bearer).query(&query);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(Error::Network)?;
        handle_response(response).await
    }
}

/// Turn non-success statuses into errors, keeping the backend's message.
async fn handle_response(response: Response) -> Result<String> {
    let status = response.status();
    let text = response.text().await.map_err(Error::Network)?;

    if status.is_success() {
        return Ok(text);
    }

    let message = error_message(&text)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_owned());
    log::warn!("request failed with {}: {}", status, message);
    Err(Error::api(status.as_u16(), message))
}

/// Extract `{ "message": ... }` from an error body.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .or_else(|| value.get("error"))
        .and_then(|v| v.as_str())
        .map(str::to_owned)
}

/// Parse a JSON response body. Empty bodies decode as `null`.
fn parse_json_response<T: DeserializeOwned>(text: &str) -> Result<T> {
    let text = if text.trim().is_empty() { "null" } else { text };
    serde_json::from_str(text).map_err(Error::Json)
}
