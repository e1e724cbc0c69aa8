//! HTTP client and configuration.

mod auth;
mod http;

pub use auth::AuthInfo;
pub use http::{HttpConfig, DEFAULT_BASE_URL};

use crate::api::{AuthApi, ChatApi, RechargeApi, UserApi};
use crate::error::{Error, Result};
use crate::realtime::{RealtimeConfig, SocketIoChannel};
use http::{build_client, HttpExecutor};
use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Builder for creating AdminClient.
pub struct AdminClientBuilder {
    auth: Option<AuthInfo>,
    http_config: HttpConfig,
    realtime_config: RealtimeConfig,
}

impl std::fmt::Debug for AdminClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminClientBuilder")
            .field("auth", &self.auth.as_ref().map(|a| &a.admin_id))
            .field("http_config", &self.http_config)
            .field("socket_url", &self.realtime_config.socket_url)
            .finish()
    }
}

impl Default for AdminClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AdminClientBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            auth: None,
            http_config: HttpConfig::default(),
            realtime_config: RealtimeConfig::default(),
        }
    }

    /// Set authentication.
    pub fn auth(mut self, token: impl Into<String>, admin_id: impl Into<crate::UserId>) -> Self {
        self.auth = Some(AuthInfo::new(token, admin_id));
        self
    }

    /// Set authentication from AuthInfo.
    pub fn with_auth(mut self, auth: AuthInfo) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Set API base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.http_config.base_url = url.into();
        self
    }

    /// Set realtime socket URL.
    pub fn socket_url(mut self, url: impl Into<String>) -> Self {
        self.realtime_config.socket_url = url.into();
        self
    }

    /// Set custom user agent.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.http_config.custom_user_agent = Some(ua.into());
        self
    }

    /// Set connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.http_config.connect_timeout = timeout;
        self
    }

    /// Set read timeout.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.http_config.read_timeout = timeout;
        self
    }

    /// Build AdminClient.
    pub fn build(self) -> Result<AdminClient> {
        let http_client = build_client(&self.http_config)?;

        Ok(AdminClient {
            inner: Arc::new(AdminClientInner {
                http: http_client,
                config: self.http_config,
                realtime: self.realtime_config,
                auth: self.auth,
            }),
        })
    }
}

/// Internal client state.
pub(crate) struct AdminClientInner {
    pub http: reqwest::Client,
    pub config: HttpConfig,
    pub realtime: RealtimeConfig,
    pub auth: Option<AuthInfo>,
}

impl AdminClientInner {
    /// Get usable auth info or error. Blank credentials count as none.
    pub fn require_auth(&self) -> Result<&AuthInfo> {
        self.auth
            .as_ref()
            .filter(|a| a.is_valid())
            .ok_or(Error::AuthRequired)
    }

    /// Create HTTP executor.
    pub fn executor(&self) -> HttpExecutor<'_> {
        HttpExecutor::new(&self.http, &self.config)
    }

    /// Execute an authenticated GET and decode the JSON reply.
    pub async fn get_authed<T: DeserializeOwned>(
        &self,
        api: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let bearer = self.require_auth()?.bearer();
        self.executor()
            .send_json::<(), T>(Method::GET, api, query, None, Some(bearer.as_str()))
            .await
    }

    /// Execute an authenticated request with a JSON body, discarding the reply.
    pub async fn send_authed<B: Serialize + ?Sized>(
        &self,
        method: Method,
        api: &str,
        body: Option<&B>,
    ) -> Result<()> {
        let bearer = self.require_auth()?.bearer();
        self.executor()
            .send(method, api, &[], body, Some(bearer.as_str()))
            .await?;
        Ok(())
    }

    /// Execute an unauthenticated POST and decode the JSON reply.
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        api: &str,
        body: &B,
    ) -> Result<T> {
        self.executor()
            .send_json(Method::POST, api, &[], Some(body), None)
            .await
    }
}

/// Client for the admin backend.
#[derive(Clone)]
pub struct AdminClient {
    pub(crate) inner: Arc<AdminClientInner>,
}

impl AdminClient {
    /// Create a new client builder.
    pub fn builder() -> AdminClientBuilder {
        AdminClientBuilder::new()
    }

    /// Get the login API.
    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.inner.clone())
    }

    /// Get the chat directory/history API.
    pub fn chat(&self) -> ChatApi {
        ChatApi::new(self.inner.clone())
    }

    /// Get the user directory API.
    pub fn users(&self) -> UserApi {
        UserApi::new(self.inner.clone())
    }

    /// Get the recharge API.
    pub fn recharges(&self) -> RechargeApi {
        RechargeApi::new(self.inner.clone())
    }

    /// Create a realtime channel for this client's socket URL and token.
    ///
    /// The channel is not connected yet; the caller owns it.
    pub fn realtime(&self) -> SocketIoChannel {
        let mut config = self.inner.realtime.clone();
        if config.token.is_none() {
            config.token = self.inner.auth.as_ref().map(|a| a.token.clone());
        }
        SocketIoChannel::new(config)
    }

    /// Check if the client is authenticated.
    pub fn is_authenticated(&self) -> bool {
        self.inner.require_auth().is_ok()
    }

    /// Get the current authentication info.
    pub fn auth_info(&self) -> Option<&AuthInfo> {
        self.inner.auth.as_ref()
    }

    /// Get the current admin ID if authenticated.
    pub fn current_admin_id(&self) -> Option<&crate::UserId> {
        self.inner.auth.as_ref().map(|a| &a.admin_id)
    }
}

impl std::fmt::Debug for AdminClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminClient")
            .field("authenticated", &self.is_authenticated())
            .field("base_url", &self.inner.config.base_url)
            .finish()
    }
}
