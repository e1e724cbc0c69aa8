//! Login API.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    client::{AdminClientInner, AuthInfo},
    error::{Error, Result},
    models::Account,
};

/// API for administrator login.
pub struct AuthApi {
    client: Arc<AdminClientInner>,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: Option<String>,
    user: Option<Account>,
}

/// Result of a successful admin login.
#[derive(Debug, Clone)]
pub struct LoginResult {
    /// Bearer token for subsequent requests.
    pub token: String,
    /// The logged-in admin account.
    pub account: Account,
}

impl LoginResult {
    /// Credentials to build an authenticated client with.
    pub fn auth_info(&self) -> AuthInfo {
        AuthInfo::new(self.token.clone(), self.account.id.clone())
    }
}

impl AuthApi {
    pub(crate) fn new(client: Arc<AdminClientInner>) -> Self {
        Self { client }
    }

    /// Log in with username and password.
    ///
    /// Accounts without the admin role are rejected with
    /// [`Error::AccessDenied`]; their token is discarded.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResult> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(Error::InvalidArgument(
                "Username and password are required".into(),
            ));
        }

        let response: LoginResponse = self
            .client
            .post_json("auth/login", &LoginRequest { username, password })
            .await?;

        parse_login(response)
    }
}

fn parse_login(response: LoginResponse) -> Result<LoginResult> {
    let token = response
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::missing("token"))?;
    let account = response.user.ok_or_else(|| Error::missing("user"))?;

    if !account.is_admin() {
        log::warn!("login rejected for non-admin account {}", account.id);
        return Err(Error::AccessDenied(
            "This login is for administrators only".into(),
        ));
    }

    Ok(LoginResult { token, account })
}
