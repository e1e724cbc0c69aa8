//! User directory API.

use futures::future::try_join_all;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    client::AdminClientInner,
    error::{Error, Result},
    models::{User, UserId},
};

/// Default number of users per page.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// API for user directory operations.
pub struct UserApi {
    client: Arc<AdminClientInner>,
}

impl UserApi {
    pub(crate) fn new(client: Arc<AdminClientInner>) -> Self {
        Self { client }
    }

    /// List users, optionally filtered.
    pub fn list(&self) -> UserListBuilder {
        UserListBuilder {
            client: self.client.clone(),
            filters: UserFilters::default(),
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }

    /// Set the daily order quota of several users at once.
    ///
    /// Requests run concurrently; the first failure is returned.
    pub async fn set_daily_orders(&self, user_ids: &[UserId], orders: u32) -> Result<()> {
        if user_ids.is_empty() {
            return Err(Error::InvalidArgument("No users selected".into()));
        }

        let body = serde_json::json!({ "daily_orders": orders });
        let requests = user_ids.iter().map(|id| {
            let path = format!("admin/users/{}", id);
            let body = &body;
            async move { self.client.send_authed(Method::PUT, &path, Some(body)).await }
        });
        try_join_all(requests).await?;
        Ok(())
    }

    /// Edit a user's profile.
    pub fn update_profile(&self, user_id: impl Into<UserId>) -> ProfileUpdateBuilder {
        ProfileUpdateBuilder {
            client: self.client.clone(),
            user_id: user_id.into(),
            update: ProfileUpdate::default(),
        }
    }

    /// Delete a user.
    pub async fn delete(&self, user_id: impl Into<UserId>) -> Result<()> {
        let user_id = user_id.into();
        self.client
            .send_authed::<()>(Method::DELETE, &format!("admin/users/{}", user_id), None)
            .await
    }

    /// Delete several users at once.
    ///
    /// Requests run concurrently; the first failure is returned.
    pub async fn delete_many(&self, user_ids: &[UserId]) -> Result<()> {
        if user_ids.is_empty() {
            return Err(Error::InvalidArgument("No users selected".into()));
        }

        try_join_all(user_ids.iter().map(|id| self.delete(id))).await?;
        Ok(())
    }
}

/// Search filters for the user list. Empty filters are not sent.
#[derive(Debug, Clone, Default)]
pub struct UserFilters {
    pub username: String,
    pub phone: String,
    /// Invitation code.
    pub code: String,
    pub wallet: String,
}

/// Builder for user list requests.
pub struct UserListBuilder {
    client: Arc<AdminClientInner>,
    filters: UserFilters,
    page: u32,
    limit: u32,
}

impl UserListBuilder {
    /// Replace all filters at once.
    pub fn filters(mut self, filters: UserFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Set the page number (1-based).
    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    /// Set the page size.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit.max(1);
        self
    }

    /// Execute the request.
    pub async fn send(self) -> Result<UserListResult> {
        let page = self.page.to_string();
        let limit = self.limit.to_string();

        let response: UserListResponse = self
            .client
            .get_authed(
                "admin/users",
                &[
                    ("username", self.filters.username.as_str()),
                    ("phone", self.filters.phone.as_str()),
                    ("code", self.filters.code.as_str()),
                    ("wallet", self.filters.wallet.as_str()),
                    ("page", page.as_str()),
                    ("limit", limit.as_str()),
                ],
            )
            .await?;

        Ok(build_list_result(response, self.page, self.limit))
    }
}

#[derive(Deserialize)]
struct UserListResponse {
    #[serde(default)]
    users: Vec<User>,
    #[serde(default, rename = "totalUsers")]
    total_users: Option<u64>,
}

/// Result of a user list request.
#[derive(Debug, Clone, Default)]
pub struct UserListResult {
    /// Users on this page, newest id first.
    pub users: Vec<User>,
    /// Total matching users.
    pub total_users: u64,
    /// Current page.
    pub page: u32,
    /// Total pages.
    pub total_pages: u32,
}

fn build_list_result(response: UserListResponse, page: u32, limit: u32) -> UserListResult {
    let mut users = response.users;
    users.sort_by(|a, b| compare_ids_desc(&a.id, &b.id));

    let total_users = response.total_users.unwrap_or(users.len() as u64);
    let total_pages = total_users.div_ceil(u64::from(limit)).max(1) as u32;

    UserListResult {
        users,
        total_users,
        page,
        total_pages,
    }
}

/// Numeric ids sort numerically, anything else lexically.
fn compare_ids_desc(a: &UserId, b: &UserId) -> std::cmp::Ordering {
    match (a.as_str().parse::<i64>(), b.as_str().parse::<i64>()) {
        (Ok(x), Ok(y)) => y.cmp(&x),
        _ => b.as_str().cmp(a.as_str()),
    }
}

#[derive(Debug, Clone, Default, Serialize)]
struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    withdrawal_wallet_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    wallet_balance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    new_password: Option<String>,
}

/// Builder for profile updates. Only the fields that were set are sent.
pub struct ProfileUpdateBuilder {
    client: Arc<AdminClientInner>,
    user_id: UserId,
    update: ProfileUpdate,
}

impl ProfileUpdateBuilder {
    /// Set the username.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.update.username = Some(username.into());
        self
    }

    /// Set the phone number.
    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.update.phone = Some(phone.into());
        self
    }

    /// Set the withdrawal wallet address.
    pub fn withdrawal_wallet_address(mut self, address: impl Into<String>) -> Self {
        self.update.withdrawal_wallet_address = Some(address.into());
        self
    }

    /// Set the wallet balance. The value is rounded to two decimals and sent
    /// as is; the backend owns any balance bookkeeping.
    pub fn wallet_balance(mut self, balance: f64) -> Self {
        self.update.wallet_balance = Some((balance * 100.0).round() / 100.0);
        self
    }

    /// Set a new password. Empty passwords are ignored.
    pub fn new_password(mut self, password: impl Into<String>) -> Self {
        let password = password.into();
        self.update.new_password = (!password.is_empty()).then_some(password);
        self
    }

    /// Execute the request.
    pub async fn send(self) -> Result<()> {
        if let Some(balance) = self.update.wallet_balance {
            if !balance.is_finite() || balance < 0.0 {
                return Err(Error::InvalidArgument(format!(
                    "Invalid wallet balance: {}",
                    balance
                )));
            }
        }

        self.client
            .send_authed(
                Method::PUT,
                &format!("admin/users/{}/profile", self.user_id),
                Some(&self.update),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_bulk_operations_need_users() {
        let client = crate::AdminClient::builder().auth("t", 1).build().unwrap();

        let err = client.users().delete_many(&[]).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        let err = client.users().set_daily_orders(&[], 5).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_list_result_sorted_and_paged() {
        let response: UserListResponse = serde_json::from_str(
            r#"{"users":[{"id":3},{"id":12},{"id":7}],"totalUsers":21}"#,
        )
        .unwrap();

        let result = build_list_result(response, 2, 10);
        let ids: Vec<&str> = result.users.iter().map(|u| u.id.as_str()).collect();

        assert_eq!(ids, vec!["12", "7", "3"]);
        assert_eq!(result.total_pages, 3);
        assert_eq!(result.page, 2);
    }

    #[test]
    fn test_empty_list_has_one_page() {
        let response: UserListResponse = serde_json::from_str(r#"{"users":[]}"#).unwrap();
        let result = build_list_result(response, 1, 10);
        assert_eq!(result.total_users, 0);
        assert_eq!(result.total_pages, 1);
    }

    #[test]
    fn test_profile_update_only_sends_set_fields() {
        let update = ProfileUpdate {
            phone: Some("555".into()),
            wallet_balance: Some(12.5),
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({"phone": "555", "wallet_balance": 12.5})
        );
    }
}
