//! Platform user and admin account models.

use serde::{Deserialize, Serialize};

use super::{wire, UserId};

/// A platform user as listed by the admin directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    /// User ID.
    pub id: UserId,
    /// Login name.
    #[serde(default, deserialize_with = "wire::string_or_null")]
    pub username: String,
    /// Phone number.
    #[serde(default, deserialize_with = "wire::string_or_null")]
    pub phone: String,
    /// Invitation code handed out by this user.
    #[serde(default)]
    pub invitation_code: Option<String>,
    /// Invitation code this user signed up with.
    #[serde(default)]
    pub invited_by: Option<String>,
    /// Daily order quota.
    #[serde(default)]
    pub daily_orders: Option<i64>,
    /// Orders completed today.
    #[serde(default)]
    pub completed_orders: Option<i64>,
    /// Orders still open today.
    #[serde(default)]
    pub uncompleted_orders: Option<i64>,
    /// Deposit wallet address assigned by the backend.
    #[serde(default, rename = "walletAddress")]
    pub wallet_address: Option<String>,
    /// Withdrawal wallet address.
    #[serde(default)]
    pub withdrawal_wallet_address: Option<String>,
    /// Wallet balance as reported by the backend.
    #[serde(default, deserialize_with = "wire::amount_opt")]
    pub wallet_balance: Option<f64>,
}

/// Role attached to a logged-in account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    Admin,
    User,
    #[serde(other)]
    Other,
}

/// The account returned by a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Account ID.
    pub id: UserId,
    /// Login name.
    #[serde(default, deserialize_with = "wire::string_or_null")]
    pub username: String,
    /// Account role.
    pub role: AccountRole,
}

impl Account {
    /// Whether this account may use the admin console.
    pub fn is_admin(&self) -> bool {
        self.role == AccountRole::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_from_backend_row() {
        let user: User = serde_json::from_str(
            r#"{"id": 12, "username": "alice", "phone": null, "invitation_code": "AB12",
                "daily_orders": 5, "walletAddress": "TXYZ", "wallet_balance": "25.50"}"#,
        )
        .unwrap();

        assert_eq!(user.id.as_str(), "12");
        assert_eq!(user.phone, "");
        assert_eq!(user.wallet_address.as_deref(), Some("TXYZ"));
        assert_eq!(user.wallet_balance, Some(25.5));
        assert_eq!(user.invited_by, None);
    }

    #[test]
    fn test_account_role() {
        let admin: Account =
            serde_json::from_str(r#"{"id": 1, "username": "root", "role": "admin"}"#).unwrap();
        let other: Account =
            serde_json::from_str(r#"{"id": 2, "username": "x", "role": "support"}"#).unwrap();

        assert!(admin.is_admin());
        assert_eq!(other.role, AccountRole::Other);
        assert!(!other.is_admin());
    }
}
