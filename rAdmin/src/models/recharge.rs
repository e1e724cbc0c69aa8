//! Recharge models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{wire, RechargeId, UserId};

/// A past recharge of one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RechargeRecord {
    /// Record ID.
    pub id: RechargeId,
    /// When the recharge was requested.
    #[serde(default, deserialize_with = "wire::timestamp_opt")]
    pub created_at: Option<DateTime<Utc>>,
    /// Amount, if the backend sent a parseable value.
    #[serde(default, deserialize_with = "wire::amount_opt")]
    pub amount: Option<f64>,
    /// Backend status string (`pending`, `approved`, `rejected`, ...).
    #[serde(default, deserialize_with = "wire::string_or_null")]
    pub status: String,
}

/// A recharge request waiting for admin review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RechargeRequest {
    /// Request ID.
    pub id: RechargeId,
    /// Requesting user.
    pub user_id: UserId,
    #[serde(default, deserialize_with = "wire::string_or_null")]
    pub username: String,
    #[serde(default, deserialize_with = "wire::string_or_null")]
    pub phone: String,
    #[serde(default, deserialize_with = "wire::amount_opt")]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "wire::string_or_null")]
    pub currency: String,
    /// Uploaded payment receipt.
    #[serde(default)]
    pub receipt_image_url: Option<String>,
    #[serde(default)]
    pub whatsapp_number: Option<String>,
    #[serde(default, deserialize_with = "wire::timestamp_opt")]
    pub created_at: Option<DateTime<Utc>>,
}
