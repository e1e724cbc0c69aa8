//! Recharge history and moderation API.

use reqwest::Method;
use serde::Serialize;
use std::sync::Arc;

use crate::{
    client::AdminClientInner,
    error::{Error, Result},
    models::{RechargeId, RechargeRecord, RechargeRequest, UserId},
};

/// API for recharge operations.
pub struct RechargeApi {
    client: Arc<AdminClientInner>,
}

#[derive(Serialize)]
struct ReviewNotes<'a> {
    admin_notes: Option<&'a str>,
}

impl RechargeApi {
    pub(crate) fn new(client: Arc<AdminClientInner>) -> Self {
        Self { client }
    }

    /// Recharge history of one user.
    pub async fn history(&self, user_id: impl Into<UserId>) -> Result<Vec<RechargeRecord>> {
        let user_id = user_id.into();
        let records: Option<Vec<RechargeRecord>> = self
            .client
            .get_authed(&format!("recharge/history/{}", user_id), &[])
            .await?;
        Ok(records.unwrap_or_default())
    }

    /// Recharge requests waiting for review.
    pub async fn pending(&self) -> Result<Vec<RechargeRequest>> {
        let requests: Option<Vec<RechargeRequest>> = self
            .client
            .get_authed("recharge/admin/pending", &[])
            .await?;
        Ok(requests.unwrap_or_default())
    }

    /// Approve a request. Notes are optional.
    pub async fn approve(&self, id: impl Into<RechargeId>, notes: Option<&str>) -> Result<()> {
        let id = id.into();
        let notes = notes.map(str::trim).filter(|n| !n.is_empty());
        self.client
            .send_authed(
                Method::PUT,
                &format!("recharge/admin/approve/{}", id),
                Some(&ReviewNotes { admin_notes: notes }),
            )
            .await
    }

    /// Reject a request. Notes are required.
    pub async fn reject(&self, id: impl Into<RechargeId>, notes: &str) -> Result<()> {
        let id = id.into();
        let notes = notes.trim();
        if notes.is_empty() {
            return Err(Error::InvalidArgument(
                "Rejection notes are required".into(),
            ));
        }

        self.client
            .send_authed(
                Method::PUT,
                &format!("recharge/admin/reject/{}", id),
                Some(&ReviewNotes {
                    admin_notes: Some(notes),
                }),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AdminClient;

    #[tokio::test]
    async fn test_reject_requires_notes() {
        let client = AdminClient::builder().auth("t", 1).build().unwrap();
        let err = client.recharges().reject(5, "   ").await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_review_notes_shape() {
        let json = serde_json::to_value(ReviewNotes { admin_notes: None }).unwrap();
        assert_eq!(json, serde_json::json!({"admin_notes": null}));
    }
}
