//! Recharge handlers.

use anyhow::Result;
use colored::Colorize;
use radmin::AdminClient;
use rust_i18n::t;
use serde::Serialize;

use crate::output::{format_amount, format_time, or_dash, PlainPrint, TableRow};

/// One past recharge of a user.
#[derive(Debug, Clone, Serialize)]
pub struct RechargeInfo {
    pub id: String,
    pub date: String,
    pub amount: Option<f64>,
    pub status: String,
}

impl From<&radmin::RechargeRecord> for RechargeInfo {
    fn from(r: &radmin::RechargeRecord) -> Self {
        Self {
            id: r.id.to_string(),
            date: format_time(r.created_at),
            amount: r.amount,
            status: r.status.clone(),
        }
    }
}

fn colored_status(status: &str) -> String {
    match status {
        "approved" | "completed" => status.green().to_string(),
        "rejected" | "failed" => status.red().to_string(),
        _ => status.yellow().to_string(),
    }
}

impl TableRow for RechargeInfo {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Date", "Amount", "Status"]
    }
    fn row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.date.clone(),
            format_amount(self.amount),
            self.status.clone(),
        ]
    }
}

impl PlainPrint for RechargeInfo {
    fn plain_print(&self) {
        println!(
            "{} {} {} {}",
            format!("[{}]", self.id).cyan(),
            self.date.dimmed(),
            format_amount(self.amount).bold(),
            colored_status(&self.status)
        );
    }
}

/// A recharge request waiting for review.
#[derive(Debug, Clone, Serialize)]
pub struct PendingInfo {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub phone: String,
    pub amount: Option<f64>,
    pub currency: String,
    pub receipt_image_url: Option<String>,
    pub whatsapp_number: Option<String>,
    pub date: String,
}

impl From<&radmin::RechargeRequest> for PendingInfo {
    fn from(r: &radmin::RechargeRequest) -> Self {
        Self {
            id: r.id.to_string(),
            user_id: r.user_id.to_string(),
            username: r.username.clone(),
            phone: r.phone.clone(),
            amount: r.amount,
            currency: r.currency.clone(),
            receipt_image_url: r.receipt_image_url.clone(),
            whatsapp_number: r.whatsapp_number.clone(),
            date: format_time(r.created_at),
        }
    }
}

impl TableRow for PendingInfo {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "User", "Phone", "Amount", "WhatsApp", "Requested", "Receipt"]
    }
    fn row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            format!("{} ({})", self.username, self.user_id),
            self.phone.clone(),
            format!("{} {}", format_amount(self.amount), self.currency),
            or_dash(self.whatsapp_number.as_deref()),
            self.date.clone(),
            or_dash(self.receipt_image_url.as_deref()),
        ]
    }
}

impl PlainPrint for PendingInfo {
    fn plain_print(&self) {
        println!(
            "{} {} {} | {} {}",
            format!("[{}]", self.id).cyan(),
            self.username.bold(),
            t!("uid_label", id = &self.user_id).to_string().dimmed(),
            format_amount(self.amount).bold(),
            self.currency
        );
        println!(
            "   {} | {} | {}",
            self.phone,
            t!("whatsapp_label", number = or_dash(self.whatsapp_number.as_deref())),
            self.date.dimmed()
        );
        if let Some(url) = &self.receipt_image_url {
            println!("   {}", t!("receipt_label", url = url).to_string().dimmed());
        }
    }
}

/// Recharge history of one user.
pub async fn history(client: &AdminClient, user_id: &str) -> Result<Vec<RechargeInfo>> {
    let records = client.recharges().history(user_id).await?;
    Ok(records.iter().map(RechargeInfo::from).collect())
}

/// Recharge requests waiting for review.
pub async fn pending(client: &AdminClient) -> Result<Vec<PendingInfo>> {
    let requests = client.recharges().pending().await?;
    Ok(requests.iter().map(PendingInfo::from).collect())
}

/// Approve a recharge request.
pub async fn approve(client: &AdminClient, id: &str, notes: Option<&str>) -> Result<()> {
    client.recharges().approve(id, notes).await?;
    Ok(())
}

/// Reject a recharge request. Notes are required.
pub async fn reject(client: &AdminClient, id: &str, notes: &str) -> Result<()> {
    client.recharges().reject(id, notes).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_pending_row() {
        let request: radmin::RechargeRequest = serde_json::from_value(serde_json::json!({
            "id": 3,
            "user_id": 7,
            "username": "alice",
            "phone": "555-0100",
            "amount": "100",
            "currency": "USDT"
        }))
        .unwrap();
        let info = PendingInfo::from(&request);

        assert_eq!(info.row()[1], "alice (7)");
        assert_eq!(info.row()[3], "100.00 USDT");
        assert_eq!(info.row()[4], "-");
        assert_eq!(info.date, "-");
    }
}
