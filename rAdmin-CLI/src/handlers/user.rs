//! User handlers.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use futures::stream::{self, StreamExt};
use radmin::{api::UserFilters, AdminClient, UserId};
use rust_i18n::t;
use serde::Serialize;

use crate::output::{format_amount, or_dash, PlainPrint, TableRow};

/// User directory entry.
#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub id: String,
    pub username: String,
    pub phone: String,
    pub invitation_code: Option<String>,
    pub invited_by: Option<String>,
    pub daily_orders: Option<i64>,
    pub completed_orders: Option<i64>,
    pub uncompleted_orders: Option<i64>,
    pub wallet_address: Option<String>,
    pub withdrawal_wallet_address: Option<String>,
    pub wallet_balance: Option<f64>,
}

impl From<&radmin::User> for UserInfo {
    fn from(u: &radmin::User) -> Self {
        Self {
            id: u.id.to_string(),
            username: u.username.clone(),
            phone: u.phone.clone(),
            invitation_code: u.invitation_code.clone(),
            invited_by: u.invited_by.clone(),
            daily_orders: u.daily_orders,
            completed_orders: u.completed_orders,
            uncompleted_orders: u.uncompleted_orders,
            wallet_address: u.wallet_address.clone(),
            withdrawal_wallet_address: u.withdrawal_wallet_address.clone(),
            wallet_balance: u.wallet_balance,
        }
    }
}

fn count(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

impl TableRow for UserInfo {
    fn headers() -> Vec<&'static str> {
        vec![
            "ID", "Username", "Phone", "Code", "Invited By", "Daily", "Done", "Open", "Balance",
        ]
    }
    fn row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.username.clone(),
            self.phone.clone(),
            or_dash(self.invitation_code.as_deref()),
            or_dash(self.invited_by.as_deref()),
            count(self.daily_orders),
            count(self.completed_orders),
            count(self.uncompleted_orders),
            format_amount(self.wallet_balance),
        ]
    }
}

impl PlainPrint for UserInfo {
    fn plain_print(&self) {
        println!(
            "{} {} {}",
            t!("uid_label", id = &self.id).to_string().cyan(),
            self.username.bold(),
            self.phone.dimmed()
        );
        println!(
            "   {} | {} | {}",
            t!("balance_label", amount = format_amount(self.wallet_balance)),
            t!(
                "orders_label",
                daily = count(self.daily_orders),
                done = count(self.completed_orders),
                open = count(self.uncompleted_orders)
            ),
            t!(
                "invite_label",
                code = or_dash(self.invitation_code.as_deref()),
                by = or_dash(self.invited_by.as_deref())
            )
        );
        println!(
            "   {}",
            t!(
                "wallets_label",
                deposit = or_dash(self.wallet_address.as_deref()),
                withdrawal = or_dash(self.withdrawal_wallet_address.as_deref())
            )
            .to_string()
            .dimmed()
        );
    }
}

/// One page of the user directory.
#[derive(Debug, Clone, Serialize)]
pub struct UserPage {
    pub page: u32,
    pub total_pages: u32,
    pub total_users: u64,
    pub users: Vec<UserInfo>,
}

/// Page fetches in flight at once for `--all`.
const PAGE_CONCURRENCY: usize = 4;

/// List users matching the filters.
pub async fn list_users(
    client: &AdminClient,
    filters: UserFilters,
    page: u32,
    limit: u32,
) -> Result<UserPage> {
    let result = client
        .users()
        .list()
        .filters(filters)
        .page(page)
        .limit(limit)
        .send()
        .await?;

    Ok(UserPage {
        page: result.page,
        total_pages: result.total_pages,
        total_users: result.total_users,
        users: result.users.iter().map(UserInfo::from).collect(),
    })
}

/// List every page of users matching the filters.
///
/// The first page gives the page count; the rest are fetched concurrently
/// and merged back in page order.
pub async fn list_all_users(
    client: &AdminClient,
    filters: UserFilters,
    limit: u32,
) -> Result<UserPage> {
    let mut first = list_users(client, filters.clone(), 1, limit).await?;

    let mut rest: Vec<_> = stream::iter(2..=first.total_pages)
        .map(|page| {
            let filters = filters.clone();
            async move {
                let result = client
                    .users()
                    .list()
                    .filters(filters)
                    .page(page)
                    .limit(limit)
                    .send()
                    .await;
                (page, result)
            }
        })
        .buffer_unordered(PAGE_CONCURRENCY)
        .collect()
        .await;
    rest.sort_by_key(|(page, _)| *page);

    for (page, result) in rest {
        let result = result.with_context(|| format!("Failed to fetch page {}", page))?;
        first.users.extend(result.users.iter().map(UserInfo::from));
    }
    Ok(first)
}

/// Set the daily order quota for several users.
pub async fn set_daily_orders(client: &AdminClient, user_ids: &[String], orders: u32) -> Result<usize> {
    let ids: Vec<UserId> = user_ids.iter().map(UserId::from).collect();
    client.users().set_daily_orders(&ids, orders).await?;
    Ok(ids.len())
}

/// Profile fields to change. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileEdit {
    pub username: Option<String>,
    pub phone: Option<String>,
    pub withdrawal_wallet_address: Option<String>,
    pub wallet_balance: Option<f64>,
    pub new_password: Option<String>,
}

impl ProfileEdit {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.phone.is_none()
            && self.withdrawal_wallet_address.is_none()
            && self.wallet_balance.is_none()
            && self.new_password.is_none()
    }
}

/// Edit a user's profile.
pub async fn edit_user(client: &AdminClient, user_id: &str, edit: ProfileEdit) -> Result<()> {
    if edit.is_empty() {
        bail!("{}", t!("nothing_to_update"));
    }

    let mut update = client.users().update_profile(user_id);
    if let Some(username) = edit.username {
        update = update.username(username);
    }
    if let Some(phone) = edit.phone {
        update = update.phone(phone);
    }
    if let Some(address) = edit.withdrawal_wallet_address {
        update = update.withdrawal_wallet_address(address);
    }
    if let Some(balance) = edit.wallet_balance {
        update = update.wallet_balance(balance);
    }
    if let Some(password) = edit.new_password {
        update = update.new_password(password);
    }
    update.send().await?;
    Ok(())
}

/// Delete several users.
pub async fn delete_users(client: &AdminClient, user_ids: &[String]) -> Result<usize> {
    let ids: Vec<UserId> = user_ids.iter().map(UserId::from).collect();
    client.users().delete_many(&ids).await?;
    Ok(ids.len())
}
