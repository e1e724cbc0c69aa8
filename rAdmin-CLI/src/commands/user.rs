//! User commands.

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use radmin::api::{UserFilters, DEFAULT_PAGE_SIZE};
use rust_i18n::t;

use crate::config::{build_authed_client, Endpoints};
use crate::handlers::user::{self as handlers, ProfileEdit};
use crate::output::{print_json, print_table, OutputFormat};

#[derive(Subcommand)]
pub enum UserAction {
    /// List users
    #[command(alias = "ls")]
    List {
        /// Filter by username
        #[arg(long)]
        username: Option<String>,
        /// Filter by phone number
        #[arg(long)]
        phone: Option<String>,
        /// Filter by invitation code
        #[arg(long)]
        code: Option<String>,
        /// Filter by wallet address
        #[arg(long)]
        wallet: Option<String>,
        /// Page number
        #[arg(short, long, default_value = "1")]
        page: u32,
        /// Fetch every page
        #[arg(short, long, conflicts_with = "page")]
        all: bool,
        /// Users per page
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        limit: u32,
    },

    /// Set the daily order quota of one or more users
    Tasks {
        /// Daily order count
        #[arg(short, long)]
        orders: u32,
        /// User IDs
        #[arg(required = true)]
        user_ids: Vec<String>,
    },

    /// Edit a user's profile
    Edit {
        /// User ID
        user_id: String,
        /// New username
        #[arg(long)]
        username: Option<String>,
        /// New phone number
        #[arg(long)]
        phone: Option<String>,
        /// New withdrawal wallet address
        #[arg(long)]
        withdrawal_wallet: Option<String>,
        /// New wallet balance
        #[arg(long)]
        balance: Option<f64>,
        /// New password
        #[arg(long)]
        password: Option<String>,
    },

    /// Delete one or more users
    #[command(alias = "rm")]
    Delete {
        /// User IDs
        #[arg(required = true)]
        user_ids: Vec<String>,
        /// Confirm the deletion
        #[arg(short, long)]
        yes: bool,
    },
}

pub async fn handle(
    action: UserAction,
    format: OutputFormat,
    _verbose: bool,
    endpoints: &Endpoints,
) -> Result<()> {
    match action {
        UserAction::List {
            username,
            phone,
            code,
            wallet,
            page,
            all,
            limit,
        } => {
            let filters = UserFilters {
                username: username.unwrap_or_default(),
                phone: phone.unwrap_or_default(),
                code: code.unwrap_or_default(),
                wallet: wallet.unwrap_or_default(),
            };
            let page = if all { None } else { Some(page) };
            list_users(filters, page, limit, format, endpoints).await
        }
        UserAction::Tasks { orders, user_ids } => set_tasks(&user_ids, orders, endpoints).await,
        UserAction::Edit {
            user_id,
            username,
            phone,
            withdrawal_wallet,
            balance,
            password,
        } => {
            let edit = ProfileEdit {
                username,
                phone,
                withdrawal_wallet_address: withdrawal_wallet,
                wallet_balance: balance,
                new_password: password,
            };
            edit_user(&user_id, edit, endpoints).await
        }
        UserAction::Delete { user_ids, yes } => delete_users(&user_ids, yes, endpoints).await,
    }
}

/// `page: None` lists every page.
async fn list_users(
    filters: UserFilters,
    page: Option<u32>,
    limit: u32,
    format: OutputFormat,
    endpoints: &Endpoints,
) -> Result<()> {
    let client = build_authed_client(endpoints)?;
    let result = match page {
        Some(page) => handlers::list_users(&client, filters, page, limit).await?,
        None => handlers::list_all_users(&client, filters, limit).await?,
    };

    if matches!(format, OutputFormat::Plain) {
        let header = match page {
            Some(_) => t!(
                "users_page",
                page = result.page,
                total = result.total_pages,
                count = result.total_users
            ),
            None => t!("users_all", count = result.total_users),
        };
        println!("{}\n", header);
    }

    if matches!(format, OutputFormat::Json) {
        print_json(&result);
        return Ok(());
    }
    print_table(result.users, format);
    Ok(())
}

async fn set_tasks(user_ids: &[String], orders: u32, endpoints: &Endpoints) -> Result<()> {
    let client = build_authed_client(endpoints)?;
    let count = handlers::set_daily_orders(&client, user_ids, orders).await?;

    println!("{}", t!("tasks_assigned", orders = orders, count = count));
    Ok(())
}

async fn edit_user(user_id: &str, edit: ProfileEdit, endpoints: &Endpoints) -> Result<()> {
    let client = build_authed_client(endpoints)?;
    handlers::edit_user(&client, user_id, edit).await?;

    println!("{}", t!("user_updated", id = user_id));
    Ok(())
}

async fn delete_users(user_ids: &[String], yes: bool, endpoints: &Endpoints) -> Result<()> {
    let ids = user_ids.join(", ");
    if !yes {
        println!("{}", t!("confirm_delete", ids = &ids).to_string().yellow());
        return Ok(());
    }

    let client = build_authed_client(endpoints)?;
    let count = handlers::delete_users(&client, user_ids).await?;

    println!("{}", t!("users_deleted", count = count, ids = &ids));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    #[derive(Parser)]
    struct Harness {
        #[command(subcommand)]
        action: UserAction,
    }

    #[test]
    fn test_delete_takes_several_ids() {
        let harness = Harness::try_parse_from(["radmin", "delete", "7", "12", "--yes"]).unwrap();
        match harness.action {
            UserAction::Delete { user_ids, yes } => {
                assert_eq!(user_ids, vec!["7", "12"]);
                assert!(yes);
            }
            _ => panic!("expected delete"),
        }

        assert!(Harness::try_parse_from(["radmin", "delete"]).is_err());
    }
}
