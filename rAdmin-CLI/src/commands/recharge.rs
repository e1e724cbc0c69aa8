//! Recharge commands.

use anyhow::Result;
use clap::Subcommand;
use rust_i18n::t;

use crate::config::{build_authed_client, Endpoints};
use crate::handlers::recharge as handlers;
use crate::output::{print_table, OutputFormat};

#[derive(Subcommand)]
pub enum RechargeAction {
    /// Show a user's recharge history
    History {
        /// User ID
        user_id: String,
    },

    /// List recharge requests waiting for review
    Pending,

    /// Approve a recharge request
    Approve {
        /// Request ID
        id: String,
        /// Admin notes
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Reject a recharge request
    Reject {
        /// Request ID
        id: String,
        /// Reason for rejection (required)
        #[arg(short, long)]
        notes: String,
    },
}

pub async fn handle(
    action: RechargeAction,
    format: OutputFormat,
    _verbose: bool,
    endpoints: &Endpoints,
) -> Result<()> {
    let client = build_authed_client(endpoints)?;

    match action {
        RechargeAction::History { user_id } => {
            let records = handlers::history(&client, &user_id).await?;
            if matches!(format, OutputFormat::Plain) {
                println!("{}\n", t!("recharge_history_for", id = &user_id));
            }
            print_table(records, format);
        }
        RechargeAction::Pending => {
            let requests = handlers::pending(&client).await?;
            if matches!(format, OutputFormat::Plain) {
                println!("{}\n", t!("pending_count", count = requests.len()));
            }
            print_table(requests, format);
        }
        RechargeAction::Approve { id, notes } => {
            handlers::approve(&client, &id, notes.as_deref()).await?;
            println!("{}", t!("recharge_approved", id = &id));
        }
        RechargeAction::Reject { id, notes } => {
            handlers::reject(&client, &id, &notes).await?;
            println!("{}", t!("recharge_rejected", id = &id));
        }
    }

    Ok(())
}
