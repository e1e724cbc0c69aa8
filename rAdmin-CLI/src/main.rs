//! Admin console CLI.

mod commands;
mod config;
mod handlers;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{chat, recharge, user};
use config::Endpoints;
use rust_i18n::t;

rust_i18n::i18n!("src/locales", fallback = "en");

/// Wallet platform admin console
#[derive(Parser)]
#[command(name = "radmin")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "plain")]
    format: output::OutputFormat,

    /// Show verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Language for output (en, zh-CN)
    #[arg(short, long, global = true, default_value = "en")]
    lang: String,

    /// REST API base URL
    #[arg(long, global = true, env = "RADMIN_API_URL")]
    api_url: Option<String>,

    /// Realtime socket URL
    #[arg(long, global = true, env = "RADMIN_SOCKET_URL")]
    socket_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage authentication
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },

    /// User directory operations
    #[command(alias = "u")]
    User {
        #[command(subcommand)]
        action: user::UserAction,
    },

    /// Recharge history and review
    #[command(alias = "r")]
    Recharge {
        #[command(subcommand)]
        action: recharge::RechargeAction,
    },

    /// Chat with users
    #[command(alias = "c")]
    Chat {
        #[command(subcommand)]
        action: chat::ChatAction,
    },

    /// Show current configuration
    Config,
}

#[derive(Subcommand)]
enum AuthAction {
    /// Login with an admin account
    Login {
        /// Username
        #[arg(short, long)]
        username: String,
        /// Password
        #[arg(short, long, env = "RADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Logout
    Logout,
    /// Show current auth status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    rust_i18n::set_locale(&cli.lang);
    init_logging(cli.verbose);

    let command = cli
        .command
        .ok_or_else(|| anyhow::anyhow!("{}", t!("no_command")))?;
    let endpoints = Endpoints {
        api_url: cli.api_url,
        socket_url: cli.socket_url,
    };

    // A failed login must not wipe the credentials already stored.
    let keeps_credentials = matches!(command, Commands::Auth { .. });

    let result = match command {
        Commands::Auth { action } => handle_auth(action, &endpoints).await,
        Commands::User { action } => user::handle(action, cli.format, cli.verbose, &endpoints).await,
        Commands::Recharge { action } => {
            recharge::handle(action, cli.format, cli.verbose, &endpoints).await
        }
        Commands::Chat { action } => chat::handle(action, cli.format, cli.verbose, &endpoints).await,
        Commands::Config => show_config(),
    };

    if let Err(err) = &result {
        if !keeps_credentials && config::forget_rejected_auth(err, config::clear_auth) {
            eprintln!("{}", t!("session_expired").to_string().red());
        }
    }
    result
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn show_config() -> Result<()> {
    let cfg = config::load_config()?;
    println!(
        "{}",
        t!("config_file", path = config::config_path()?.display())
    );
    println!(
        "{}",
        t!(
            "api_url_label",
            url = cfg.api_url.as_deref().unwrap_or(radmin::client::DEFAULT_BASE_URL)
        )
    );
    println!(
        "{}",
        t!(
            "socket_url_label",
            url = cfg
                .socket_url
                .as_deref()
                .unwrap_or(radmin::realtime::DEFAULT_SOCKET_URL)
        )
    );
    println!("{}", t!("authenticated", status = cfg.auth.is_some()));
    if let Some(auth) = &cfg.auth {
        println!("{}", t!("user_id", uid = &auth.admin_id));
    }
    Ok(())
}

async fn handle_auth(action: AuthAction, endpoints: &Endpoints) -> Result<()> {
    match action {
        AuthAction::Login { username, password } => {
            let client = config::build_client(endpoints)?;
            let login = client
                .auth()
                .login(&username, &password)
                .await
                .context(t!("login_failed").to_string())?;

            let auth = login.auth_info();
            let mut cfg = config::load_config()?;
            cfg.auth = Some(config::AuthConfig {
                token: auth.token,
                admin_id: auth.admin_id.to_string(),
                username: login.account.username.clone(),
            });
            config::save_config(&cfg)?;
            println!(
                "{}",
                t!("logged_in_as", name = &login.account.username, uid = &login.account.id)
            );
            Ok(())
        }
        AuthAction::Logout => {
            let mut cfg = config::load_config()?;
            cfg.auth = None;
            config::save_config(&cfg)?;
            println!("{}", t!("logged_out"));
            Ok(())
        }
        AuthAction::Status => {
            let cfg = config::load_config()?;
            if let Some(auth) = &cfg.auth {
                println!(
                    "{}",
                    t!("logged_in_as", name = &auth.username, uid = &auth.admin_id)
                );
            } else {
                println!("{}", t!("not_logged_in"));
            }
            Ok(())
        }
    }
}
