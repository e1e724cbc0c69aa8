//! Chat commands.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use colored::Colorize;
use radmin::{
    api::ChatApi,
    chat::{ChatController, ChatUpdate, Reconciliation, SelectionPhase, Session},
    AdminClient, ConnectionState, SocketIoChannel,
};
use rust_i18n::t;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::{build_authed_client, clear_auth, Endpoints};
use crate::handlers::chat::{self as handlers, resolve_user, ConsoleInput, ConversationInfo, MessageInfo};
use crate::output::{print_plain, print_table, OutputFormat, PlainPrint};

#[derive(Subcommand)]
pub enum ChatAction {
    /// List conversations with unread messages
    #[command(alias = "ls")]
    List,

    /// Show the message history with a user
    Read {
        /// User ID
        user_id: String,
    },

    /// Open the interactive chat console
    Console {
        /// Conversation to open first (user ID or username)
        #[arg(short, long)]
        open: Option<String>,
    },
}

pub async fn handle(
    action: ChatAction,
    format: OutputFormat,
    verbose: bool,
    endpoints: &Endpoints,
) -> Result<()> {
    let client = build_authed_client(endpoints)?;

    match action {
        ChatAction::List => {
            let conversations = handlers::list_conversations(&client).await?;
            if matches!(format, OutputFormat::Plain) {
                println!("{}\n", t!("conversations_count", count = conversations.len()));
            }
            print_table(conversations, format);
            Ok(())
        }
        ChatAction::Read { user_id } => {
            let messages = handlers::read_history(&client, &user_id).await?;
            if matches!(format, OutputFormat::Plain) {
                println!("{}\n", t!("conversation_with", user = user_id.green()));
            }
            print_table(messages, format);
            Ok(())
        }
        ChatAction::Console { open } => console(&client, open, verbose).await,
    }
}

type Controller = ChatController<ChatApi, SocketIoChannel>;

async fn console(client: &AdminClient, open: Option<String>, verbose: bool) -> Result<()> {
    let admin_id = client
        .current_admin_id()
        .context("Authentication required. Run 'radmin auth login' first.")?;

    let session = Session::new(admin_id).on_unauthorized(|err| {
        tracing::warn!("session rejected by backend: {}", err);
        if let Err(e) = clear_auth() {
            tracing::warn!("could not clear stored credentials: {:#}", e);
        }
    });
    let mut controller: Controller =
        ChatController::new(Arc::new(client.chat()), client.realtime(), session);

    println!("{}", t!("console_help").to_string().dimmed());
    if let Err(e) = controller.connect().await {
        println!("{}", t!("connect_failed", reason = e).to_string().red());
    }

    match controller.load_conversations().await {
        Ok(conversations) => print_conversations(&conversations),
        Err(e) if e.is_auth_error() => bail!(e),
        Err(e) => println!("{}", e.to_string().red()),
    }
    if let Some(user) = open {
        open_conversation(&mut controller, &user);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let result = loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line.context("Failed to read from stdin") {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        println!("{}", t!("console_closed").to_string().dimmed());
                        break Ok(());
                    }
                    Err(e) => break Err(e),
                };
                match ConsoleInput::parse(&line) {
                    ConsoleInput::Quit => break Ok(()),
                    ConsoleInput::Empty => {}
                    ConsoleInput::Help => println!("{}", t!("console_help").to_string().dimmed()),
                    ConsoleInput::List => print_conversations(controller.state().conversations()),
                    ConsoleInput::Open(user) => open_conversation(&mut controller, &user),
                    ConsoleInput::Unknown(cmd) => {
                        println!("{}", t!("unknown_command", cmd = cmd).to_string().yellow())
                    }
                    ConsoleInput::Send(text) => match controller.send_message(&text).await {
                        Ok(Some(temp_id)) => {
                            tracing::debug!("sent {}", temp_id);
                        }
                        Ok(None) => println!("{}", send_refusal(&controller).yellow()),
                        Err(e) => println!("{}", e.to_string().red()),
                    },
                }
            }
            update = controller.next_update(), if !controller.is_idle() => {
                match update {
                    Some(ChatUpdate::SessionExpired) => {
                        break Err(anyhow::anyhow!("{}", t!("session_expired")));
                    }
                    Some(update) => render_update(&controller, &update, verbose),
                    None => {}
                }
            }
        }
    };

    controller.teardown().await;
    result
}

fn open_conversation(controller: &mut Controller, input: &str) {
    let user_id = resolve_user(controller.state().conversations(), input).to_string();
    controller.select_conversation(user_id.as_str());
    println!("{}", t!("loading_conversation", user = user_id).to_string().dimmed());
}

fn send_refusal(controller: &Controller) -> String {
    let state = controller.state();
    if state.active_conversation().is_none() {
        t!("no_conversation_open").to_string()
    } else if !state.connection().is_connected() {
        t!("not_connected").to_string()
    } else {
        t!("empty_message").to_string()
    }
}

fn print_conversations(conversations: &[radmin::Conversation]) {
    let rows: Vec<ConversationInfo> = conversations.iter().map(ConversationInfo::from).collect();
    print_plain(&rows);
}

fn render_update(controller: &Controller, update: &ChatUpdate, verbose: bool) {
    let state = controller.state();
    match update {
        ChatUpdate::HistoryLoaded(user_id) => {
            println!("{}", t!("conversation_with", user = user_id.to_string().green()));
            let rows: Vec<MessageInfo> = state.messages().iter().map(MessageInfo::from).collect();
            if rows.is_empty() {
                println!("{}", t!("no_messages").to_string().dimmed());
            }
            for row in &rows {
                row.plain_print();
            }
        }
        ChatUpdate::Message(Reconciliation::Appended) => {
            if let Some(message) = state.messages().last() {
                MessageInfo::from(message).plain_print();
            }
        }
        ChatUpdate::Message(Reconciliation::Confirmed { index }) => {
            if verbose {
                if let Some(message) = state.messages().get(*index) {
                    println!("{}", t!("delivered", id = message.key.to_string()).to_string().dimmed());
                }
            }
        }
        ChatUpdate::Conversations if verbose => {
            print_conversations(state.conversations());
        }
        ChatUpdate::Connection(ConnectionState::Connected) => {
            println!("{}", t!("connected").to_string().green());
        }
        ChatUpdate::Connection(ConnectionState::Failed(reason)) => {
            println!("{}", t!("connect_failed", reason = reason).to_string().red());
        }
        ChatUpdate::Connection(ConnectionState::Disconnected) => {
            println!("{}", t!("disconnected").to_string().yellow());
        }
        ChatUpdate::Failed(message) => {
            if state.phase() == SelectionPhase::Failed {
                println!("{}", t!("history_failed", reason = message).to_string().red());
            } else {
                println!("{}", message.red());
            }
        }
        _ => {}
    }
}
