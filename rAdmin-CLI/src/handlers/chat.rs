//! Chat handlers.

use anyhow::Result;
use colored::Colorize;
use radmin::{AdminClient, Conversation, Message, SenderRole};
use rust_i18n::t;
use serde::Serialize;

use crate::output::{format_relative_time, format_time, PlainPrint, TableRow};

/// Conversation list entry.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationInfo {
    pub user_id: String,
    pub username: String,
    pub has_unread: bool,
}

impl From<&Conversation> for ConversationInfo {
    fn from(c: &Conversation) -> Self {
        Self {
            user_id: c.user_id.to_string(),
            username: c.display_name.clone(),
            has_unread: c.has_unread,
        }
    }
}

impl TableRow for ConversationInfo {
    fn headers() -> Vec<&'static str> {
        vec!["User ID", "Username", "Unread"]
    }
    fn row(&self) -> Vec<String> {
        vec![
            self.user_id.clone(),
            self.username.clone(),
            if self.has_unread {
                "●".to_string()
            } else {
                "".to_string()
            },
        ]
    }
}

impl PlainPrint for ConversationInfo {
    fn plain_print(&self) {
        let unread_marker = if self.has_unread {
            "● ".red().to_string()
        } else {
            "  ".to_string()
        };
        println!(
            "{}[{}] {}",
            unread_marker,
            self.user_id.cyan(),
            self.username.green()
        );
    }
}

/// A chat message for display.
#[derive(Debug, Clone, Serialize)]
pub struct MessageInfo {
    pub id: String,
    pub sender: SenderRole,
    pub text: String,
    pub attachment_url: Option<String>,
    pub pending: bool,
    #[serde(skip)]
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(rename = "timestamp")]
    pub time: String,
}

impl From<&Message> for MessageInfo {
    fn from(m: &Message) -> Self {
        Self {
            id: m.key.to_string(),
            sender: m.sender,
            text: m.text.clone(),
            attachment_url: m.attachment_url.clone(),
            pending: m.is_provisional(),
            timestamp: m.timestamp,
            time: format_time(Some(m.timestamp)),
        }
    }
}

impl MessageInfo {
    fn sender_label(&self) -> String {
        match self.sender {
            SenderRole::Admin => t!("you_label").to_string(),
            SenderRole::User => t!("user_label").to_string(),
        }
    }
}

impl TableRow for MessageInfo {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "From", "Message", "Time"]
    }
    fn row(&self) -> Vec<String> {
        let mut text = self.text.clone();
        if let Some(url) = &self.attachment_url {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(url);
        }
        vec![self.id.clone(), self.sender_label(), text, self.time.clone()]
    }
}

impl PlainPrint for MessageInfo {
    fn plain_print(&self) {
        let from = match self.sender {
            SenderRole::Admin => self.sender_label().green().to_string(),
            SenderRole::User => self.sender_label().yellow().to_string(),
        };
        let status = if self.pending {
            format!(" {}", t!("sending_label")).dimmed().to_string()
        } else {
            String::new()
        };
        println!(
            "{} {}{}",
            from,
            format_relative_time(self.timestamp).dimmed(),
            status
        );
        for line in self.text.lines() {
            if !line.trim().is_empty() {
                println!("   {}", line);
            }
        }
        if let Some(url) = &self.attachment_url {
            println!("   {}", t!("attachment_label", url = url).to_string().dimmed());
        }
    }
}

/// Conversations with unread state.
pub async fn list_conversations(client: &AdminClient) -> Result<Vec<ConversationInfo>> {
    let conversations = client.chat().conversations().await?;
    Ok(conversations.iter().map(ConversationInfo::from).collect())
}

/// Full message history with one user.
pub async fn read_history(client: &AdminClient, user_id: &str) -> Result<Vec<MessageInfo>> {
    let messages = client.chat().messages(user_id).await?;
    Ok(messages.iter().map(MessageInfo::from).collect())
}

/// One line typed into the chat console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    /// Switch to a conversation, by user id or username.
    Open(String),
    /// Show the conversation list.
    List,
    /// Show help.
    Help,
    Quit,
    /// Send the line to the active conversation.
    Send(String),
    /// Unknown slash command.
    Unknown(String),
    Empty,
}

impl ConsoleInput {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ConsoleInput::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return ConsoleInput::Send(line.to_string());
        };

        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };
        match name {
            "open" | "o" if !arg.is_empty() => ConsoleInput::Open(arg.to_string()),
            "list" | "ls" => ConsoleInput::List,
            "help" | "h" | "?" => ConsoleInput::Help,
            "quit" | "q" | "exit" => ConsoleInput::Quit,
            _ => ConsoleInput::Unknown(line.to_string()),
        }
    }
}

/// Resolve `/open` input against the conversation list: a username match
/// wins, anything else is taken as a user id.
pub fn resolve_user<'a>(conversations: &'a [Conversation], input: &'a str) -> &'a str {
    conversations
        .iter()
        .find(|c| c.display_name.eq_ignore_ascii_case(input))
        .map(|c| c.user_id.as_str())
        .unwrap_or(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use radmin::UserId;

    #[test]
    fn test_console_input() {
        assert_eq!(ConsoleInput::parse("  hello there "), ConsoleInput::Send("hello there".into()));
        assert_eq!(ConsoleInput::parse("/open alice"), ConsoleInput::Open("alice".into()));
        assert_eq!(ConsoleInput::parse("/o  7 "), ConsoleInput::Open("7".into()));
        assert_eq!(ConsoleInput::parse("/open"), ConsoleInput::Unknown("/open".into()));
        assert_eq!(ConsoleInput::parse("/list"), ConsoleInput::List);
        assert_eq!(ConsoleInput::parse("/q"), ConsoleInput::Quit);
        assert_eq!(ConsoleInput::parse("/dance"), ConsoleInput::Unknown("/dance".into()));
        assert_eq!(ConsoleInput::parse("   "), ConsoleInput::Empty);
    }

    #[test]
    fn test_resolve_user() {
        let conversations = vec![Conversation {
            user_id: UserId::from(7),
            display_name: "Alice".into(),
            has_unread: true,
        }];

        assert_eq!(resolve_user(&conversations, "alice"), "7");
        assert_eq!(resolve_user(&conversations, "8"), "8");
    }
}
