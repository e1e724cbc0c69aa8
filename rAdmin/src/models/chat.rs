//! Chat models: conversations, messages and their wire shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::{wire, MessageId, UserId};

/// A conversation with one platform user, keyed by that user's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversation {
    /// The user on the other side; also the conversation key.
    pub user_id: UserId,
    /// Display name for the conversation list.
    pub display_name: String,
    /// Whether the backend reports unseen user-originated messages.
    pub has_unread: bool,
}

/// Conversation entry as returned by `GET /chat/unread-conversations`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationRecord {
    pub id: UserId,
    #[serde(default, deserialize_with = "wire::string_or_null")]
    pub username: String,
    #[serde(default)]
    pub has_unread_messages: Option<bool>,
    #[serde(default)]
    pub unread_count: Option<u64>,
}

impl From<ConversationRecord> for Conversation {
    fn from(r: ConversationRecord) -> Self {
        // The endpoint only lists conversations that have unread state, so
        // an entry without explicit metadata counts as unread.
        let has_unread = r
            .has_unread_messages
            .or(r.unread_count.map(|n| n > 0))
            .unwrap_or(true);
        Self {
            user_id: r.id,
            display_name: r.username,
            has_unread,
        }
    }
}

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    User,
    Admin,
}

impl fmt::Display for SenderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SenderRole::User => write!(f, "user"),
            SenderRole::Admin => write!(f, "admin"),
        }
    }
}

/// Client-generated id for a message that the server has not confirmed yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TempId(pub String);

impl TempId {
    /// Generate a fresh provisional id.
    ///
    /// UUID v7 carries a millisecond timestamp plus random bits, so two
    /// sends inside the same clock tick still get distinct ids.
    pub fn generate() -> Self {
        TempId(format!("optimistic-admin-{}", Uuid::now_v7()))
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TempId {
    fn from(s: &str) -> Self {
        TempId(s.to_owned())
    }
}

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a message in the active list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum MessageKey {
    /// Persisted by the backend.
    Server(MessageId),
    /// Sent locally, waiting for the server echo.
    Provisional(TempId),
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKey::Server(id) => write!(f, "{}", id),
            MessageKey::Provisional(id) => write!(f, "{}", id),
        }
    }
}

/// A chat message as shown in the active conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub key: MessageKey,
    pub conversation_id: UserId,
    pub sender: SenderRole,
    pub text: String,
    pub attachment_url: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Whether the message is still waiting for server confirmation.
    pub fn is_provisional(&self) -> bool {
        matches!(self.key, MessageKey::Provisional(_))
    }

    /// Server id, once confirmed.
    pub fn server_id(&self) -> Option<&MessageId> {
        match &self.key {
            MessageKey::Server(id) => Some(id),
            MessageKey::Provisional(_) => None,
        }
    }

    /// Build a provisional admin message.
    pub fn provisional(
        temp_id: TempId,
        conversation_id: UserId,
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            key: MessageKey::Provisional(temp_id),
            conversation_id,
            sender: SenderRole::Admin,
            text: text.into(),
            attachment_url: None,
            timestamp,
        }
    }
}

/// History entry as returned by `GET /chat/messages/{userId}`.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryRecord {
    pub id: MessageId,
    pub sender_role: SenderRole,
    #[serde(default, deserialize_with = "wire::string_or_null")]
    pub message_text: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(deserialize_with = "wire::timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl HistoryRecord {
    /// Convert into a confirmed message of the given conversation.
    pub fn into_message(self, conversation_id: &UserId) -> Message {
        Message {
            key: MessageKey::Server(self.id),
            conversation_id: conversation_id.clone(),
            sender: self.sender_role,
            text: self.message_text,
            attachment_url: self.image_url,
            timestamp: self.timestamp,
        }
    }
}

/// Payload of an inbound `receiveMessage` event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IncomingMessage {
    #[serde(default)]
    pub id: Option<MessageId>,
    pub user_id: UserId,
    pub sender_role: SenderRole,
    #[serde(default, deserialize_with = "wire::string_or_null")]
    pub message_text: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "wire::timestamp_opt")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, rename = "tempId")]
    pub temp_id: Option<TempId>,
}

impl IncomingMessage {
    /// Convert into a confirmed message, if the event carries a server id.
    pub fn to_message(&self, received_at: DateTime<Utc>) -> Option<Message> {
        let id = self.id.clone()?;
        Some(Message {
            key: MessageKey::Server(id),
            conversation_id: self.user_id.clone(),
            sender: self.sender_role,
            text: self.message_text.clone(),
            attachment_url: self.image_url.clone(),
            timestamp: self.timestamp.unwrap_or(received_at),
        })
    }
}

/// Payload of an outbound `sendMessage` command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    pub user_id: UserId,
    pub sender_id: UserId,
    pub sender_role: SenderRole,
    pub message_text: String,
    pub temp_id: TempId,
}
