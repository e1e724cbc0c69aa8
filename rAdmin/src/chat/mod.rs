//! Admin chat session: conversation list, active thread and reconciliation
//! of optimistic sends with server echoes.
//!
//! [`ChatState`] holds all state and invariants and performs no I/O.
//! [`ChatController`] drives it from a directory service and a realtime
//! channel.

mod controller;
mod session;
mod state;

pub use controller::{ChatController, ChatUpdate};
pub use session::{Session, UnauthorizedHook};
pub use state::{ChatSnapshot, ChatState, HistoryTicket, Reconciliation, SelectionPhase};

use async_trait::async_trait;

use crate::{
    error::Result,
    models::{Conversation, Message, UserId},
};

/// Request/response source of conversations and message history.
#[async_trait]
pub trait ChatDirectory: Send + Sync {
    /// Conversations with unread metadata, in display order.
    async fn conversations(&self) -> Result<Vec<Conversation>>;

    /// Full message history with one user.
    async fn history(&self, user_id: &UserId) -> Result<Vec<Message>>;
}
