//! Data models for admin backend entities.

mod chat;
mod ids;
mod recharge;
mod user;
pub(crate) mod wire;

pub use chat::{
    Conversation, ConversationRecord, HistoryRecord, IncomingMessage, Message, MessageKey,
    OutgoingMessage, SenderRole, TempId,
};
pub use ids::{MessageId, RechargeId, UserId};
pub use recharge::{RechargeRecord, RechargeRequest};
pub use user::{Account, AccountRole, User};
