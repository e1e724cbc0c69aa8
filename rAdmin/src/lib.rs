//! Rust client library for the wallet platform admin backend.

pub mod api;
pub mod chat;
pub mod client;
pub mod error;
pub mod models;
pub mod realtime;

// Re-export main types
pub use client::{AdminClient, AdminClientBuilder, AuthInfo, HttpConfig};
pub use error::{Error, Result};

// Re-export commonly used models
pub use models::{
    Account, AccountRole, Conversation, IncomingMessage, Message, MessageId, MessageKey,
    OutgoingMessage, RechargeId, RechargeRecord, RechargeRequest, SenderRole, TempId, User, UserId,
};

// Re-export API types
pub use api::{LoginResult, UserListResult};

// Re-export chat and realtime types
pub use chat::{ChatController, ChatDirectory, ChatState, ChatUpdate, Session};
pub use realtime::{ConnectionState, InboundEvent, OutboundCommand, RealtimeChannel, SocketIoChannel};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builder() {
        let client = AdminClient::builder().build();
        assert!(client.is_ok());

        let client = client.unwrap();
        assert!(!client.is_authenticated());
    }

    #[test]
    fn test_client_with_auth() {
        let client = AdminClient::builder()
            .auth("test_token", 12345)
            .build()
            .unwrap();

        assert!(client.is_authenticated());
        assert_eq!(client.current_admin_id(), Some(&UserId::from(12345)));
    }

    #[tokio::test]
    async fn test_calls_without_auth_fail_fast() {
        let client = AdminClient::builder().build().unwrap();

        let err = client.chat().conversations().await.unwrap_err();
        assert!(matches!(err, Error::AuthRequired));
        assert!(err.is_auth_error());
    }

    #[tokio::test]
    async fn test_blank_token_counts_as_unauthenticated() {
        let client = AdminClient::builder().auth("", 1).build().unwrap();
        assert!(!client.is_authenticated());

        let err = client.recharges().pending().await.unwrap_err();
        assert!(matches!(err, Error::AuthRequired));
    }
}
