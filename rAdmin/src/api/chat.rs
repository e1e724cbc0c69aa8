//! Chat directory and history API.

use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    chat::ChatDirectory,
    client::AdminClientInner,
    error::Result,
    models::{Conversation, ConversationRecord, HistoryRecord, Message, UserId},
};

/// API for chat conversations and message history.
#[derive(Clone)]
pub struct ChatApi {
    client: Arc<AdminClientInner>,
}

impl ChatApi {
    pub(crate) fn new(client: Arc<AdminClientInner>) -> Self {
        Self { client }
    }

    /// List conversations that have unread state, in backend order.
    pub async fn conversations(&self) -> Result<Vec<Conversation>> {
        let records: Option<Vec<ConversationRecord>> = self
            .client
            .get_authed("chat/unread-conversations", &[])
            .await?;

        Ok(records
            .unwrap_or_default()
            .into_iter()
            .map(Conversation::from)
            .collect())
    }

    /// Full message history of the conversation with one user.
    pub async fn messages(&self, user_id: impl Into<UserId>) -> Result<Vec<Message>> {
        let user_id = user_id.into();
        let records: Option<Vec<HistoryRecord>> = self
            .client
            .get_authed(&format!("chat/messages/{}", user_id), &[])
            .await?;

        Ok(records
            .unwrap_or_default()
            .into_iter()
            .map(|r| r.into_message(&user_id))
            .collect())
    }
}

#[async_trait]
impl ChatDirectory for ChatApi {
    async fn conversations(&self) -> Result<Vec<Conversation>> {
        ChatApi::conversations(self).await
    }

    async fn history(&self, user_id: &UserId) -> Result<Vec<Message>> {
        self.messages(user_id).await
    }
}
