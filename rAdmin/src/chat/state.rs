//! Chat session state and reconciliation rules.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    models::{
        Conversation, IncomingMessage, Message, MessageId, MessageKey, OutgoingMessage,
        SenderRole, TempId, UserId,
    },
    realtime::ConnectionState,
};

/// Identifies one history fetch. Only the latest ticket may apply results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct HistoryTicket(u64);

/// Lifecycle of the active conversation's message list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPhase {
    NoneSelected,
    Loading,
    Ready,
    /// The history fetch for the current selection failed.
    Failed,
}

/// Outcome of applying one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Belongs to a conversation that is not active.
    OtherConversation,
    /// Replaced the provisional entry at `index`.
    Confirmed { index: usize },
    /// New message appended at the end.
    Appended,
    /// Already present.
    Duplicate,
    /// No server id, cannot be keyed.
    MissingId,
}

impl Reconciliation {
    /// Whether the message list changed.
    pub fn changed(&self) -> bool {
        matches!(self, Reconciliation::Confirmed { .. } | Reconciliation::Appended)
    }
}

#[derive(Debug, Clone)]
struct Selection {
    user_id: UserId,
    ticket: HistoryTicket,
    phase: SelectionPhase,
}

/// Admin's view of conversations and the active message list.
///
/// Pure state: no I/O, no clock reads. Every mutation goes through a method
/// that keeps these invariants:
///
/// - message keys are unique in the active list;
/// - provisional messages are always admin messages;
/// - the active list only holds messages of the active conversation;
/// - every pending temp id has a provisional entry in the active list.
#[derive(Debug, Clone)]
pub struct ChatState {
    conversations: Vec<Conversation>,
    refresh_issued: u64,
    refresh_applied: u64,
    selection: Option<Selection>,
    next_ticket: u64,
    messages: Vec<Message>,
    pending: HashSet<TempId>,
    connection: ConnectionState,
    last_error: Option<String>,
    session_expired: bool,
}

impl Default for ChatState {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatState {
    pub fn new() -> Self {
        Self {
            conversations: Vec::new(),
            refresh_issued: 0,
            refresh_applied: 0,
            selection: None,
            next_ticket: 0,
            messages: Vec::new(),
            pending: HashSet::new(),
            connection: ConnectionState::Disconnected,
            last_error: None,
            session_expired: false,
        }
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// User id of the active conversation.
    pub fn active_conversation(&self) -> Option<&UserId> {
        self.selection.as_ref().map(|s| &s.user_id)
    }

    pub fn phase(&self) -> SelectionPhase {
        self.selection
            .as_ref()
            .map(|s| s.phase)
            .unwrap_or(SelectionPhase::NoneSelected)
    }

    pub fn connection(&self) -> &ConnectionState {
        &self.connection
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_session_expired(&self) -> bool {
        self.session_expired
    }

    /// Number of sends still waiting for their echo.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Reserve a generation number for a conversation fetch.
    pub fn begin_refresh(&mut self) -> u64 {
        self.refresh_issued += 1;
        self.refresh_issued
    }

    /// Whether a fetch of this generation would still be applied.
    pub fn is_refresh_current(&self, generation: u64) -> bool {
        generation > self.refresh_applied
    }

    /// Replace the conversation list wholesale, unless a newer fetch has
    /// already been applied.
    pub fn apply_conversations(&mut self, generation: u64, conversations: Vec<Conversation>) -> bool {
        if !self.is_refresh_current(generation) {
            log::debug!(
                "dropping conversation list #{} (applied #{})",
                generation,
                self.refresh_applied
            );
            return false;
        }
        self.refresh_applied = generation;
        self.conversations = conversations;
        true
    }

    /// Make `user_id` the active conversation and start loading its history.
    pub fn begin_select(&mut self, user_id: UserId) -> HistoryTicket {
        self.next_ticket += 1;
        let ticket = HistoryTicket(self.next_ticket);
        self.messages.clear();
        self.pending.clear();
        self.selection = Some(Selection {
            user_id,
            ticket,
            phase: SelectionPhase::Loading,
        });
        ticket
    }

    fn current_selection(&mut self, ticket: HistoryTicket) -> Option<&mut Selection> {
        self.selection.as_mut().filter(|s| s.ticket == ticket)
    }

    /// Apply a history result. Returns `false` for a stale ticket.
    ///
    /// Messages that arrived over the realtime channel while loading are
    /// kept after the history unless the history already contains them.
    pub fn apply_history(&mut self, ticket: HistoryTicket, history: Vec<Message>) -> bool {
        let Some(selection) = self.current_selection(ticket) else {
            return false;
        };
        selection.phase = SelectionPhase::Ready;
        let user_id = selection.user_id.clone();

        let mut merged: Vec<Message> = Vec::with_capacity(history.len() + self.messages.len());
        let mut seen: HashSet<MessageId> = HashSet::new();
        for message in history {
            if message.conversation_id != user_id {
                continue;
            }
            if let MessageKey::Server(id) = &message.key {
                if !seen.insert(id.clone()) {
                    continue;
                }
            }
            merged.push(message);
        }
        for message in self.messages.drain(..) {
            if let MessageKey::Server(id) = &message.key {
                if seen.contains(id) {
                    continue;
                }
            }
            merged.push(message);
        }
        self.messages = merged;
        true
    }

    /// Record a failed history fetch. Returns `false` for a stale ticket.
    pub fn fail_history(&mut self, ticket: HistoryTicket, error: impl Into<String>) -> bool {
        let Some(selection) = self.current_selection(ticket) else {
            return false;
        };
        selection.phase = SelectionPhase::Failed;
        self.last_error = Some(error.into());
        true
    }

    /// Append a provisional admin message and build the command to send.
    ///
    /// Returns `None` without touching state when the text is blank, no
    /// conversation is active or the channel is not connected.
    pub fn prepare_send(
        &mut self,
        text: &str,
        sender_id: &UserId,
        now: DateTime<Utc>,
    ) -> Option<OutgoingMessage> {
        let text = text.trim();
        if text.is_empty() || !self.connection.is_connected() {
            return None;
        }
        let user_id = self.selection.as_ref()?.user_id.clone();

        let mut temp_id = TempId::generate();
        while self.pending.contains(&temp_id) {
            temp_id = TempId::generate();
        }

        self.messages.push(Message::provisional(
            temp_id.clone(),
            user_id.clone(),
            text,
            now,
        ));
        self.pending.insert(temp_id.clone());

        Some(OutgoingMessage {
            user_id,
            sender_id: sender_id.clone(),
            sender_role: SenderRole::Admin,
            message_text: text.to_owned(),
            temp_id,
        })
    }

    /// Undo a provisional send whose command could not be emitted.
    pub fn rollback_send(&mut self, temp_id: &TempId) {
        self.pending.remove(temp_id);
        self.messages
            .retain(|m| !matches!(&m.key, MessageKey::Provisional(id) if id == temp_id));
    }

    /// Apply an inbound `receiveMessage` event.
    pub fn apply_incoming(&mut self, incoming: &IncomingMessage, now: DateTime<Utc>) -> Reconciliation {
        if self.active_conversation() != Some(&incoming.user_id) {
            return Reconciliation::OtherConversation;
        }
        let Some(confirmed) = incoming.to_message(now) else {
            log::warn!(
                "ignoring message without id in conversation {}",
                incoming.user_id
            );
            return Reconciliation::MissingId;
        };
        let already_present = self
            .messages
            .iter()
            .any(|m| m.server_id() == confirmed.server_id());

        if incoming.sender_role == SenderRole::Admin {
            if let Some(temp_id) = &incoming.temp_id {
                if self.pending.remove(temp_id) {
                    let slot = self
                        .messages
                        .iter()
                        .position(|m| matches!(&m.key, MessageKey::Provisional(id) if id == temp_id));
                    if let Some(index) = slot {
                        if already_present {
                            // History already delivered the persisted copy.
                            self.messages.remove(index);
                            return Reconciliation::Duplicate;
                        }
                        self.messages[index] = confirmed;
                        return Reconciliation::Confirmed { index };
                    }
                }
            }
        }

        if already_present {
            return Reconciliation::Duplicate;
        }
        self.messages.push(confirmed);
        Reconciliation::Appended
    }

    pub fn set_connection(&mut self, state: ConnectionState) {
        if let ConnectionState::Failed(reason) = &state {
            self.last_error = Some(reason.clone());
        }
        self.connection = state;
    }

    pub fn record_error(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
    }

    pub fn dismiss_error(&mut self) {
        self.last_error = None;
    }

    /// Flag the session as rejected by the backend. Returns `true` the first
    /// time.
    pub fn expire_session(&mut self) -> bool {
        !std::mem::replace(&mut self.session_expired, true)
    }

    /// Drop the selection and connection state. The conversation list stays.
    pub fn reset(&mut self) {
        self.selection = None;
        self.messages.clear();
        self.pending.clear();
        self.connection = ConnectionState::Disconnected;
    }

    /// Owned copy of the observable state, for rendering.
    pub fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot {
            conversations: self.conversations.clone(),
            active_conversation: self.active_conversation().cloned(),
            phase: self.phase(),
            messages: self.messages.clone(),
            connection: self.connection.clone(),
            last_error: self.last_error.clone(),
            session_expired: self.session_expired,
        }
    }
}

/// Observable chat state at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatSnapshot {
    pub conversations: Vec<Conversation>,
    pub active_conversation: Option<UserId>,
    pub phase: SelectionPhase,
    pub messages: Vec<Message>,
    pub connection: ConnectionState,
    pub last_error: Option<String>,
    pub session_expired: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_714_557_600 + secs, 0).unwrap()
    }

    fn server_msg(id: i64, user: i64, sender: SenderRole, text: &str) -> Message {
        Message {
            key: MessageKey::Server(MessageId::from(id)),
            conversation_id: UserId::from(user),
            sender,
            text: text.into(),
            attachment_url: None,
            timestamp: at(id),
        }
    }

    fn incoming(id: Option<i64>, user: i64, sender: SenderRole, text: &str) -> IncomingMessage {
        IncomingMessage {
            id: id.map(MessageId::from),
            user_id: UserId::from(user),
            sender_role: sender,
            message_text: text.into(),
            image_url: None,
            timestamp: Some(at(100)),
            temp_id: None,
        }
    }

    fn echo(id: i64, user: i64, text: &str, temp_id: &TempId) -> IncomingMessage {
        IncomingMessage {
            temp_id: Some(temp_id.clone()),
            ..incoming(Some(id), user, SenderRole::Admin, text)
        }
    }

    fn ready(user: i64, history: Vec<Message>) -> ChatState {
        let mut state = ChatState::new();
        state.set_connection(ConnectionState::Connected);
        let ticket = state.begin_select(UserId::from(user));
        assert!(state.apply_history(ticket, history));
        state
    }

    fn keys(state: &ChatState) -> Vec<String> {
        state.messages().iter().map(|m| m.key.to_string()).collect()
    }

    fn assert_unique_keys(state: &ChatState) {
        let unique: HashSet<&MessageKey> = state.messages().iter().map(|m| &m.key).collect();
        assert_eq!(unique.len(), state.messages().len());
    }

    #[test]
    fn test_select_loads_history() {
        let mut state = ChatState::new();
        assert_eq!(state.phase(), SelectionPhase::NoneSelected);

        let ticket = state.begin_select(UserId::from(7));
        assert_eq!(state.phase(), SelectionPhase::Loading);
        assert!(state.messages().is_empty());

        let applied = state.apply_history(ticket, vec![server_msg(101, 7, SenderRole::User, "hi")]);
        assert!(applied);
        assert_eq!(state.phase(), SelectionPhase::Ready);
        assert_eq!(state.messages().len(), 1);
        assert_eq!(state.messages()[0].sender, SenderRole::User);
        assert_eq!(state.messages()[0].text, "hi");
        assert!(!state.messages()[0].is_provisional());
    }

    #[test]
    fn test_send_then_echo_replaces_provisional() {
        let mut state = ready(7, vec![]);
        let out = state.prepare_send("hello", &UserId::from(1), at(0)).unwrap();

        assert_eq!(out.user_id, UserId::from(7));
        assert_eq!(out.sender_id, UserId::from(1));
        assert_eq!(out.message_text, "hello");
        assert_eq!(state.messages().len(), 1);
        assert!(state.messages()[0].is_provisional());
        assert_eq!(state.messages()[0].sender, SenderRole::Admin);
        assert_eq!(state.pending_count(), 1);

        let outcome = state.apply_incoming(&echo(202, 7, "hello", &out.temp_id), at(1));
        assert_eq!(outcome, Reconciliation::Confirmed { index: 0 });
        assert_eq!(state.messages().len(), 1);
        assert_eq!(state.messages()[0].server_id(), Some(&MessageId::from(202)));
        assert!(!state.messages()[0].is_provisional());
        assert_eq!(state.messages()[0].timestamp, at(100));
        assert_eq!(state.pending_count(), 0);
    }

    #[test]
    fn test_reconciliation_is_idempotent() {
        let mut state = ready(7, vec![]);
        let out = state.prepare_send("hello", &UserId::from(1), at(0)).unwrap();
        let event = echo(202, 7, "hello", &out.temp_id);

        state.apply_incoming(&event, at(1));
        let once = state.messages().to_vec();
        assert_eq!(state.apply_incoming(&event, at(2)), Reconciliation::Duplicate);
        assert_eq!(state.messages(), once.as_slice());

        let user_event = incoming(Some(303), 7, SenderRole::User, "thanks");
        assert_eq!(state.apply_incoming(&user_event, at(3)), Reconciliation::Appended);
        assert_eq!(state.apply_incoming(&user_event, at(4)), Reconciliation::Duplicate);
        assert_eq!(keys(&state), vec!["202", "303"]);
        assert_unique_keys(&state);
    }

    #[test]
    fn test_provisional_replacement_preserves_order() {
        let mut state = ready(
            7,
            vec![
                server_msg(1, 7, SenderRole::User, "a"),
                server_msg(2, 7, SenderRole::Admin, "b"),
            ],
        );
        let out = state.prepare_send("c", &UserId::from(1), at(5)).unwrap();

        // Another message lands before the echo.
        state.apply_incoming(&incoming(Some(3), 7, SenderRole::User, "d"), at(6));
        let outcome = state.apply_incoming(&echo(4, 7, "c", &out.temp_id), at(7));

        assert_eq!(outcome, Reconciliation::Confirmed { index: 2 });
        assert_eq!(keys(&state), vec!["1", "2", "4", "3"]);
        assert_unique_keys(&state);
    }

    #[test]
    fn test_other_conversation_is_isolated() {
        let mut state = ready(7, vec![server_msg(1, 7, SenderRole::User, "a")]);
        let before = state.messages().to_vec();

        let outcome = state.apply_incoming(&incoming(Some(9), 8, SenderRole::User, "x"), at(1));
        assert_eq!(outcome, Reconciliation::OtherConversation);
        assert_eq!(state.messages(), before.as_slice());

        let mut idle = ChatState::new();
        assert_eq!(
            idle.apply_incoming(&incoming(Some(9), 8, SenderRole::User, "x"), at(1)),
            Reconciliation::OtherConversation
        );
        assert!(idle.messages().is_empty());
    }

    #[test]
    fn test_stale_history_is_discarded() {
        let mut state = ChatState::new();
        let first = state.begin_select(UserId::from(7));
        let second = state.begin_select(UserId::from(8));
        assert!(first < second);

        assert!(state.apply_history(second, vec![server_msg(20, 8, SenderRole::User, "b")]));
        assert!(!state.apply_history(first, vec![server_msg(10, 7, SenderRole::User, "a")]));
        assert!(!state.fail_history(first, "boom"));

        assert_eq!(state.active_conversation(), Some(&UserId::from(8)));
        assert_eq!(keys(&state), vec!["20"]);
        assert_eq!(state.phase(), SelectionPhase::Ready);
        assert_eq!(state.last_error(), None);
    }

    #[test]
    fn test_history_failure_for_current_ticket() {
        let mut state = ChatState::new();
        let ticket = state.begin_select(UserId::from(7));

        assert!(state.fail_history(ticket, "server error"));
        assert_eq!(state.phase(), SelectionPhase::Failed);
        assert!(state.messages().is_empty());
        assert_eq!(state.last_error(), Some("server error"));

        state.dismiss_error();
        assert_eq!(state.last_error(), None);
    }

    #[test]
    fn test_history_merges_messages_received_while_loading() {
        let mut state = ChatState::new();
        state.set_connection(ConnectionState::Connected);
        let ticket = state.begin_select(UserId::from(7));

        state.apply_incoming(&incoming(Some(2), 7, SenderRole::User, "b"), at(1));
        state.apply_incoming(&incoming(Some(3), 7, SenderRole::User, "c"), at(2));

        state.apply_history(
            ticket,
            vec![
                server_msg(1, 7, SenderRole::User, "a"),
                server_msg(2, 7, SenderRole::User, "b"),
            ],
        );
        assert_eq!(keys(&state), vec!["1", "2", "3"]);
        assert_unique_keys(&state);
    }

    #[test]
    fn test_echo_after_history_contains_it() {
        let mut state = ChatState::new();
        state.set_connection(ConnectionState::Connected);
        let ticket = state.begin_select(UserId::from(7));
        let out = state.prepare_send("hello", &UserId::from(1), at(0)).unwrap();

        // Persisted before the history query ran.
        state.apply_history(ticket, vec![server_msg(202, 7, SenderRole::Admin, "hello")]);
        assert_eq!(state.messages().len(), 2);

        let outcome = state.apply_incoming(&echo(202, 7, "hello", &out.temp_id), at(1));
        assert_eq!(outcome, Reconciliation::Duplicate);
        assert_eq!(keys(&state), vec!["202"]);
        assert_eq!(state.pending_count(), 0);
    }

    #[test]
    fn test_message_without_id_is_ignored() {
        let mut state = ready(7, vec![]);
        let outcome = state.apply_incoming(&incoming(None, 7, SenderRole::User, "?"), at(1));
        assert_eq!(outcome, Reconciliation::MissingId);
        assert!(!outcome.changed());
        assert!(state.messages().is_empty());
    }

    #[test]
    fn test_user_message_with_unknown_temp_id_appends() {
        let mut state = ready(7, vec![]);
        let out = state.prepare_send("hello", &UserId::from(1), at(0)).unwrap();

        // Only admin echoes may confirm a provisional message.
        let spoof = IncomingMessage {
            temp_id: Some(out.temp_id.clone()),
            ..incoming(Some(5), 7, SenderRole::User, "hello")
        };
        assert_eq!(state.apply_incoming(&spoof, at(1)), Reconciliation::Appended);
        assert_eq!(state.messages().len(), 2);
        assert!(state.messages()[0].is_provisional());
        assert_eq!(state.pending_count(), 1);
    }

    #[test]
    fn test_send_preconditions() {
        let mut state = ChatState::new();
        state.set_connection(ConnectionState::Connected);
        assert_eq!(state.prepare_send("hello", &UserId::from(1), at(0)), None);

        let mut state = ready(7, vec![]);
        assert_eq!(state.prepare_send("", &UserId::from(1), at(0)), None);
        assert_eq!(state.prepare_send("   \n", &UserId::from(1), at(0)), None);
        assert!(state.messages().is_empty());

        state.set_connection(ConnectionState::Disconnected);
        assert_eq!(state.prepare_send("hello", &UserId::from(1), at(0)), None);
        assert!(state.messages().is_empty());
        assert_eq!(state.pending_count(), 0);
    }

    #[test]
    fn test_send_trims_text_and_rolls_back() {
        let mut state = ready(7, vec![]);
        let out = state.prepare_send("  hi  ", &UserId::from(1), at(0)).unwrap();
        assert_eq!(out.message_text, "hi");
        assert_eq!(state.messages()[0].text, "hi");

        state.rollback_send(&out.temp_id);
        assert!(state.messages().is_empty());
        assert_eq!(state.pending_count(), 0);
    }

    #[test]
    fn test_conversation_refresh_keeps_latest_generation() {
        let conv = |id: i64, name: &str| Conversation {
            user_id: UserId::from(id),
            display_name: name.into(),
            has_unread: true,
        };
        let mut state = ChatState::new();
        let first = state.begin_refresh();
        let second = state.begin_refresh();

        assert!(state.apply_conversations(second, vec![conv(7, "alice"), conv(8, "bob")]));
        assert!(!state.is_refresh_current(first));
        assert!(!state.apply_conversations(first, vec![conv(7, "alice")]));
        assert_eq!(state.conversations().len(), 2);
    }

    #[test]
    fn test_reset_and_session_expiry() {
        let mut state = ready(7, vec![server_msg(1, 7, SenderRole::User, "a")]);
        let generation = state.begin_refresh();
        state.apply_conversations(
            generation,
            vec![Conversation {
                user_id: UserId::from(7),
                display_name: "alice".into(),
                has_unread: false,
            }],
        );

        assert!(state.expire_session());
        assert!(!state.expire_session());

        state.reset();
        state.reset();
        let snapshot = state.snapshot();
        assert_eq!(snapshot.phase, SelectionPhase::NoneSelected);
        assert_eq!(snapshot.connection, ConnectionState::Disconnected);
        assert!(snapshot.messages.is_empty());
        assert_eq!(snapshot.conversations.len(), 1);
        assert!(snapshot.session_expired);
    }

    #[test]
    fn test_connection_failure_is_reported() {
        let mut state = ChatState::new();
        state.set_connection(ConnectionState::Connecting);
        state.set_connection(ConnectionState::Failed("refused".into()));
        assert_eq!(state.last_error(), Some("refused"));
        assert!(!state.connection().is_connected());
    }
}
