//! Async driver for [`ChatState`].

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;

use super::{
    state::{ChatState, HistoryTicket, Reconciliation},
    ChatDirectory, Session,
};
use crate::{
    error::{Error, Result},
    models::{Conversation, Message, TempId, UserId},
    realtime::{ConnectionState, InboundEvent, OutboundCommand, RealtimeChannel},
};

/// What changed after one step of the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatUpdate {
    /// The conversation list was replaced.
    Conversations,
    /// History of the active conversation was applied.
    HistoryLoaded(UserId),
    /// An inbound message was processed.
    Message(Reconciliation),
    /// An unread signal arrived and a refresh was issued.
    RefreshRequested,
    /// The realtime connection changed state.
    Connection(ConnectionState),
    /// A fetch failed; the message is also kept as `last_error`.
    Failed(String),
    /// The backend rejected the session credentials.
    SessionExpired,
    /// A superseded fetch completed and was discarded.
    Stale,
}

/// Result of a background fetch.
enum Completion {
    Conversations {
        generation: u64,
        result: Result<Vec<Conversation>>,
    },
    History {
        ticket: HistoryTicket,
        user_id: UserId,
        result: Result<Vec<Message>>,
    },
}

/// Chat session controller.
///
/// Owns the chat state and is driven from a single task: operations mutate
/// state directly, background fetches report back through an internal queue
/// and are applied by [`next_update`](Self::next_update) together with
/// realtime events.
pub struct ChatController<D, R> {
    state: ChatState,
    directory: Arc<D>,
    channel: R,
    session: Session,
    events: Option<mpsc::Receiver<InboundEvent>>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    in_flight: usize,
}

impl<D, R> std::fmt::Debug for ChatController<D, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatController")
            .field("session", &self.session)
            .field("state", &self.state)
            .field("in_flight", &self.in_flight)
            .finish()
    }
}

impl<D, R> ChatController<D, R>
where
    D: ChatDirectory + 'static,
    R: RealtimeChannel,
{
    pub fn new(directory: Arc<D>, channel: R, session: Session) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            state: ChatState::new(),
            directory,
            channel,
            session,
            events: None,
            completions_tx,
            completions_rx,
            in_flight: 0,
        }
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Whether [`next_update`](Self::next_update) has nothing to wait for.
    pub fn is_idle(&self) -> bool {
        self.events.is_none() && self.in_flight == 0
    }

    pub fn dismiss_error(&mut self) {
        self.state.dismiss_error();
    }

    /// Open the realtime channel. `Connected` is reported later through
    /// [`next_update`](Self::next_update) once the server acknowledges.
    pub async fn connect(&mut self) -> Result<()> {
        if self.events.is_some() {
            return Ok(());
        }
        self.state.set_connection(ConnectionState::Connecting);
        match self.channel.connect().await {
            Ok(events) => {
                self.events = Some(events);
                Ok(())
            }
            Err(e) => {
                self.state
                    .set_connection(ConnectionState::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Fetch the conversation list and replace it wholesale.
    pub async fn load_conversations(&mut self) -> Result<Vec<Conversation>> {
        let generation = self.state.begin_refresh();
        match self.directory.conversations().await {
            Ok(list) => {
                self.state.apply_conversations(generation, list);
                Ok(self.state.conversations().to_vec())
            }
            Err(e) => {
                self.report(&e);
                Err(e)
            }
        }
    }

    /// Issue a background conversation refresh.
    pub fn refresh_conversations(&mut self) {
        let generation = self.state.begin_refresh();
        let directory = self.directory.clone();
        let tx = self.completions_tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let result = directory.conversations().await;
            let _ = tx.send(Completion::Conversations { generation, result });
        });
    }

    /// Make `user_id` the active conversation and fetch its history in the
    /// background.
    pub fn select_conversation(&mut self, user_id: impl Into<UserId>) -> HistoryTicket {
        let user_id = user_id.into();
        let ticket = self.state.begin_select(user_id.clone());
        log::debug!("selecting conversation {} ({:?})", user_id, ticket);

        let directory = self.directory.clone();
        let tx = self.completions_tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let result = directory.history(&user_id).await;
            let _ = tx.send(Completion::History {
                ticket,
                user_id,
                result,
            });
        });
        ticket
    }

    /// Send a message to the active conversation.
    ///
    /// Returns `Ok(None)` without side effects when the text is blank,
    /// nothing is selected or the channel is not connected.
    pub async fn send_message(&mut self, text: &str) -> Result<Option<TempId>> {
        let Some(outgoing) = self
            .state
            .prepare_send(text, self.session.admin_id(), Utc::now())
        else {
            return Ok(None);
        };
        let temp_id = outgoing.temp_id.clone();

        if let Err(e) = self.channel.emit(OutboundCommand::SendMessage(outgoing)).await {
            log::warn!("send failed: {}", e);
            self.state.rollback_send(&temp_id);
            self.state.record_error(e.to_string());
            return Err(e);
        }
        Ok(Some(temp_id))
    }

    /// Apply one realtime event.
    pub async fn handle_event(&mut self, event: InboundEvent) -> ChatUpdate {
        match event {
            InboundEvent::MessageReceived(incoming) => {
                ChatUpdate::Message(self.state.apply_incoming(&incoming, Utc::now()))
            }
            InboundEvent::UnreadChanged => {
                self.refresh_conversations();
                ChatUpdate::RefreshRequested
            }
            InboundEvent::ConnectionStateChanged(state) => {
                self.state.set_connection(state.clone());
                if state.is_connected() {
                    let admin_id = self.session.admin_id().clone();
                    if let Err(e) = self
                        .channel
                        .emit(OutboundCommand::IdentifyAdmin(admin_id))
                        .await
                    {
                        log::warn!("identifyAdmin failed: {}", e);
                    }
                }
                ChatUpdate::Connection(state)
            }
        }
    }

    /// Wait for the next realtime event or fetch completion and apply it.
    ///
    /// Returns `None` when there is nothing left to wait for: no open event
    /// stream and no fetch in flight.
    pub async fn next_update(&mut self) -> Option<ChatUpdate> {
        if self.is_idle() {
            return None;
        }

        tokio::select! {
            Some(done) = self.completions_rx.recv(), if self.in_flight > 0 => {
                self.in_flight -= 1;
                Some(self.apply_completion(done))
            }
            event = recv_event(&mut self.events), if self.events.is_some() => {
                match event {
                    Some(event) => Some(self.handle_event(event).await),
                    None => {
                        self.events = None;
                        let state = match self.state.connection() {
                            ConnectionState::Failed(reason) => ConnectionState::Failed(reason.clone()),
                            _ => ConnectionState::Disconnected,
                        };
                        self.state.set_connection(state.clone());
                        Some(ChatUpdate::Connection(state))
                    }
                }
            }
            else => None,
        }
    }

    /// Close the realtime channel and reset selection and connection state.
    /// Safe to call more than once.
    pub async fn teardown(&mut self) {
        self.channel.close().await;
        self.events = None;
        self.state.reset();
    }

    fn apply_completion(&mut self, done: Completion) -> ChatUpdate {
        match done {
            Completion::Conversations { generation, result } => match result {
                Ok(list) => {
                    if self.state.apply_conversations(generation, list) {
                        ChatUpdate::Conversations
                    } else {
                        ChatUpdate::Stale
                    }
                }
                Err(e) if e.is_auth_error() || self.state.is_refresh_current(generation) => {
                    self.report(&e)
                }
                Err(e) => {
                    log::debug!("ignoring failed stale conversation fetch: {}", e);
                    ChatUpdate::Stale
                }
            },
            Completion::History {
                ticket,
                user_id,
                result,
            } => match result {
                Ok(history) => {
                    if !self.state.apply_history(ticket, history) {
                        return ChatUpdate::Stale;
                    }
                    self.refresh_conversations();
                    ChatUpdate::HistoryLoaded(user_id)
                }
                Err(e) => {
                    if e.is_auth_error() {
                        self.state.fail_history(ticket, e.to_string());
                        return self.report(&e);
                    }
                    if self.state.fail_history(ticket, e.to_string()) {
                        log::warn!("history fetch for {} failed: {}", user_id, e);
                        ChatUpdate::Failed(e.to_string())
                    } else {
                        ChatUpdate::Stale
                    }
                }
            },
        }
    }

    fn report(&mut self, error: &Error) -> ChatUpdate {
        self.state.record_error(error.to_string());
        if error.is_auth_error() {
            if self.state.expire_session() {
                log::warn!("session rejected: {}", error);
                self.session.notify_unauthorized(error);
            }
            return ChatUpdate::SessionExpired;
        }
        ChatUpdate::Failed(error.to_string())
    }
}

async fn recv_event(events: &mut Option<mpsc::Receiver<InboundEvent>>) -> Option<InboundEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
