//! Keyed store of per-chat conversation sessions.
//!
//! Every method takes the lock once, so each read-modify-write on a chat's
//! session is atomic. A chat with no entry is in the initial state.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use medsnap_core::{ChatId, ConversationSession, ConversationState};

#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<ChatId, ConversationSession>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the chat's session.
    pub async fn get(&self, chat_id: ChatId) -> ConversationSession {
        let r = self.sessions.read().await;
        r.get(&chat_id).cloned().unwrap_or_default()
    }

    pub async fn state(&self, chat_id: ChatId) -> ConversationState {
        let r = self.sessions.read().await;
        r.get(&chat_id).map(|s| s.state).unwrap_or_default()
    }

    /// Return the chat to `AwaitingImage`, handing back any discarded text.
    pub async fn reset(&self, chat_id: ChatId) -> Option<String> {
        let mut w = self.sessions.write().await;
        w.get_mut(&chat_id).and_then(ConversationSession::reset)
    }

    /// Record freshly extracted text and wait for the user's verdict.
    pub async fn await_confirmation(&self, chat_id: ChatId, text: impl Into<String>) {
        let mut w = self.sessions.write().await;
        w.insert(chat_id, ConversationSession::awaiting_confirmation(text));
    }

    /// If the chat is awaiting confirmation, reset it and return the session
    /// as it was. Otherwise leave it untouched and return `None`.
    pub async fn take_if_awaiting(&self, chat_id: ChatId) -> Option<ConversationSession> {
        let mut w = self.sessions.write().await;
        let session = w.get_mut(&chat_id)?;
        if session.state != ConversationState::AwaitingConfirmation {
            return None;
        }
        Some(std::mem::take(session))
    }

    /// Number of chats seen so far.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
