use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier of a chat (one end user or channel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stable reference to a message already delivered to a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: i32,
}

/// The two affordances offered after text extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonAction {
    Confirm,
    Retry,
}

impl ButtonAction {
    /// Callback payload attached to the inline button.
    pub fn callback_data(&self) -> &'static str {
        match self {
            ButtonAction::Confirm => "confirm_med",
            ButtonAction::Retry => "retry_med",
        }
    }

    /// Parse a callback payload; unknown payloads yield `None`.
    pub fn from_callback_data(data: &str) -> Option<Self> {
        match data {
            "confirm_med" => Some(ButtonAction::Confirm),
            "retry_med" => Some(ButtonAction::Retry),
            _ => None,
        }
    }

    /// Label rendered on the button.
    pub fn label(&self) -> &'static str {
        match self {
            ButtonAction::Confirm => "✅ Confirm",
            ButtonAction::Retry => "❌ Retry",
        }
    }
}

impl fmt::Display for ButtonAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ButtonAction::Confirm => write!(f, "confirm"),
            ButtonAction::Retry => write!(f, "retry"),
        }
    }
}

/// Where a chat is in the photo → confirm → advice cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    #[default]
    AwaitingImage,
    AwaitingConfirmation,
}

/// Per-chat conversational state.
///
/// A chat with no stored session is treated as `ConversationSession::default()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSession {
    pub state: ConversationState,
    pub pending_extracted_text: Option<String>,
}

impl ConversationSession {
    /// Session holding freshly extracted text awaiting the user's verdict.
    pub fn awaiting_confirmation(text: impl Into<String>) -> Self {
        Self {
            state: ConversationState::AwaitingConfirmation,
            pending_extracted_text: Some(text.into()),
        }
    }

    /// Return to the initial state, handing back any pending text.
    pub fn reset(&mut self) -> Option<String> {
        self.state = ConversationState::AwaitingImage;
        self.pending_extracted_text.take()
    }
}

/// A one-shot reminder waiting to be delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderJob {
    pub job_id: Uuid,
    pub chat_id: ChatId,
    pub label: String,
    pub fire_at: DateTime<Utc>,
}

impl ReminderJob {
    pub fn new(chat_id: ChatId, label: impl Into<String>, fire_at: DateTime<Utc>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            chat_id,
            label: label.into(),
            fire_at,
        }
    }
}

/// Confirmed medication text to look up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdviceRequest {
    pub medication_text: String,
}

impl AdviceRequest {
    pub fn new(medication_text: impl Into<String>) -> Self {
        Self {
            medication_text: medication_text.into(),
        }
    }
}

/// Outcome of an advice lookup, as seen by the conversation engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdviceResult {
    Advice(String),
    Failed { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_data_roundtrips_known_actions() {
        for action in [ButtonAction::Confirm, ButtonAction::Retry] {
            assert_eq!(ButtonAction::from_callback_data(action.callback_data()), Some(action));
        }
        assert_eq!(ButtonAction::from_callback_data("something_else"), None);
    }

    #[test]
    fn default_session_awaits_image() {
        let session = ConversationSession::default();
        assert_eq!(session.state, ConversationState::AwaitingImage);
        assert!(session.pending_extracted_text.is_none());
    }

    #[test]
    fn reset_returns_pending_text() {
        let mut session = ConversationSession::awaiting_confirmation("Aspirin 100mg");
        assert_eq!(session.reset().as_deref(), Some("Aspirin 100mg"));
        assert_eq!(session, ConversationSession::default());
    }

    #[test]
    fn reminder_jobs_get_distinct_ids() {
        let at = Utc::now();
        let a = ReminderJob::new(ChatId(1), "Aspirin", at);
        let b = ReminderJob::new(ChatId(1), "Aspirin", at);
        assert_ne!(a.job_id, b.job_id);
    }
}
