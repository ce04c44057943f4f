use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::ChatId;

/// An immutable audit record of something that happened in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub chat_id: ChatId,
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    pub payload: serde_json::Value,
}

/// Categories of events that can occur during a conversation cycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// An attachment arrived
    ImageReceived,
    /// The attachment was not a usable image
    ImageRejected,
    /// OCR produced non-empty text
    TextExtracted,
    /// OCR ran but found nothing readable
    NoTextFound,
    /// OCR or decoding failed
    ExtractionFailed,
    /// The user confirmed the extracted text
    Confirmed,
    /// The user asked to retry
    Retried,
    /// A button was pressed outside the confirmation step
    StaleButton,
    /// Advice was delivered
    AdviceDelivered,
    /// Advice lookup failed or timed out
    AdviceFailed,
    /// A reminder was queued
    ReminderScheduled,
    /// A reminder was delivered
    ReminderFired,
}

impl Event {
    pub fn new(chat_id: ChatId, kind: EventKind, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            chat_id,
            timestamp: Utc::now(),
            kind,
            payload,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_else(|| format!("{:?}", self));
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = Event::new(
            ChatId(99),
            EventKind::TextExtracted,
            serde_json::json!({"chars": 17}),
        );
        assert_eq!(event.chat_id, ChatId(99));
        assert_eq!(event.kind, EventKind::TextExtracted);
        assert_eq!(event.payload["chars"], 17);
    }

    #[test]
    fn test_event_kind_display() {
        assert_eq!(EventKind::ReminderFired.to_string(), "reminder_fired");
        assert_eq!(EventKind::NoTextFound.to_string(), "no_text_found");
    }
}
