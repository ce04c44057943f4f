//! Conversation Event Logger
//!
//! Audit events (text extracted, confirmed, reminder fired, ...) written
//! through `tracing` under the `conversation_events` target.

use medsnap_core::{ChatId, Event, EventKind};
use tracing::info;

use crate::redact::redact_sensitive_data;

pub struct EventLogger;

impl EventLogger {
    /// Log an event after scrubbing secrets from its payload.
    pub fn log_event(event: &Event) {
        let payload = redact_sensitive_data(&event.payload.to_string());
        info!(
            target: "conversation_events",
            event_id = %event.id,
            chat_id = %event.chat_id,
            kind = %event.kind,
            timestamp = %event.timestamp.to_rfc3339(),
            payload = %payload,
            "Conversation event"
        );
    }

    /// Build and log an event in one step.
    pub fn record(chat_id: ChatId, kind: EventKind, payload: serde_json::Value) -> Event {
        let event = Event::new(chat_id, kind, payload);
        Self::log_event(&event);
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_returns_logged_event() {
        let event = EventLogger::record(
            ChatId(5),
            EventKind::ReminderScheduled,
            serde_json::json!({"label": "Aspirin"}),
        );
        assert_eq!(event.chat_id, ChatId(5));
        assert_eq!(event.kind, EventKind::ReminderScheduled);
    }
}
