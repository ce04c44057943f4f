//! Conversation state machine.
//!
//! One `ConversationEngine` serves every chat. Callers must not hand it two
//! events for the same chat concurrently; `ChatDispatcher` guarantees that.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use medsnap_core::{
    AdviceProvider, AdviceRequest, AdviceResult, ButtonAction, ChatId, EventKind, InboundEvent,
    MedsnapError, MessageRef, MimeHint, OutboundMessage, TextExtractor,
};
use medsnap_logging::EventLogger;
use medsnap_scheduler::ReminderScheduler;

use crate::replies;
use crate::session_store::SessionStore;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on a single advice lookup.
    pub advice_timeout: Duration,
    /// How long a per-chat worker lingers without events before exiting.
    pub worker_idle: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            advice_timeout: Duration::from_secs(60),
            worker_idle: Duration::from_secs(300),
        }
    }
}

pub struct ConversationEngine {
    sessions: SessionStore,
    extractor: Arc<dyn TextExtractor>,
    advisor: Arc<dyn AdviceProvider>,
    reminders: ReminderScheduler,
    outbound_tx: mpsc::Sender<OutboundMessage>,
    config: EngineConfig,
}

impl ConversationEngine {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        advisor: Arc<dyn AdviceProvider>,
        reminders: ReminderScheduler,
        outbound_tx: mpsc::Sender<OutboundMessage>,
        config: EngineConfig,
    ) -> Self {
        Self {
            sessions: SessionStore::new(),
            extractor,
            advisor,
            reminders,
            outbound_tx,
            config,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Apply one inbound event to its chat's session.
    ///
    /// Only fails when the outbound channel is gone.
    #[instrument(skip_all, fields(chat_id = %event.chat_id(), kind = event.kind()))]
    pub async fn handle(&self, event: InboundEvent) -> Result<()> {
        match event {
            InboundEvent::ImageMessage {
                chat_id,
                image_bytes,
                mime_hint,
            } => self.on_image(chat_id, &image_bytes, &mime_hint).await,
            InboundEvent::ButtonPress {
                chat_id,
                action,
                message,
                callback_id,
            } => {
                if let Some(id) = callback_id {
                    self.emit(OutboundMessage::AnswerCallback { callback_id: id })
                        .await?;
                }
                match action {
                    ButtonAction::Confirm => self.on_confirm(chat_id, message).await,
                    ButtonAction::Retry => self.on_retry(chat_id, message).await,
                }
            }
            InboundEvent::StartCommand { chat_id } => self.on_start(chat_id).await,
        }
    }

    async fn on_start(&self, chat_id: ChatId) -> Result<()> {
        self.sessions.reset(chat_id).await;
        info!(chat_id = %chat_id, "Session started");
        self.send(chat_id, replies::greeting(&Local::now())).await
    }

    async fn on_image(&self, chat_id: ChatId, bytes: &[u8], mime_hint: &MimeHint) -> Result<()> {
        if !mime_hint.is_supported_image() {
            EventLogger::record(chat_id, EventKind::ImageRejected, json!({ "mime_hint": mime_hint }));
            return self.send(chat_id, replies::UNSUPPORTED_ATTACHMENT).await;
        }

        if let Some(discarded) = self.sessions.reset(chat_id).await {
            debug!(chat_id = %chat_id, discarded_len = discarded.len(), "New image replaces pending text");
        }
        EventLogger::record(
            chat_id,
            EventKind::ImageReceived,
            json!({ "bytes": bytes.len(), "mime_hint": mime_hint }),
        );

        match self.extractor.extract_text(bytes).await {
            Ok(raw) => {
                let text = raw.trim();
                if text.is_empty() {
                    EventLogger::record(chat_id, EventKind::NoTextFound, json!({}));
                    return self.send(chat_id, replies::NO_TEXT_FOUND).await;
                }

                self.sessions.await_confirmation(chat_id, text).await;
                EventLogger::record(chat_id, EventKind::TextExtracted, json!({ "text": text }));
                self.emit(OutboundMessage::with_buttons(
                    chat_id,
                    replies::extracted_text(text),
                    vec![ButtonAction::Confirm.into(), ButtonAction::Retry.into()],
                ))
                .await
            }
            Err(e) if e.is_input_error() => {
                warn!(chat_id = %chat_id, error = %e, "Image rejected");
                EventLogger::record(chat_id, EventKind::ExtractionFailed, json!({ "error": e.to_string() }));
                self.send(chat_id, replies::COULD_NOT_LOAD_IMAGE).await
            }
            Err(e) => {
                error!(chat_id = %chat_id, error = %e, "Text recognition failed");
                EventLogger::record(chat_id, EventKind::ExtractionFailed, json!({ "error": e.to_string() }));
                self.send(chat_id, replies::RECOGNITION_FAILED).await
            }
        }
    }

    async fn on_confirm(&self, chat_id: ChatId, message: Option<MessageRef>) -> Result<()> {
        let Some(session) = self.sessions.take_if_awaiting(chat_id).await else {
            return self.stale_press(chat_id, ButtonAction::Confirm);
        };
        let text = session
            .pending_extracted_text
            .unwrap_or_else(|| replies::UNKNOWN_MEDICATION.to_string());
        EventLogger::record(chat_id, EventKind::Confirmed, json!({ "text": text }));

        self.reply_or_edit(chat_id, message, replies::confirmed(&text))
            .await?;

        match self.fetch_advice(&text).await {
            AdviceResult::Advice(advice) => {
                EventLogger::record(
                    chat_id,
                    EventKind::AdviceDelivered,
                    json!({ "provider": self.advisor.name(), "chars": advice.len() }),
                );
                self.send(chat_id, advice).await?;
            }
            AdviceResult::Failed { reason } => {
                warn!(chat_id = %chat_id, provider = %self.advisor.name(), reason = %reason, "Advice lookup failed");
                EventLogger::record(chat_id, EventKind::AdviceFailed, json!({ "reason": reason }));
                self.send(chat_id, replies::ADVICE_ERROR).await?;
            }
        }

        let job = self.reminders.schedule(chat_id, &text);
        EventLogger::record(
            chat_id,
            EventKind::ReminderScheduled,
            json!({ "job_id": job.job_id.to_string(), "fire_at": job.fire_at.to_rfc3339() }),
        );
        self.send(chat_id, replies::reminder_set(self.reminders.daily_time()))
            .await
    }

    async fn on_retry(&self, chat_id: ChatId, message: Option<MessageRef>) -> Result<()> {
        if self.sessions.take_if_awaiting(chat_id).await.is_none() {
            return self.stale_press(chat_id, ButtonAction::Retry);
        }
        EventLogger::record(chat_id, EventKind::Retried, json!({}));
        self.reply_or_edit(chat_id, message, replies::SEND_ANOTHER_IMAGE)
            .await
    }

    fn stale_press(&self, chat_id: ChatId, action: ButtonAction) -> Result<()> {
        debug!(chat_id = %chat_id, action = %action, "Button pressed outside confirmation");
        EventLogger::record(chat_id, EventKind::StaleButton, json!({ "action": action }));
        Ok(())
    }

    async fn fetch_advice(&self, text: &str) -> AdviceResult {
        let request = AdviceRequest::new(text);
        let timeout = self.config.advice_timeout;
        match tokio::time::timeout(timeout, self.advisor.get_advice(&request)).await {
            Ok(Ok(advice)) => AdviceResult::Advice(advice),
            Ok(Err(e)) => AdviceResult::Failed {
                reason: format!("{e:#}"),
            },
            Err(_) => AdviceResult::Failed {
                reason: MedsnapError::AdviceTimeout(timeout.as_secs()).to_string(),
            },
        }
    }

    async fn reply_or_edit(
        &self,
        chat_id: ChatId,
        message: Option<MessageRef>,
        text: impl Into<String>,
    ) -> Result<()> {
        let msg = match message {
            Some(message) => OutboundMessage::EditMessage {
                message,
                text: text.into(),
            },
            None => OutboundMessage::text(chat_id, text),
        };
        self.emit(msg).await
    }

    async fn send(&self, chat_id: ChatId, text: impl Into<String>) -> Result<()> {
        self.emit(OutboundMessage::text(chat_id, text)).await
    }

    async fn emit(&self, msg: OutboundMessage) -> Result<()> {
        self.outbound_tx
            .send(msg)
            .await
            .map_err(|_| MedsnapError::ChannelClosed("outbound".to_string()))?;
        Ok(())
    }
}
