//! Outbound delivery loop.
//!
//! Drains the outbound bus into a `ChatGateway`. A failed delivery is logged
//! and dropped; the loop keeps going until the channel closes.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use medsnap_core::{ChatGateway, MedsnapError, OutboundMessage};
use medsnap_logging::redact_sensitive_data;

/// Deliver messages in order until every sender is dropped. Returns the
/// number of messages that failed to deliver.
pub async fn deliver_outbound(
    gateway: Arc<dyn ChatGateway>,
    mut outbound_rx: mpsc::Receiver<OutboundMessage>,
) -> usize {
    info!(gateway = gateway.name(), "Outbound delivery started");
    let mut failures = 0;

    while let Some(msg) = outbound_rx.recv().await {
        let result = match &msg {
            OutboundMessage::SendText {
                chat_id,
                text,
                buttons,
            } => gateway.send_text(*chat_id, text, buttons).await,
            OutboundMessage::EditMessage { message, text } => {
                gateway.edit_message(*message, text).await
            }
            OutboundMessage::AnswerCallback { callback_id } => {
                gateway.answer_callback(callback_id).await
            }
        };

        match result {
            Ok(()) => debug!(gateway = gateway.name(), "Delivered outbound message"),
            Err(e) => {
                failures += 1;
                let err = delivery_error(&msg, &e);
                warn!(
                    gateway = gateway.name(),
                    error = %redact_sensitive_data(&err.to_string()),
                    "Outbound delivery failed, dropping message"
                );
            }
        }
    }

    info!(failures, "Outbound channel closed, delivery stopped");
    failures
}

fn delivery_error(msg: &OutboundMessage, err: &anyhow::Error) -> MedsnapError {
    let target = match msg {
        OutboundMessage::SendText { chat_id, .. } => format!("send to chat {chat_id}"),
        OutboundMessage::EditMessage { message, .. } => format!(
            "edit of message {} in chat {}",
            message.message_id, message.chat_id
        ),
        OutboundMessage::AnswerCallback { callback_id } => format!("answer to callback {callback_id}"),
    };
    MedsnapError::DeliveryFailed(format!("{target}: {err:#}"))
}
