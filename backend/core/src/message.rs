use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::types::{ButtonAction, ChatId, MessageRef};

/// What the transport knows about an attachment before it is decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MimeHint {
    /// A native chat photo (always an image).
    Photo,
    /// A file sent as a document, with its declared MIME type if any.
    Document { mime_type: Option<String> },
    /// Any other attachment kind (video, audio, sticker, ...).
    Other { kind: String },
}

impl MimeHint {
    /// Whether the attachment is something the OCR pipeline accepts.
    pub fn is_supported_image(&self) -> bool {
        match self {
            MimeHint::Photo => true,
            MimeHint::Document { mime_type } => mime_type
                .as_deref()
                .is_some_and(|m| m.to_ascii_lowercase().starts_with("image/")),
            MimeHint::Other { .. } => false,
        }
    }
}

/// Events delivered by a chat gateway to the conversation engine.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    /// An attachment arrived. `image_bytes` is empty when the gateway skipped
    /// downloading an unsupported attachment.
    ImageMessage {
        chat_id: ChatId,
        image_bytes: Bytes,
        mime_hint: MimeHint,
    },
    /// An inline button was pressed.
    ButtonPress {
        chat_id: ChatId,
        action: ButtonAction,
        /// The message carrying the button, when the transport still knows it.
        message: Option<MessageRef>,
        /// Transport handle used to acknowledge the press.
        callback_id: Option<String>,
    },
    /// The user (re)started the conversation.
    StartCommand { chat_id: ChatId },
}

impl InboundEvent {
    pub fn chat_id(&self) -> ChatId {
        match self {
            InboundEvent::ImageMessage { chat_id, .. }
            | InboundEvent::ButtonPress { chat_id, .. }
            | InboundEvent::StartCommand { chat_id } => *chat_id,
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::ImageMessage { .. } => "image_message",
            InboundEvent::ButtonPress { .. } => "button_press",
            InboundEvent::StartCommand { .. } => "start_command",
        }
    }
}

/// An inline button attached to an outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub callback_data: String,
}

impl From<ButtonAction> for Button {
    fn from(action: ButtonAction) -> Self {
        Self {
            label: action.label().to_string(),
            callback_data: action.callback_data().to_string(),
        }
    }
}

/// Messages the engine and scheduler ask the gateway to deliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    SendText {
        chat_id: ChatId,
        text: String,
        buttons: Vec<Button>,
    },
    EditMessage {
        message: MessageRef,
        text: String,
    },
    AnswerCallback {
        callback_id: String,
    },
}

impl OutboundMessage {
    pub fn text(chat_id: ChatId, text: impl Into<String>) -> Self {
        OutboundMessage::SendText {
            chat_id,
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    pub fn with_buttons(chat_id: ChatId, text: impl Into<String>, buttons: Vec<Button>) -> Self {
        OutboundMessage::SendText {
            chat_id,
            text: text.into(),
            buttons,
        }
    }

    /// Text body, if the message carries one.
    pub fn body(&self) -> Option<&str> {
        match self {
            OutboundMessage::SendText { text, .. } | OutboundMessage::EditMessage { text, .. } => {
                Some(text)
            }
            OutboundMessage::AnswerCallback { .. } => None,
        }
    }
}
