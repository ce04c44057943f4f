use async_trait::async_trait;
use bytes::Bytes;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQuery, InlineKeyboardButton, InlineKeyboardMarkup, Message, MessageId, ParseMode,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use medsnap_core::{
    Button, ButtonAction, ChatGateway, ChatId as MedChatId, InboundEvent, MessageRef,
};
use medsnap_logging::redact_sensitive_data;

use crate::telegram_commands::BotCommand;
use crate::telegram_media::{attachment_of, download, Attachment};

/// Telegram's hard cap on message length, in UTF-16 code units; counting
/// chars keeps us under it for everything but astral-plane-heavy text.
pub const TELEGRAM_MAX_MESSAGE_CHARS: usize = 4096;

/// Long-polling Telegram transport.
pub struct TelegramGateway {
    bot: Bot,
    max_download_bytes: usize,
}

impl TelegramGateway {
    pub fn new(token: String, max_download_bytes: usize) -> Self {
        Self {
            bot: Bot::new(token),
            max_download_bytes,
        }
    }

    /// Poll Telegram and push inbound events until Ctrl-C.
    pub async fn start(&self, inbound_tx: mpsc::Sender<InboundEvent>) -> anyhow::Result<()> {
        info!("Starting Telegram long polling");

        let limits = DownloadLimit(self.max_download_bytes);
        let handler = dptree::entry()
            .branch(Update::filter_message().endpoint(on_message))
            .branch(Update::filter_callback_query().endpoint(on_callback));

        Dispatcher::builder(self.bot.clone(), handler)
            .dependencies(dptree::deps![inbound_tx, limits])
            .default_handler(|_| async {})
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        info!("Telegram polling stopped");
        Ok(())
    }

    /// Send with Markdown, retrying as plain text if Telegram rejects the markup.
    async fn send_chunk(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> anyhow::Result<()> {
        let mut req = self
            .bot
            .send_message(chat_id, text)
            .parse_mode(ParseMode::Markdown);
        if let Some(kb) = keyboard.clone() {
            req = req.reply_markup(kb);
        }
        if let Err(e) = req.await {
            warn!(chat_id = chat_id.0, error = %redact_sensitive_data(&e.to_string()), "Markdown send rejected, retrying as plain text");
            let mut plain = self.bot.send_message(chat_id, text);
            if let Some(kb) = keyboard {
                plain = plain.reply_markup(kb);
            }
            plain.await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ChatGateway for TelegramGateway {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send_text(&self, chat_id: MedChatId, text: &str, buttons: &[Button]) -> anyhow::Result<()> {
        let chat = ChatId(chat_id.0);
        let chunks = split_message(text, TELEGRAM_MAX_MESSAGE_CHARS);
        let last = chunks.len().saturating_sub(1);
        for (i, chunk) in chunks.iter().enumerate() {
            let markup = if i == last { keyboard(buttons) } else { None };
            self.send_chunk(chat, chunk, markup).await?;
        }
        Ok(())
    }

    async fn edit_message(&self, message: MessageRef, text: &str) -> anyhow::Result<()> {
        let chat = ChatId(message.chat_id.0);
        let id = MessageId(message.message_id);
        let res = self
            .bot
            .edit_message_text(chat, id, text)
            .parse_mode(ParseMode::Markdown)
            .await;
        if let Err(e) = res {
            warn!(chat_id = chat.0, error = %redact_sensitive_data(&e.to_string()), "Markdown edit rejected, retrying as plain text");
            self.bot.edit_message_text(chat, id, text).await?;
        }
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> anyhow::Result<()> {
        self.bot.answer_callback_query(callback_id.to_string()).await?;
        Ok(())
    }
}

#[derive(Clone, Copy)]
struct DownloadLimit(usize);

async fn on_message(
    bot: Bot,
    msg: Message,
    tx: mpsc::Sender<InboundEvent>,
    limit: DownloadLimit,
) -> ResponseResult<()> {
    let chat_id = MedChatId(msg.chat.id.0);

    if msg.text().and_then(BotCommand::parse) == Some(BotCommand::Start) {
        forward(&tx, InboundEvent::StartCommand { chat_id }).await;
        return Ok(());
    }

    let event = match attachment_of(&msg) {
        Some(Attachment::Image { file, hint }) => {
            let image_bytes = match download(&bot, &file, limit.0).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    // Empty bytes surface as a load error to the user.
                    warn!(chat_id = %chat_id, error = %redact_sensitive_data(&format!("{e:#}")), "Image download failed");
                    Bytes::new()
                }
            };
            InboundEvent::ImageMessage {
                chat_id,
                image_bytes,
                mime_hint: hint,
            }
        }
        Some(Attachment::Unsupported(hint)) => InboundEvent::ImageMessage {
            chat_id,
            image_bytes: Bytes::new(),
            mime_hint: hint,
        },
        None => {
            debug!(chat_id = %chat_id, "Ignoring message without media");
            return Ok(());
        }
    };

    forward(&tx, event).await;
    Ok(())
}

async fn on_callback(q: CallbackQuery, tx: mpsc::Sender<InboundEvent>) -> ResponseResult<()> {
    let Some(action) = q.data.as_deref().and_then(ButtonAction::from_callback_data) else {
        debug!(data = ?q.data, "Ignoring unknown callback data");
        return Ok(());
    };

    let message = q.message.as_ref().map(|m| MessageRef {
        chat_id: MedChatId(m.chat().id.0),
        message_id: m.id().0,
    });
    let chat_id = message
        .map(|m| m.chat_id)
        .unwrap_or(MedChatId(q.from.id.0 as i64));

    forward(
        &tx,
        InboundEvent::ButtonPress {
            chat_id,
            action,
            message,
            callback_id: Some(q.id.to_string()),
        },
    )
    .await;
    Ok(())
}

async fn forward(tx: &mpsc::Sender<InboundEvent>, event: InboundEvent) {
    let chat_id = event.chat_id();
    let kind = event.kind();
    if tx.send(event).await.is_err() {
        warn!(chat_id = %chat_id, kind, "Inbound channel closed, dropping Telegram update");
    }
}

/// Inline keyboard with one row holding every button.
pub fn keyboard(buttons: &[Button]) -> Option<InlineKeyboardMarkup> {
    if buttons.is_empty() {
        return None;
    }
    let row = buttons
        .iter()
        .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.callback_data.clone()))
        .collect::<Vec<_>>();
    Some(InlineKeyboardMarkup::new(vec![row]))
}

/// Split on line boundaries into chunks of at most `max_chars` chars.
/// Lines longer than the limit are hard-split.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > max_chars && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len > max_chars {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }
        current.push_str(line);
        current_len += line_len;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
