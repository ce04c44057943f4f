//! Telegram Media Handler
//!
//! Picks the attachment worth running OCR on and downloads it.

use anyhow::{Context, Result};
use bytes::Bytes;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{FileMeta, PhotoSize};
use tracing::debug;

use medsnap_core::MimeHint;

/// What an incoming message carries, as far as the bot cares.
#[derive(Debug, Clone, PartialEq)]
pub enum Attachment {
    /// Downloadable image with its hint.
    Image { file: FileMeta, hint: MimeHint },
    /// Something that is not an image; reported back to the user.
    Unsupported(MimeHint),
}

/// Largest rendition of a photo by pixel count.
pub fn largest_photo(sizes: &[PhotoSize]) -> Option<&PhotoSize> {
    sizes
        .iter()
        .max_by_key(|p| u64::from(p.width) * u64::from(p.height))
}

/// Classify the media on a message. `None` means there is no media at all.
pub fn attachment_of(msg: &Message) -> Option<Attachment> {
    if let Some(photo) = msg.photo().and_then(largest_photo) {
        return Some(Attachment::Image {
            file: photo.file.clone(),
            hint: MimeHint::Photo,
        });
    }

    if let Some(doc) = msg.document() {
        let hint = MimeHint::Document {
            mime_type: doc.mime_type.as_ref().map(|m| m.to_string()),
        };
        return Some(if hint.is_supported_image() {
            Attachment::Image {
                file: doc.file.clone(),
                hint,
            }
        } else {
            Attachment::Unsupported(hint)
        });
    }

    let kind = if msg.video().is_some() {
        "video"
    } else if msg.audio().is_some() {
        "audio"
    } else if msg.voice().is_some() {
        "voice"
    } else if msg.sticker().is_some() {
        "sticker"
    } else if msg.animation().is_some() {
        "animation"
    } else if msg.video_note().is_some() {
        "video_note"
    } else {
        return None;
    };
    Some(Attachment::Unsupported(MimeHint::Other {
        kind: kind.to_string(),
    }))
}

/// Fetch a file's bytes from Telegram.
pub async fn download(bot: &Bot, file: &FileMeta, max_bytes: usize) -> Result<Bytes> {
    if file.size as usize > max_bytes {
        anyhow::bail!("file is {} bytes, limit is {}", file.size, max_bytes);
    }

    let remote = bot
        .get_file(file.id.clone())
        .await
        .context("Telegram getFile failed")?;

    let mut buf = Vec::with_capacity(file.size as usize);
    bot.download_file(&remote.path, &mut buf)
        .await
        .context("Telegram file download failed")?;

    debug!(bytes = buf.len(), "Downloaded Telegram file");
    Ok(Bytes::from(buf))
}
