//! Telegram Bot Commands
//!
//! Recognizes the commands the bot answers to.

/// Commands understood by the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    Start,
}

impl BotCommand {
    /// Parse the leading command of a message, tolerating the
    /// `/start@BotName` form used in groups and trailing arguments.
    pub fn parse(text: &str) -> Option<Self> {
        let first = text.split_whitespace().next()?;
        let name = first.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name);
        match name.to_ascii_lowercase().as_str() {
            "start" => Some(BotCommand::Start),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_start_variants() {
        assert_eq!(BotCommand::parse("/start"), Some(BotCommand::Start));
        assert_eq!(BotCommand::parse("  /start@MedSnapBot"), Some(BotCommand::Start));
        assert_eq!(BotCommand::parse("/START deep-link"), Some(BotCommand::Start));
    }

    #[test]
    fn ignores_other_text() {
        assert_eq!(BotCommand::parse("start"), None);
        assert_eq!(BotCommand::parse("/help"), None);
        assert_eq!(BotCommand::parse(""), None);
    }
}
