pub mod delivery;
pub mod telegram;
pub mod telegram_commands;
pub mod telegram_media;

pub use delivery::deliver_outbound;
pub use telegram::TelegramGateway;
