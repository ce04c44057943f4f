pub mod channel;
pub mod error;
pub mod event;
pub mod message;
pub mod traits;
pub mod types;

pub use channel::MedBus;
pub use error::{ExtractError, MedsnapError};
pub use event::{Event, EventKind};
pub use message::{Button, InboundEvent, MimeHint, OutboundMessage};
pub use traits::{
    AdviceProvider, ChatGateway, LlmProvider, LlmRequest, LlmResponse, TextExtractor,
};
pub use types::{
    AdviceRequest, AdviceResult, ButtonAction, ChatId, ConversationSession, ConversationState,
    MessageRef, ReminderJob,
};
