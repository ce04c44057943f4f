pub mod dispatcher;
pub mod engine;
pub mod replies;
pub mod session_store;

pub use dispatcher::ChatDispatcher;
pub use engine::{ConversationEngine, EngineConfig};
pub use session_store::SessionStore;
