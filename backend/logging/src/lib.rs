//! Structured logging for MedSnap.
//!
//! Handles subscriber setup (console + optional rolling NDJSON file), secret
//! redaction, and conversation audit events.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::EventLogger;
pub use logger::{init_logger, LogOptions};
pub use redact::redact_sensitive_data;
