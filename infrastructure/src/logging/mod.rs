//! Session transcripts
//!
//! [`JsonlConversationLogger`] implements the
//! [`ConversationLogger`](table_application::ConversationLogger) port with
//! one append-only JSONL file per session.

mod jsonl_logger;

pub use jsonl_logger::JsonlConversationLogger;
