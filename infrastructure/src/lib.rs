//! Infrastructure layer for quorum-table
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod logging;
pub mod memory;
pub mod process;
pub mod storage;

// Re-export commonly used types
pub use config::{
    ConfigLoader, FileConfig, FileDiscussionConfig, FileEngineConfig, FileLoggingConfig,
    FileMemoryConfig, FileOutputConfig, FileParticipantConfig, FileStorageConfig,
    FileValidationConfig,
};
pub use logging::JsonlConversationLogger;
pub use memory::{InMemoryMemoryStore, JsonFileMemoryStore};
pub use process::{AGENT_ENV, ProcessAgentGateway, ProcessProducer};
pub use storage::{InMemorySessionRepository, JsonFileSessionRepository};
