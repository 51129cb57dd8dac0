//! Ports (interfaces) for the application layer
//!
//! Ports are traits the use cases depend on. Adapters in the
//! infrastructure layer implement them.

pub mod action_producer;
pub mod conversation_logger;
pub mod memory_store;
pub mod progress;
pub mod session_repository;
