//! Session persistence adapters
//!
//! Implementations of the [`SessionRepository`](table_application::SessionRepository)
//! port: one JSON file per session on disk, or a map in memory.

mod in_memory;
mod json_file;

pub use in_memory::InMemorySessionRepository;
pub use json_file::JsonFileSessionRepository;
