//! Memory store adapters

mod in_memory;
mod index;
mod json_file;

pub use in_memory::InMemoryMemoryStore;
pub use json_file::{JsonFileMemoryStore, MEMORY_FILE};
