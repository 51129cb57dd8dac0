//! Configuration file loading for quorum-table
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `--config <path>` specified file
//! 2. Project root: `./table.toml` or `./.table.toml`
//! 3. XDG config: `$XDG_CONFIG_HOME/quorum-table/config.toml`
//! 4. Environment: `QUORUM_TABLE_*` (`__` separates nested keys)
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    FileConfig, FileDiscussionConfig, FileEngineConfig, FileLoggingConfig, FileMemoryConfig,
    FileOutputConfig, FileParticipantConfig, FileStorageConfig, FileValidationConfig,
};
pub use loader::ConfigLoader;
