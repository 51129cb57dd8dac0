//! Application-level configuration.
//!
//! - [`EngineConfig`]: turn cycle control (timeouts, retries, budgets)

pub mod engine_config;

pub use engine_config::EngineConfig;
