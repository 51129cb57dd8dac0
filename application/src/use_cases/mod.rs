//! Use cases for the application layer

pub mod run_turn;
pub mod validate_action;
