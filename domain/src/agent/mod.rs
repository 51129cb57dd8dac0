//! Agent identity and layering.
//!
//! Each participant at the table is represented by two agents: a
//! **strategic** agent that discusses plans out of character, and a
//! **role-play** agent that speaks and acts in character. The human game
//! master appears as a single **narrator** identity.

pub mod value_objects;

pub use value_objects::{AgentId, AgentLayer, AgentProfile, Participant};
