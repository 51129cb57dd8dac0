//! Core domain primitives shared by every other module.

pub mod error;
pub mod string;
