//! Channel-scoped messaging.
//!
//! Messages travel on one of three channels. Who may publish on a
//! channel and who sees what is fixed by the sender's and reader's
//! [`AgentLayer`](crate::agent::AgentLayer):
//!
//! ```text
//! ┌──────────────┬──────────────────────┬────────────────────┐
//! │ Channel      │ Strategic agents     │ Role-play agents   │
//! ├──────────────┼──────────────────────┼────────────────────┤
//! │ In-Character │ summary only         │ full content       │
//! │ Out-of-Char. │ full content         │ nothing            │
//! │ Directive    │ own sent directives  │ own received ones  │
//! └──────────────┴──────────────────────┴────────────────────┘
//! ```
//!
//! The narrator sees everything. [`ChannelRouter`] enforces the table; it
//! never inspects content beyond channel and layer.

pub mod entities;
pub mod policy;
pub mod router;

pub use entities::{Channel, Message, MessageId, MessageKind, PhaseStamp};
pub use policy::Visibility;
pub use router::ChannelRouter;
