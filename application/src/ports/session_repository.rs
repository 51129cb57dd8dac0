//! Session repository port
//!
//! Persists the flat [`SessionState`] record so a suspended turn can be
//! resumed by a different process.

use async_trait::async_trait;
use table_domain::SessionState;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session {session} is corrupt: {reason}")]
    Corrupt { session: u64, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Load a session, `None` if it was never saved
    async fn load(&self, session: u64) -> Result<Option<SessionState>, SessionStoreError>;

    /// Persist `state`, replacing any previous record for its session
    async fn save(&self, state: &SessionState) -> Result<(), SessionStoreError>;

    /// Numbers of all stored sessions, ascending
    async fn list(&self) -> Result<Vec<u64>, SessionStoreError>;
}
