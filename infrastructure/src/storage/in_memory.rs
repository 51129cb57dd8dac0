//! In-process session repository for tests and embedding.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;
use table_application::ports::session_repository::{SessionRepository, SessionStoreError};
use table_domain::SessionState;

/// Session repository holding every state in a map
#[derive(Default)]
pub struct InMemorySessionRepository {
    states: Mutex<BTreeMap<u64, SessionState>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn load(&self, session: u64) -> Result<Option<SessionState>, SessionStoreError> {
        let states = self
            .states
            .lock()
            .map_err(|e| SessionStoreError::Serialization(e.to_string()))?;
        Ok(states.get(&session).cloned())
    }

    async fn save(&self, state: &SessionState) -> Result<(), SessionStoreError> {
        let mut states = self
            .states
            .lock()
            .map_err(|e| SessionStoreError::Serialization(e.to_string()))?;
        states.insert(state.session, state.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<u64>, SessionStoreError> {
        let states = self
            .states
            .lock()
            .map_err(|e| SessionStoreError::Serialization(e.to_string()))?;
        Ok(states.keys().copied().collect())
    }
}
