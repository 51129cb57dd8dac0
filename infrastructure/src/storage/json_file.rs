//! One pretty-printed JSON file per session.
//!
//! Saves go to a temporary sibling first and are renamed into place, so a
//! crash mid-write leaves the previous record intact.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use table_application::ports::session_repository::{SessionRepository, SessionStoreError};
use table_domain::SessionState;
use tokio::fs;
use tracing::{debug, warn};

const PREFIX: &str = "session-";
const EXTENSION: &str = "json";

/// Session repository backed by a directory of `session-<n>.json` files
pub struct JsonFileSessionRepository {
    dir: PathBuf,
}

impl JsonFileSessionRepository {
    /// Use `dir` for session files. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for `session`
    pub fn path_for(&self, session: u64) -> PathBuf {
        self.dir.join(format!("{}{}.{}", PREFIX, session, EXTENSION))
    }

    fn session_number(path: &Path) -> Option<u64> {
        if path.extension()? != EXTENSION {
            return None;
        }
        path.file_stem()?
            .to_str()?
            .strip_prefix(PREFIX)?
            .parse()
            .ok()
    }
}

#[async_trait]
impl SessionRepository for JsonFileSessionRepository {
    async fn load(&self, session: u64) -> Result<Option<SessionState>, SessionStoreError> {
        let path = self.path_for(session);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let state: SessionState =
            serde_json::from_slice(&bytes).map_err(|e| SessionStoreError::Corrupt {
                session,
                reason: e.to_string(),
            })?;
        if state.session != session {
            return Err(SessionStoreError::Corrupt {
                session,
                reason: format!("file holds session {}", state.session),
            });
        }

        debug!("Loaded session {} from {}", session, path.display());
        Ok(Some(state))
    }

    async fn save(&self, state: &SessionState) -> Result<(), SessionStoreError> {
        fs::create_dir_all(&self.dir).await?;

        let json = serde_json::to_vec_pretty(state)
            .map_err(|e| SessionStoreError::Serialization(e.to_string()))?;
        let path = self.path_for(state.session);
        let tmp = path.with_extension(format!("{}.tmp", EXTENSION));

        fs::write(&tmp, &json).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            warn!("Could not move {} into place: {}", tmp.display(), e);
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!("Saved session {} ({} bytes)", state.session, json.len());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<u64>, SessionStoreError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut sessions = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(session) = Self::session_number(&entry.path()) {
                sessions.push(session);
            }
        }
        sessions.sort_unstable();
        Ok(sessions)
    }
}
