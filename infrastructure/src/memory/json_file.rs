//! Long-term memory persisted to one JSON file.
//!
//! The whole index is rewritten after every write, through a temporary
//! sibling renamed into place. Seeded facts are kept in memory only and
//! come from configuration on each start.

use super::index::MemoryIndex;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use table_application::ports::action_producer::CollaboratorError;
use table_application::ports::memory_store::{MemoryPayload, MemoryStore};
use table_domain::channel::router::DEFAULT_SUMMARY_LEN;
use table_domain::{AgentId, AgentProfile, Message};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// File name used inside the storage directory
pub const MEMORY_FILE: &str = "memory.json";

/// Memory store that survives process restarts
pub struct JsonFileMemoryStore {
    path: PathBuf,
    index: Mutex<MemoryIndex>,
    summary_len: usize,
}

impl JsonFileMemoryStore {
    /// Load the index at `path`, or start empty if the file does not exist.
    pub async fn open(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let index = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("{}: {}", path.display(), e),
                )
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => MemoryIndex::default(),
            Err(e) => return Err(e),
        };
        debug!("Opened memory store {}", path.display());
        Ok(Self {
            path,
            index: Mutex::new(index),
            summary_len: DEFAULT_SUMMARY_LEN,
        })
    }

    /// Open `memory.json` inside `dir`.
    pub async fn in_dir(dir: &Path) -> std::io::Result<Self> {
        Self::open(dir.join(MEMORY_FILE)).await
    }

    pub fn with_summary_len(mut self, summary_len: usize) -> Self {
        self.summary_len = summary_len;
        self
    }

    /// Give `agent` standing knowledge for this process
    pub fn with_facts(mut self, agent: impl Into<AgentId>, facts: Vec<String>) -> Self {
        self.index.get_mut().add_facts(agent.into(), facts);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Messages archived when `session` ended
    pub async fn archive(&self, session: u64) -> Option<Vec<Message>> {
        self.index.lock().await.archive(session).cloned()
    }

    async fn persist(&self, index: &MemoryIndex) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).await?;
        }
        let json = serde_json::to_vec(index)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &json).await?;
        if let Err(e) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e);
        }
        debug!("Memory saved ({} bytes)", json.len());
        Ok(())
    }
}

#[async_trait]
impl MemoryStore for JsonFileMemoryStore {
    async fn write_context(
        &self,
        session: u64,
        turn: u64,
        payload: MemoryPayload,
    ) -> Result<(), CollaboratorError> {
        let mut index = self.index.lock().await;
        let mut updated = index.clone();
        updated.record(session, turn, payload);
        if let Err(e) = self.persist(&updated).await {
            warn!("Could not write {}: {}", self.path.display(), e);
            return Err(CollaboratorError::Unavailable(format!(
                "memory file {}: {}",
                self.path.display(),
                e
            )));
        }
        *index = updated;
        Ok(())
    }

    async fn retrieve_context(
        &self,
        reader: &AgentProfile,
        query: &str,
        limit: usize,
    ) -> Result<Vec<String>, CollaboratorError> {
        let index = self.index.lock().await;
        Ok(index.recall(reader, query, limit, self.summary_len))
    }
}
