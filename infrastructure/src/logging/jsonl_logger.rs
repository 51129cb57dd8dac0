//! Session transcripts as JSON lines
//!
//! A session is usually driven by several processes (`turn`, then
//! `resume`), so the file is opened for appending and `seq` restarts with
//! each process. Order lines by `timestamp` first.

use serde_json::{Map, Value};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use table_application::ports::conversation_logger::{ConversationEvent, ConversationLogger};
use tracing::warn;

/// Appends one JSON object per event to a session transcript.
///
/// Every line carries `type`, `timestamp` and a per-writer `seq`. Loggers
/// opened with [`for_session`](Self::for_session) also stamp `session` on
/// events that do not name one.
pub struct JsonlConversationLogger {
    writer: Mutex<TranscriptWriter>,
    path: PathBuf,
    session: Option<u64>,
}

struct TranscriptWriter {
    out: BufWriter<File>,
    seq: u64,
}

impl JsonlConversationLogger {
    /// Open (or create) the transcript at `path` for appending.
    ///
    /// Returns `None` when the file cannot be opened; the turn then runs
    /// without a transcript.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "Could not create transcript directory {}: {}",
                parent.display(),
                e
            );
            return None;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .inspect_err(|e| warn!("Could not open transcript {}: {}", path.display(), e))
            .ok()?;

        Some(Self {
            writer: Mutex::new(TranscriptWriter {
                out: BufWriter::new(file),
                seq: 0,
            }),
            path: path.to_path_buf(),
            session: None,
        })
    }

    /// Transcript of `session` inside `dir`: `session-<n>.transcript.jsonl`
    pub fn for_session(dir: impl AsRef<Path>, session: u64) -> Option<Self> {
        let mut logger = Self::new(
            dir.as_ref()
                .join(format!("session-{}.transcript.jsonl", session)),
        )?;
        logger.session = Some(session);
        Some(logger)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn record(&self, event: ConversationEvent, seq: u64) -> Value {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let mut map = match event.payload {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };
        map.insert("type".to_string(), Value::from(event.event_type));
        map.insert("timestamp".to_string(), Value::from(timestamp));
        map.insert("seq".to_string(), Value::from(seq));
        if let Some(session) = self.session {
            map.entry("session").or_insert(Value::from(session));
        }
        Value::Object(map)
    }
}

impl ConversationLogger for JsonlConversationLogger {
    fn log(&self, event: ConversationEvent) {
        let Ok(mut writer) = self.writer.lock() else {
            return;
        };
        writer.seq += 1;
        let record = self.record(event, writer.seq);
        let Ok(line) = serde_json::to_string(&record) else {
            return;
        };
        // A crash loses at most the line being written
        if writeln!(writer.out, "{}", line)
            .and_then(|_| writer.out.flush())
            .is_err()
        {
            warn!("Transcript write to {} failed", self.path.display());
        }
    }
}
