//! Pluggable persistence for activity events, with a JSONL file-backed
//! implementation: one event per line, rotated by size/count, retained for
//! a configurable number of hours.

use chrono::Utc;
use schemas::{ActivityEvent, EngineError, Result};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_EVENTS_PER_FILE: u64 = 100_000;
pub const MAX_FILE_BYTES: u64 = 50 * 1024 * 1024;
pub const MAX_LINE_BYTES: usize = 100 * 1024;

/// Persists activity events somewhere durable. Implementations must not
/// block the producer indefinitely; a slow sink should fail fast.
pub trait ActivityPersistence: Send + Sync {
    fn append(&self, event: &ActivityEvent) -> Result<()>;
}

/// No-op sink, used when persistence isn't configured.
pub struct NullPersistence;

impl ActivityPersistence for NullPersistence {
    fn append(&self, _event: &ActivityEvent) -> Result<()> {
        Ok(())
    }
}

fn reject_traversal_or_symlink(base_dir: &Path) -> Result<()> {
    if base_dir
        .components()
        .any(|c| c == std::path::Component::ParentDir)
    {
        return Err(EngineError::SecurityViolation(
            "activity base path escapes configured root".to_string(),
        ));
    }
    if let Ok(metadata) = fs::symlink_metadata(base_dir) {
        if metadata.file_type().is_symlink() {
            return Err(EngineError::SecurityViolation(
                "activity base path must not be a symlink".to_string(),
            ));
        }
    }
    Ok(())
}

struct FileState {
    path: PathBuf,
    file: File,
    events_written: u64,
    bytes_written: u64,
}

pub struct JsonlActivityPersistence {
    base_dir: PathBuf,
    max_events_per_file: u64,
    max_file_bytes: u64,
    retention_hours: i64,
    current: parking_lot::Mutex<Option<FileState>>,
}

impl JsonlActivityPersistence {
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        reject_traversal_or_symlink(&base_dir)?;
        fs::create_dir_all(&base_dir)
            .map_err(|e| EngineError::UpstreamError(format!("create activity dir: {e}")))?;
        Ok(Self {
            base_dir,
            max_events_per_file: DEFAULT_MAX_EVENTS_PER_FILE,
            max_file_bytes: MAX_FILE_BYTES,
            retention_hours: 24 * 30,
            current: parking_lot::Mutex::new(None),
        })
    }

    pub fn with_max_events_per_file(mut self, max: u64) -> Self {
        self.max_events_per_file = max;
        self
    }

    pub fn with_max_file_bytes(mut self, max: u64) -> Self {
        self.max_file_bytes = max;
        self
    }

    pub fn with_retention_hours(mut self, hours: i64) -> Self {
        self.retention_hours = hours;
        self
    }

    fn new_file_path(&self) -> PathBuf {
        let stamp = Utc::now().to_rfc3339().replace(':', "-");
        self.base_dir.join(format!("activity-{stamp}.jsonl"))
    }

    fn open_new_file(&self) -> Result<FileState> {
        let path = self.new_file_path();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| EngineError::UpstreamError(format!("open activity file: {e}")))?;
        Ok(FileState {
            path,
            file,
            events_written: 0,
            bytes_written: 0,
        })
    }

    /// Deletes rotated files whose modification time is older than
    /// `retention_hours`. Best-effort: IO errors are logged, not propagated.
    pub fn enforce_retention(&self) {
        let cutoff = Utc::now() - chrono::Duration::hours(self.retention_hours);
        let entries = match fs::read_dir(&self.base_dir) {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = %e, "failed to list activity directory for retention");
                return;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .map(chrono::DateTime::<Utc>::from);
            if let Ok(modified) = modified {
                if modified < cutoff {
                    if let Err(e) = fs::remove_file(&path) {
                        tracing::warn!(error = %e, path = %path.display(), "failed to delete expired activity file");
                    }
                }
            }
        }
    }
}

impl ActivityPersistence for JsonlActivityPersistence {
    fn append(&self, event: &ActivityEvent) -> Result<()> {
        let line = serde_json::to_string(event)
            .map_err(|e| EngineError::ValidationFailure(format!("serialize event: {e}")))?;
        if line.len() > MAX_LINE_BYTES {
            return Err(EngineError::ValidationFailure(
                "activity event line exceeds 100 KiB".to_string(),
            ));
        }

        let mut guard = self.current.lock();
        let needs_new = match guard.as_ref() {
            None => true,
            Some(state) => {
                state.events_written >= self.max_events_per_file
                    || state.bytes_written + line.len() as u64 + 1 > self.max_file_bytes
            }
        };
        if needs_new {
            *guard = Some(self.open_new_file()?);
        }

        let state = guard.as_mut().expect("file state just populated");
        writeln!(state.file, "{line}")
            .map_err(|e| EngineError::UpstreamError(format!("write activity line: {e}")))?;
        state.events_written += 1;
        state.bytes_written += line.len() as u64 + 1;
        Ok(())
    }
}
