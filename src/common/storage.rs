//! Append-only message log
//!
//! Committed transaction messages land here, one per line. Supports a
//! file-backed log for real nodes and an in-memory log for tests.

use crate::common::{Error, Result, Vote};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Trait for durable log backends
pub trait DurableLog: Send + Sync {
    /// Append one message. Must be durable before returning `Ok`.
    fn append(&self, message: &str) -> Result<()>;

    /// Read back every message in append order
    fn entries(&self) -> Result<Vec<String>>;
}

/// Apply a decision to a log: append on `Commit`, no-op on `Abort`.
///
/// Returns whether the message was written.
pub fn apply_decision(log: &dyn DurableLog, decision: Vote, message: &str) -> Result<bool> {
    match decision {
        Vote::Commit => {
            log.append(message)?;
            Ok(true)
        }
        Vote::Abort => Ok(false),
    }
}

/// In-memory log
#[derive(Default)]
pub struct MemoryLog {
    entries: Mutex<Vec<String>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DurableLog for MemoryLog {
    fn append(&self, message: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
        Ok(())
    }

    fn entries(&self) -> Result<Vec<String>> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}

/// File-backed log, newline separated
pub struct FileLog {
    path: PathBuf,
    file: Mutex<File>,
    sync_writes: bool,
}

impl FileLog {
    /// Open or create the log file, creating parent directories as needed.
    pub fn open(path: impl AsRef<Path>, sync_writes: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            file: Mutex::new(file),
            sync_writes,
        })
    }
}

impl DurableLog for FileLog {
    fn append(&self, message: &str) -> Result<()> {
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);

        let mut line = String::with_capacity(message.len() + 1);
        line.push_str(message);
        line.push('\n');

        file.write_all(line.as_bytes()).map_err(Error::StoreWrite)?;
        file.flush().map_err(Error::StoreWrite)?;
        if self.sync_writes {
            file.sync_data().map_err(Error::StoreWrite)?;
        }

        tracing::debug!(path = %self.path.display(), "Appended to log");
        Ok(())
    }

    fn entries(&self) -> Result<Vec<String>> {
        // Hold the writer lock so a concurrent append is never half-read
        let _guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);

        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        BufReader::new(file)
            .lines()
            .map(|line| line.map_err(Error::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_log_append_and_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("log.txt");

        {
            let log = FileLog::open(&path, true).unwrap();
            log.append("first").unwrap();
            log.append("second").unwrap();
        }

        let log = FileLog::open(&path, false).unwrap();
        log.append("third").unwrap();
        assert_eq!(log.entries().unwrap(), vec!["first", "second", "third"]);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\nthird\n");
    }

    #[test]
    fn test_apply_decision() {
        let log = MemoryLog::new();

        assert!(!apply_decision(&log, Vote::Abort, "dropped").unwrap());
        assert!(log.entries().unwrap().is_empty());

        assert!(apply_decision(&log, Vote::Commit, "kept").unwrap());
        assert_eq!(log.entries().unwrap(), vec!["kept"]);
    }

    #[test]
    fn test_empty_file_log() {
        let dir = TempDir::new().unwrap();
        let log = FileLog::open(dir.path().join("log.txt"), false).unwrap();
        assert!(log.entries().unwrap().is_empty());
    }
}
