//! Seen ledger: which block/asset ids have already been transferred.
//!
//! Injected into the webhook flow as a capability so de-duplication does not
//! depend on process warmth. [`MemoryLedger`] lives as long as the process;
//! [`JsonFileLedger`] persists `origin → first transfer time` to disk and is
//! shared by every instance pointed at the same file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use mockall::automock;
use tracing::{debug, info};

use crate::error::SyncResult;

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait SeenLedger: Send + Sync {
    fn contains(&self, origin: &str) -> bool;

    /// Record every origin in `origins`. Already-known origins keep their
    /// original timestamp.
    fn record_all(&self, origins: &[String]) -> SyncResult<()>;
}

type Entries = HashMap<String, DateTime<Utc>>;

fn lock(entries: &Mutex<Entries>) -> MutexGuard<'_, Entries> {
    entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn insert_new(entries: &mut Entries, origins: &[String]) -> usize {
    let now = Utc::now();
    origins
        .iter()
        .filter(|origin| {
            if entries.contains_key(origin.as_str()) {
                false
            } else {
                entries.insert((*origin).clone(), now);
                true
            }
        })
        .count()
}

#[derive(Debug, Default)]
pub struct MemoryLedger {
    entries: Mutex<Entries>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SeenLedger for MemoryLedger {
    fn contains(&self, origin: &str) -> bool {
        lock(&self.entries).contains_key(origin)
    }

    fn record_all(&self, origins: &[String]) -> SyncResult<()> {
        let added = insert_new(&mut lock(&self.entries), origins);
        debug!(added, "[LEDGER] Recorded origins in memory");
        Ok(())
    }
}

#[derive(Debug)]
pub struct JsonFileLedger {
    path: PathBuf,
    entries: Mutex<Entries>,
}

impl JsonFileLedger {
    /// Open the ledger at `path`, starting empty when the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries: Entries = if path.exists() {
            let raw = std::fs::read(&path)?;
            serde_json::from_slice(&raw)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?
        } else {
            Entries::new()
        };
        info!(path = %path.display(), entries = entries.len(), "[LEDGER] Opened seen ledger");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn first_seen(&self, origin: &str) -> Option<DateTime<Utc>> {
        lock(&self.entries).get(origin).copied()
    }

    fn persist(&self, entries: &Entries) -> SyncResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_vec_pretty(entries)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, raw)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SeenLedger for JsonFileLedger {
    fn contains(&self, origin: &str) -> bool {
        lock(&self.entries).contains_key(origin)
    }

    /// The in-memory view only changes once the file on disk holds the new
    /// origins.
    fn record_all(&self, origins: &[String]) -> SyncResult<()> {
        let mut entries = lock(&self.entries);
        let mut next = entries.clone();
        let added = insert_new(&mut next, origins);
        if added > 0 {
            self.persist(&next)?;
            *entries = next;
        }
        debug!(added, path = %self.path.display(), "[LEDGER] Recorded origins");
        Ok(())
    }
}
