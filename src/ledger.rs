//! Persistent ledger of already-uploaded identifiers.
//!
//! The ledger is what makes re-runs idempotent. It is a set of strings kept in
//! memory and mirrored to a JSON array on disk:
//!
//! ```json
//! [
//!   "5f0c6a8e-8d7b-4c1e-9f3a-2b6d1e0c4a97.jpg",
//!   "5f0c6a8e-8d7b-4c1e-9f3a-2b6d1e0c4a97_qr.jpg",
//!   "photo.PNG"
//! ]
//! ```
//!
//! ## Durability
//!
//! Every [`Ledger::record`] rewrites the whole file. Writes go to a sibling
//! `*.tmp` file that is then renamed over the ledger, so readers never observe a
//! half-written array.
//!
//! A missing file means nothing has been processed yet. A file that fails to
//! parse is logged and treated the same way; the next successful record
//! overwrites it.
//!
//! A failed write is logged and otherwise ignored: the in-memory set keeps the
//! new id, so the current process still skips it, but a restart may reprocess it.
//!
//! ## Concurrency
//!
//! Intake tasks run concurrently and all share one `Ledger`. The insert and the
//! file rewrite happen under the same lock, which makes the lock the single
//! writer: each rewrite contains every id recorded before it and none is lost.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Insertion-ordered set: `order` is what gets serialized, `index` answers lookups.
#[derive(Debug, Default)]
struct Entries {
    order: Vec<String>,
    index: HashSet<String>,
}

impl Entries {
    fn from_ids(ids: Vec<String>) -> Self {
        let mut entries = Self::default();
        for id in ids {
            entries.insert(id);
        }
        entries
    }

    fn insert(&mut self, id: String) -> bool {
        if self.index.contains(&id) {
            return false;
        }
        self.index.insert(id.clone());
        self.order.push(id);
        true
    }
}

/// On-disk set of processed identifiers.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    entries: Mutex<Entries>,
    /// Dry runs see existing entries but never write.
    read_only: bool,
}

impl Ledger {
    /// An empty ledger that will persist to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Mutex::new(Entries::default()),
            read_only: false,
        }
    }

    /// Load from `path`. Never fails: a missing or unreadable file yields an
    /// empty ledger, with a warning for anything other than "not found".
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no ledger yet, starting empty");
                return Self::empty(path);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read ledger, starting empty");
                return Self::empty(path);
            }
        };
        let ids: Vec<String> = match serde_json::from_str(&content) {
            Ok(ids) => ids,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to parse ledger, starting empty");
                return Self::empty(path);
            }
        };
        debug!(path = %path.display(), count = ids.len(), "loaded ledger");
        Self {
            path,
            entries: Mutex::new(Entries::from_ids(ids)),
            read_only: false,
        }
    }

    /// Like [`Ledger::load`], but [`Ledger::record`] only updates memory.
    pub fn load_read_only(path: impl Into<PathBuf>) -> Self {
        Self {
            read_only: true,
            ..Self::load(path)
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().index.contains(id)
    }

    pub fn len(&self) -> usize {
        self.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all identifiers in the order they were recorded.
    pub fn ids(&self) -> Vec<String> {
        self.lock().order.clone()
    }

    /// Add `id` and rewrite the ledger file.
    ///
    /// Returns `false` (and writes nothing) if `id` was already present.
    /// A failed write is logged; membership is kept either way.
    pub fn record(&self, id: impl Into<String>) -> bool {
        let id = id.into();
        let mut entries = self.lock();
        self.insert_and_persist(&mut entries, id)
    }

    /// Add `id` unless another id starting with `prefix` is already present.
    ///
    /// The check and the insert happen under one lock, so of two concurrent
    /// callers with different ids only one succeeds. Returns `Ok(true)` when
    /// `id` was added, `Ok(false)` when `id` itself was already there, and
    /// `Err(existing)` with the conflicting id otherwise.
    pub fn record_exclusive(&self, prefix: &str, id: impl Into<String>) -> Result<bool, String> {
        let id = id.into();
        let mut entries = self.lock();
        if entries.index.contains(&id) {
            return Ok(false);
        }
        if let Some(existing) = entries.order.iter().find(|e| e.starts_with(prefix)) {
            return Err(existing.clone());
        }
        Ok(self.insert_and_persist(&mut entries, id))
    }

    fn insert_and_persist(&self, entries: &mut Entries, id: String) -> bool {
        if !entries.insert(id.clone()) {
            return false;
        }
        if self.read_only {
            debug!(id = %id, "read-only ledger, not saving");
            return true;
        }
        if let Err(e) = write_ids(&self.path, &entries.order) {
            warn!(
                path = %self.path.display(),
                id = %id,
                error = %e,
                "failed to save ledger; entry may be reprocessed after restart"
            );
        }
        true
    }

    /// Write the current set to disk.
    pub fn save(&self) -> Result<(), LedgerError> {
        let entries = self.lock();
        write_ids(&self.path, &entries.order)
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        // A panic while holding the lock leaves the set itself intact.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Serialize `ids` and atomically replace the file at `path`.
fn write_ids(path: &Path, ids: &[String]) -> Result<(), LedgerError> {
    let json = serde_json::to_string_pretty(ids)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn ledger_path(tmp: &TempDir) -> PathBuf {
        tmp.path().join("uploaded.json")
    }

    // =========================================================================
    // Loading
    // =========================================================================

    #[test]
    fn load_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let ledger = Ledger::load(ledger_path(&tmp));
        assert!(ledger.is_empty());
        assert!(!ledger_path(&tmp).exists());
    }

    #[test]
    fn load_corrupt_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        fs::write(ledger_path(&tmp), "{ not: json").unwrap();
        let ledger = Ledger::load(ledger_path(&tmp));
        assert!(ledger.is_empty());
    }

    #[test]
    fn load_wrong_shape_is_empty() {
        let tmp = TempDir::new().unwrap();
        fs::write(ledger_path(&tmp), r#"{"files": ["a.jpg"]}"#).unwrap();
        let ledger = Ledger::load(ledger_path(&tmp));
        assert!(ledger.is_empty());
    }

    #[test]
    fn load_existing_array() {
        let tmp = TempDir::new().unwrap();
        fs::write(ledger_path(&tmp), r#"["a.jpg", "b.jpg"]"#).unwrap();
        let ledger = Ledger::load(ledger_path(&tmp));
        assert_eq!(ledger.len(), 2);
        assert!(ledger.contains("a.jpg"));
        assert!(ledger.contains("b.jpg"));
        assert!(!ledger.contains("c.jpg"));
    }

    #[test]
    fn load_collapses_duplicates() {
        let tmp = TempDir::new().unwrap();
        fs::write(ledger_path(&tmp), r#"["a.jpg", "a.jpg", "b.jpg"]"#).unwrap();
        let ledger = Ledger::load(ledger_path(&tmp));
        assert_eq!(ledger.ids(), vec!["a.jpg", "b.jpg"]);
    }

    // =========================================================================
    // Recording
    // =========================================================================

    #[test]
    fn record_persists_immediately() {
        let tmp = TempDir::new().unwrap();
        let ledger = Ledger::load(ledger_path(&tmp));
        assert!(ledger.record("x.jpg"));

        let on_disk: Vec<String> =
            serde_json::from_str(&fs::read_to_string(ledger_path(&tmp)).unwrap()).unwrap();
        assert_eq!(on_disk, vec!["x.jpg"]);
        assert!(!tmp.path().join("uploaded.json.tmp").exists());
    }

    #[test]
    fn record_existing_id_is_noop() {
        let tmp = TempDir::new().unwrap();
        let ledger = Ledger::load(ledger_path(&tmp));
        ledger.record("x.jpg");
        let before = fs::metadata(ledger_path(&tmp)).unwrap().modified().unwrap();

        assert!(!ledger.record("x.jpg"));
        assert_eq!(ledger.len(), 1);
        let after = fs::metadata(ledger_path(&tmp)).unwrap().modified().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn read_only_ledger_sees_entries_but_never_writes() {
        let tmp = TempDir::new().unwrap();
        fs::write(ledger_path(&tmp), r#"["old.jpg"]"#).unwrap();

        let ledger = Ledger::load_read_only(ledger_path(&tmp));
        assert!(ledger.contains("old.jpg"));
        assert!(ledger.record("new.jpg"));
        assert!(ledger.contains("new.jpg"));
        assert_eq!(
            fs::read_to_string(ledger_path(&tmp)).unwrap(),
            r#"["old.jpg"]"#
        );
    }

    #[test]
    fn record_creates_parent_directory() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state/nested/uploaded.json");
        let ledger = Ledger::load(&path);
        ledger.record("x.jpg");
        assert!(path.exists());
    }

    #[test]
    fn record_keeps_membership_when_write_fails() {
        let tmp = TempDir::new().unwrap();
        // The ledger path is a directory, so the rename fails.
        let path = tmp.path().join("ledger-dir");
        fs::create_dir_all(path.join("occupied")).unwrap();

        let ledger = Ledger::load(&path);
        assert!(ledger.record("x.jpg"));
        assert!(ledger.contains("x.jpg"));
        assert!(ledger.save().is_err());
    }

    #[test]
    fn record_overwrites_corrupt_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(ledger_path(&tmp), "garbage").unwrap();
        let ledger = Ledger::load(ledger_path(&tmp));
        ledger.record("fresh.jpg");

        let reloaded = Ledger::load(ledger_path(&tmp));
        assert_eq!(reloaded.ids(), vec!["fresh.jpg"]);
    }

    #[test]
    fn concurrent_records_are_all_persisted() {
        let tmp = TempDir::new().unwrap();
        let ledger = Arc::new(Ledger::load(ledger_path(&tmp)));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || {
                    for i in 0..10 {
                        ledger.record(format!("{t}-{i}.jpg"));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let reloaded = Ledger::load(ledger_path(&tmp));
        assert_eq!(reloaded.len(), 80);
    }

    // =========================================================================
    // Exclusive record
    // =========================================================================

    #[test]
    fn record_exclusive_rejects_other_id_with_same_prefix() {
        let tmp = TempDir::new().unwrap();
        let ledger = Ledger::load(ledger_path(&tmp));

        assert_eq!(ledger.record_exclusive("claim/a.jpg/", "claim/a.jpg/a.png"), Ok(true));
        assert_eq!(
            ledger.record_exclusive("claim/a.jpg/", "claim/a.jpg/a.jpg"),
            Err("claim/a.jpg/a.png".to_string())
        );
        assert_eq!(ledger.ids(), vec!["claim/a.jpg/a.png"]);

        let reloaded = Ledger::load(ledger_path(&tmp));
        assert_eq!(reloaded.ids(), vec!["claim/a.jpg/a.png"]);
    }

    #[test]
    fn record_exclusive_same_id_is_noop() {
        let tmp = TempDir::new().unwrap();
        let ledger = Ledger::load(ledger_path(&tmp));
        ledger.record_exclusive("claim/a.jpg/", "claim/a.jpg/a.png").unwrap();
        assert_eq!(ledger.record_exclusive("claim/a.jpg/", "claim/a.jpg/a.png"), Ok(false));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn concurrent_exclusive_records_admit_one_owner() {
        let tmp = TempDir::new().unwrap();
        let ledger = Arc::new(Ledger::load(ledger_path(&tmp)));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || {
                    ledger.record_exclusive("claim/x.jpg/", format!("claim/x.jpg/x{t}.png"))
                })
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|r| r.is_ok())
            .count();

        assert_eq!(winners, 1);
        assert_eq!(Ledger::load(ledger_path(&tmp)).len(), 1);
    }

    // =========================================================================
    // Save / load roundtrip
    // =========================================================================

    #[test]
    fn save_without_changes_preserves_content() {
        let tmp = TempDir::new().unwrap();
        let original = "[\n  \"b.jpg\",\n  \"a.jpg\",\n  \"c_qr.jpg\"\n]";
        fs::write(ledger_path(&tmp), original).unwrap();

        let ledger = Ledger::load(ledger_path(&tmp));
        ledger.save().unwrap();

        assert_eq!(fs::read_to_string(ledger_path(&tmp)).unwrap(), original);
    }

    #[test]
    fn saved_file_is_pretty_json_array() {
        let tmp = TempDir::new().unwrap();
        let ledger = Ledger::load(ledger_path(&tmp));
        ledger.record("a.jpg");
        ledger.record("b.jpg");
        assert_eq!(
            fs::read_to_string(ledger_path(&tmp)).unwrap(),
            "[\n  \"a.jpg\",\n  \"b.jpg\"\n]"
        );
    }
}
