//! Durable disk tier.
//!
//! Artifacts are persisted one file per (identity, state key) pair beneath a
//! configurable root directory: `<root>/<identity>/<state>.blob`, with both
//! segments escaped into safe file names. File content is the raw artifact
//! bytes with no header; sizes come from the filesystem.
//!
//! Writes publish atomically: bytes go to a temporary sibling with a name
//! unique to the writing call, are synced, then renamed into place. A
//! concurrent or post-crash `load` never observes a partially written entry,
//! even when several processes share the same root.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::artifact::Artifact;
use crate::error::CacheError;
use crate::key::{encode_segment, CacheKey};

const ENTRY_EXTENSION: &str = "blob";

/// Distinguishes concurrent writers within one process; combined with the
/// process id it makes every temporary file name unique per call.
static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Durable artifact store rooted at a single directory.
///
/// Entries are only ever removed by [`purge`](DiskStore::purge); the store
/// never evicts on its own.
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The store's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn identity_dir(&self, identity: &str) -> PathBuf {
        self.root.join(encode_segment(identity))
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.dir_name()).join(key.file_name())
    }

    /// Load the artifact stored for `key`.
    ///
    /// Returns `Ok(None)` when no entry exists. Any other I/O failure (for
    /// example a permission error) propagates; callers may still choose to
    /// treat it as a miss and recompute.
    pub fn load(&self, key: &CacheKey) -> Result<Option<Artifact>, CacheError> {
        match fs::read(self.entry_path(key)) {
            Ok(bytes) => Ok(Some(Artifact::from(bytes))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Store an artifact durably under `key`, replacing any previous entry.
    pub fn store(&self, key: &CacheKey, artifact: &Artifact) -> Result<(), CacheError> {
        let dir = self.root.join(key.dir_name());
        fs::create_dir_all(&dir)?;

        // Unique per call, not just per process: clone handles and separate
        // gates sharing one root may store the same key concurrently.
        let tmp_path = dir.join(format!(
            "{}.{}-{}.tmp",
            key.file_name(),
            process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let result = (|| {
            let mut file = File::create(&tmp_path)?;
            file.write_all(artifact.bytes())?;
            file.sync_all()?;
            fs::rename(&tmp_path, dir.join(key.file_name()))
        })();

        if result.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        result.map_err(CacheError::from)
    }

    /// Check whether an entry exists for `key`.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entry_path(key).is_file()
    }

    /// Delete every entry belonging to `identity`, across all state keys.
    ///
    /// Missing entries are not an error.
    pub fn purge(&self, identity: &str) -> Result<(), CacheError> {
        match fs::remove_dir_all(self.identity_dir(identity)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Total size in bytes of all entries stored under `identity`.
    ///
    /// Stray temporary files are not counted.
    pub fn size_of(&self, identity: &str) -> Result<u64, CacheError> {
        let dir = self.identity_dir(identity);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut total = 0u64;
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some(ENTRY_EXTENSION) {
                total += entry.metadata()?.len();
            }
        }
        Ok(total)
    }
}
