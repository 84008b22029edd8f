//! Flat-file asset registry.
//!
//! Each library is one JSON object on disk mapping entry ids to entries.
//! There is no authoritative in-memory cache: every mutation re-reads the
//! whole document, changes it and writes the whole document back.
//!
//! Two write modes are available:
//! - `Direct` truncates and rewrites the file in place. Readers racing a
//!   write can observe a partial file and concurrent writers can lose
//!   updates (last writer wins for the whole document).
//! - `Atomic` holds an advisory lock on a sibling lock file for the whole
//!   read-modify-write cycle and replaces the document through a temp file
//!   rename, so neither truncation nor lost updates can occur.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::entry::{Entry, EntryId};
use super::error::{RegistryError, RegistryResult};

/// How a library document is written back to disk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Truncate and rewrite in place, no locking
    #[default]
    Direct,

    /// Lock, write to a temp file, rename over the target
    Atomic,
}

impl std::fmt::Display for WriteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteMode::Direct => write!(f, "direct"),
            WriteMode::Atomic => write!(f, "atomic"),
        }
    }
}

impl std::str::FromStr for WriteMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "direct" => Ok(WriteMode::Direct),
            "atomic" => Ok(WriteMode::Atomic),
            _ => anyhow::bail!("Unknown write mode: {}", s),
        }
    }
}

/// In-memory copy of one library file, in on-disk order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibraryDocument {
    entries: Vec<(EntryId, Entry)>,
}

impl LibraryDocument {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a document, attributing failures to `path`
    pub fn parse(path: &Path, content: &str) -> RegistryResult<Self> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| RegistryError::parse(path, e.to_string()))?;

        let Value::Object(map) = value else {
            return Err(RegistryError::parse(path, "top-level value is not an object"));
        };

        let mut entries = Vec::with_capacity(map.len());
        for (key, value) in map {
            let entry: Entry = serde_json::from_value(value)
                .map_err(|e| RegistryError::parse(path, format!("entry '{}': {}", key, e)))?;
            let id = EntryId::new(key)
                .map_err(|_| RegistryError::parse(path, "entry with an empty id"))?;
            entries.push((id, entry));
        }

        Ok(Self { entries })
    }

    /// Pretty-printed JSON with 2-space indentation
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get an entry by id
    pub fn get(&self, id: &EntryId) -> Option<&Entry> {
        self.entries.iter().find(|(k, _)| k == id).map(|(_, e)| e)
    }

    pub fn contains(&self, id: &EntryId) -> bool {
        self.get(id).is_some()
    }

    /// Set an entry, replacing any previous one under the same id.
    ///
    /// A replaced entry keeps its position in the document.
    pub fn insert(&mut self, id: EntryId, entry: Entry) -> Option<Entry> {
        if let Some((_, existing)) = self.entries.iter_mut().find(|(k, _)| *k == id) {
            Some(std::mem::replace(existing, entry))
        } else {
            self.entries.push((id, entry));
            None
        }
    }

    /// Remove an entry by id
    pub fn remove(&mut self, id: &EntryId) -> Option<Entry> {
        let pos = self.entries.iter().position(|(k, _)| k == id)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntryId, &Entry)> {
        self.entries.iter().map(|(k, e)| (k, e))
    }

    pub fn into_entries(self) -> Vec<(EntryId, Entry)> {
        self.entries
    }
}

impl Serialize for LibraryDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(k, e)| (k, e)))
    }
}

/// Sibling backup path: `{stem}_backup{ext}`
pub fn backup_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    path.with_file_name(format!("{}_backup{}", stem, ext))
}

/// Sibling advisory lock file used in atomic mode: `.{file_name}.lock`
pub fn lock_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    path.with_file_name(format!(".{}.lock", name))
}

/// Registry of library documents, addressed by file path
#[derive(Debug, Clone, Copy, Default)]
pub struct Registry {
    mode: WriteMode,
}

impl Registry {
    pub fn new(mode: WriteMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    /// Create an empty `{}` document if nothing exists at `path`
    pub fn ensure_library(&self, path: &Path) -> RegistryResult<()> {
        if path.is_dir() {
            return Err(RegistryError::storage(
                path,
                std::io::Error::new(IoErrorKind::Other, "library path is a directory"),
            ));
        }
        create_parent_dir(path)?;

        match self.mode {
            WriteMode::Direct => {
                match OpenOptions::new().write(true).create_new(true).open(path) {
                    Ok(mut file) => {
                        file.write_all(render(path, &LibraryDocument::new())?.as_bytes())
                            .map_err(|e| RegistryError::storage(path, e))?;
                    }
                    Err(e) if e.kind() == IoErrorKind::AlreadyExists => return Ok(()),
                    Err(e) => return Err(RegistryError::storage(path, e)),
                }
            }
            WriteMode::Atomic => {
                let _lock = self.lock(path, true)?;
                if path.exists() {
                    return Ok(());
                }
                write_atomic(path, &LibraryDocument::new())?;
            }
        }

        info!(path = %path.display(), "Created library");
        Ok(())
    }

    /// All entries of the library in stored order.
    ///
    /// A missing file is an empty library; it is not created.
    pub fn list_entries(&self, path: &Path) -> RegistryResult<Vec<(EntryId, Entry)>> {
        Ok(self.load_document(path)?.into_entries())
    }

    /// Read the whole document (empty if the file does not exist)
    pub fn load_document(&self, path: &Path) -> RegistryResult<LibraryDocument> {
        if !path.exists() {
            return Ok(LibraryDocument::new());
        }

        let _lock = self.lock(path, false)?;
        read_document(path)
    }

    /// Replace the whole document on disk, without backup
    pub fn store_document(&self, path: &Path, document: &LibraryDocument) -> RegistryResult<()> {
        let _lock = self.lock(path, true)?;
        self.write(path, document)
    }

    /// Insert or replace the entry stored under `id`.
    ///
    /// The previous entry, if any, is replaced entirely. With `backup` set
    /// and an existing library file, the file is first copied to its
    /// `_backup` sibling.
    pub fn add_entry(
        &self,
        path: &Path,
        id: &EntryId,
        entry: Entry,
        backup: bool,
    ) -> RegistryResult<()> {
        entry.validate()?;

        self.update(path, backup, |document| {
            document.insert(id.clone(), entry);
            true
        })?;

        info!(path = %path.display(), %id, "Added entry");
        Ok(())
    }

    /// Remove the entry stored under `id`.
    ///
    /// Returns whether an entry was removed. Removing an unknown id, or
    /// from a library that does not exist, leaves the disk untouched.
    pub fn delete_entry(&self, path: &Path, id: &EntryId, backup: bool) -> RegistryResult<bool> {
        if !path.exists() {
            return Ok(false);
        }

        let removed = self.update(path, backup, |document| document.remove(id).is_some())?;

        if removed {
            info!(path = %path.display(), %id, "Deleted entry");
        } else {
            debug!(path = %path.display(), %id, "Entry not present, nothing deleted");
        }
        Ok(removed)
    }

    /// Run several changes in one read-modify-write cycle.
    ///
    /// `apply` returns whether it changed the document; nothing is backed up
    /// or written otherwise. Returns the value of `apply`.
    pub fn update<F>(&self, path: &Path, backup: bool, apply: F) -> RegistryResult<bool>
    where
        F: FnOnce(&mut LibraryDocument) -> bool,
    {
        let _lock = self.lock(path, true)?;

        let existed = path.exists();
        let mut document = if existed {
            read_document(path)?
        } else {
            LibraryDocument::new()
        };

        if !apply(&mut document) {
            return Ok(false);
        }

        if existed && backup {
            backup_file(path)?;
        }
        self.write(path, &document)?;

        Ok(true)
    }

    fn write(&self, path: &Path, document: &LibraryDocument) -> RegistryResult<()> {
        create_parent_dir(path)?;

        match self.mode {
            WriteMode::Direct => fs::write(path, render(path, document)?)
                .map_err(|e| RegistryError::storage(path, e)),
            WriteMode::Atomic => write_atomic(path, document),
        }
    }

    /// Take the advisory lock for `path` in atomic mode.
    ///
    /// The lock is released when the returned file is dropped.
    fn lock(&self, path: &Path, exclusive: bool) -> RegistryResult<Option<File>> {
        if self.mode != WriteMode::Atomic {
            return Ok(None);
        }

        if exclusive {
            create_parent_dir(path)?;
        }

        let lock_path = lock_path(path);
        let file = match OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
        {
            Ok(file) => file,
            // Readers of a library on read-only storage go unlocked
            Err(e) if !exclusive && e.kind() == IoErrorKind::PermissionDenied => {
                debug!(path = %lock_path.display(), "Lock file not writable, reading unlocked");
                return Ok(None);
            }
            Err(e) => return Err(RegistryError::storage(&lock_path, e)),
        };

        let locked = if exclusive {
            file.lock_exclusive()
        } else {
            file.lock_shared()
        };
        locked.map_err(|e| RegistryError::storage(&lock_path, e))?;

        Ok(Some(file))
    }
}

fn create_parent_dir(path: &Path) -> RegistryResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| RegistryError::storage(parent, e))
        }
        _ => Ok(()),
    }
}

fn read_document(path: &Path) -> RegistryResult<LibraryDocument> {
    let content = fs::read_to_string(path).map_err(|e| RegistryError::storage(path, e))?;
    let document = LibraryDocument::parse(path, &content)?;

    debug!(path = %path.display(), entries = document.len(), "Loaded library");
    Ok(document)
}

fn backup_file(path: &Path) -> RegistryResult<()> {
    let backup = backup_path(path);
    fs::copy(path, &backup).map_err(|e| RegistryError::storage(&backup, e))?;

    debug!(path = %backup.display(), "Backed up library");
    Ok(())
}

fn render(path: &Path, document: &LibraryDocument) -> RegistryResult<String> {
    document
        .to_json()
        .map_err(|e| RegistryError::storage(path, e.into()))
}

/// Temp file in `dir` created with the usual umask-derived mode, not 0600
fn temp_file_in(dir: &Path) -> std::io::Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(".assetbank");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    builder.tempfile_in(dir)
}

fn write_atomic(path: &Path, document: &LibraryDocument) -> RegistryResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let content = render(path, document)?;

    let mut temp = temp_file_in(dir).map_err(|e| RegistryError::storage(dir, e))?;
    // A replaced library keeps its mode
    if let Ok(existing) = fs::metadata(path) {
        temp.as_file()
            .set_permissions(existing.permissions())
            .map_err(|e| RegistryError::storage(temp.path(), e))?;
    }
    temp.write_all(content.as_bytes())
        .map_err(|e| RegistryError::storage(temp.path(), e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| RegistryError::storage(temp.path(), e))?;

    temp.persist(path)
        .map_err(|e| RegistryError::storage(path, e.error))?;

    Ok(())
}
