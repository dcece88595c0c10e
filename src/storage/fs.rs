// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Raw file operations under the vault data directory.
//!
//! Key records and audit logs are plain files. Whole-file writes go to a
//! sibling temp file first and are renamed into place, so a crash never
//! leaves a truncated key behind. On Unix every file is created `0600`.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use super::{StorageError, StorageResult, VaultPaths};

/// Filesystem access rooted at a [`VaultPaths`] layout.
#[derive(Debug, Clone)]
pub struct FileStore {
    paths: VaultPaths,
    initialized: bool,
}

impl FileStore {
    /// Create a new FileStore.
    ///
    /// Does NOT create the directory structure. Call `initialize()` first.
    pub fn new(paths: VaultPaths) -> Self {
        Self {
            paths,
            initialized: false,
        }
    }

    pub fn paths(&self) -> &VaultPaths {
        &self.paths
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Create the vault directory structure. Idempotent.
    pub fn initialize(&mut self) -> StorageResult<()> {
        for dir in [self.paths.keys_dir(), self.paths.audit_dir()] {
            fs::create_dir_all(&dir)?;
        }
        self.initialized = true;
        Ok(())
    }

    /// Replace the contents of `path` atomically.
    pub fn write_raw(&self, path: impl AsRef<Path>, data: &[u8]) -> StorageResult<()> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = temp_sibling(path);
        let written = (|| -> std::io::Result<()> {
            let mut file = owner_only().write(true).create(true).truncate(true).open(&temp_path)?;
            file.write_all(data)?;
            file.sync_all()
        })();
        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        fs::rename(&temp_path, path)?;
        Ok(())
    }

    /// Append `data` to `path`, creating it if needed.
    pub fn append_raw(&self, path: impl AsRef<Path>, data: &[u8]) -> StorageResult<()> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = owner_only().append(true).create(true).open(path)?;
        file.write_all(data)?;
        file.flush()?;
        Ok(())
    }

    /// Read raw bytes from a file.
    pub fn read_raw(&self, path: impl AsRef<Path>) -> StorageResult<Vec<u8>> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }

        let mut file = File::open(path.as_ref())?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Check if a file exists and can be opened.
    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        File::open(path.as_ref()).is_ok()
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(unix)]
fn owner_only() -> OpenOptions {
    use std::os::unix::fs::OpenOptionsExt;
    let mut options = OpenOptions::new();
    options.mode(0o600);
    options
}

#[cfg(not(unix))]
fn owner_only() -> OpenOptions {
    OpenOptions::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, FileStore) {
        let temp = TempDir::new().unwrap();
        let mut store = FileStore::new(VaultPaths::new(temp.path()));
        store.initialize().unwrap();
        (temp, store)
    }

    #[test]
    fn initialize_creates_directories() {
        let (_temp, store) = setup();
        assert!(store.is_initialized());
        assert!(store.paths().keys_dir().is_dir());
        assert!(store.paths().audit_dir().is_dir());
    }

    #[test]
    fn write_and_read_raw() {
        let (_temp, store) = setup();
        let data = b"raw test data with\nnewlines\nand bytes: \x00\x01\x02";

        let path = store.paths().key_file("NV001");
        store.write_raw(&path, data).unwrap();
        assert_eq!(store.read_raw(&path).unwrap(), data);
        assert!(!temp_sibling(&path).exists());
    }

    #[test]
    fn write_raw_replaces_previous_contents() {
        let (_temp, store) = setup();
        let path = store.paths().key_file("NV001");
        store.write_raw(&path, b"first, longer contents").unwrap();
        store.write_raw(&path, b"second").unwrap();
        assert_eq!(store.read_raw(&path).unwrap(), b"second");
    }

    #[cfg(unix)]
    #[test]
    fn files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let (_temp, store) = setup();
        let path = store.paths().key_file("NV001");
        store.write_raw(&path, b"key").unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0);
    }

    #[test]
    fn append_raw_accumulates() {
        let (_temp, store) = setup();
        let path = store.paths().audit_events_file("2026-01-01");
        store.append_raw(&path, b"one\n").unwrap();
        store.append_raw(&path, b"two\n").unwrap();
        assert_eq!(store.read_raw(&path).unwrap(), b"one\ntwo\n");
    }

    #[test]
    fn missing_file_is_not_found() {
        let (_temp, store) = setup();
        let result = store.read_raw(store.paths().key_file("nobody"));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
        assert!(!store.exists(store.paths().key_file("nobody")));
    }

    #[test]
    fn uninitialized_store_returns_error() {
        let store = FileStore::new(VaultPaths::new("/tmp/never-init"));
        let result = store.read_raw("/tmp/any.pem");
        assert!(matches!(result, Err(StorageError::NotInitialized)));
    }
}
