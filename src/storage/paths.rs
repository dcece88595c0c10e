// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path constants and utilities for the vault data directory.

use std::path::{Path, PathBuf};

use crate::config::DEFAULT_DATA_DIR;

/// Longest accepted principal identifier.
pub const MAX_PRINCIPAL_ID_LEN: usize = 64;

/// Extension of private-key records.
pub const KEY_FILE_EXTENSION: &str = "pem";

/// Whether `principal_id` can address a key record.
///
/// Identifiers become file names, so only `[A-Za-z0-9._-]` is accepted and
/// the relative names `.` and `..` are refused.
pub fn is_valid_principal_id(principal_id: &str) -> bool {
    !principal_id.is_empty()
        && principal_id.len() <= MAX_PRINCIPAL_ID_LEN
        && principal_id != "."
        && principal_id != ".."
        && principal_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
}

/// Storage path utilities for the vault.
#[derive(Debug, Clone)]
pub struct VaultPaths {
    root: PathBuf,
}

impl Default for VaultPaths {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_DIR)
    }
}

impl VaultPaths {
    /// Create a new VaultPaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory for all vault data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // ========== Key Paths ==========

    /// Directory containing all encrypted private-key records.
    pub fn keys_dir(&self) -> PathBuf {
        self.root.join("keys")
    }

    /// Path to a principal's encrypted private key.
    ///
    /// Callers must validate `principal_id` first.
    pub fn key_file(&self, principal_id: &str) -> PathBuf {
        self.keys_dir()
            .join(format!("{principal_id}.{KEY_FILE_EXTENSION}"))
    }

    // ========== Record Database ==========

    /// Path to the embedded record database.
    pub fn record_db(&self) -> PathBuf {
        self.root.join("records.redb")
    }

    // ========== Audit Log Paths ==========

    /// Directory containing audit logs.
    pub fn audit_dir(&self) -> PathBuf {
        self.root.join("audit")
    }

    /// Directory for a specific date's audit logs.
    pub fn audit_date_dir(&self, date: &str) -> PathBuf {
        self.audit_dir().join(date)
    }

    /// Path to a daily audit events file (JSONL format).
    pub fn audit_events_file(&self, date: &str) -> PathBuf {
        self.audit_date_dir(date).join("events.jsonl")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths_use_data_dir() {
        let paths = VaultPaths::default();
        assert_eq!(paths.root(), Path::new("./data"));
    }

    #[test]
    fn key_paths_are_correct() {
        let paths = VaultPaths::new("/tmp/vault");
        assert_eq!(paths.keys_dir(), PathBuf::from("/tmp/vault/keys"));
        assert_eq!(paths.key_file("NV001"), PathBuf::from("/tmp/vault/keys/NV001.pem"));
    }

    #[test]
    fn audit_and_db_paths_are_correct() {
        let paths = VaultPaths::new("/tmp/vault");
        assert_eq!(paths.record_db(), PathBuf::from("/tmp/vault/records.redb"));
        assert_eq!(
            paths.audit_events_file("2026-03-01"),
            PathBuf::from("/tmp/vault/audit/2026-03-01/events.jsonl")
        );
    }

    #[test]
    fn principal_id_validation() {
        for ok in ["NV001", "nv-002", "staff.lead_3", "a"] {
            assert!(is_valid_principal_id(ok), "{ok}");
        }

        let too_long = "x".repeat(MAX_PRINCIPAL_ID_LEN + 1);
        for bad in [
            "",
            ".",
            "..",
            "../etc/passwd",
            "a/b",
            "a\\b",
            "NV 001",
            "nv\0",
            too_long.as_str(),
        ] {
            assert!(!is_valid_principal_id(bad), "{bad:?}");
        }
    }
}
