// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded record database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `principals`: principal_id → serialized PrincipalRecord
//! - `login_index`: login_name → principal_id
//! - `public_keys`: principal_id → public key PEM
//! - `encrypted_fields`: `table:key` → ciphertext bytes (opaque)

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::{PrincipalRecord, RecordRef, StorageAdapter, StorageError, StorageResult};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: principal_id → serialized PrincipalRecord (JSON bytes).
const PRINCIPALS: TableDefinition<&str, &[u8]> = TableDefinition::new("principals");

/// Index: login_name → principal_id.
const LOGIN_INDEX: TableDefinition<&str, &str> = TableDefinition::new("login_index");

/// Public key PEM text, stored verbatim.
const PUBLIC_KEYS: TableDefinition<&str, &str> = TableDefinition::new("public_keys");

/// Ciphertext columns keyed by `RecordRef::storage_key`.
const ENCRYPTED_FIELDS: TableDefinition<&str, &[u8]> = TableDefinition::new("encrypted_fields");

// =============================================================================
// RecordDatabase
// =============================================================================

/// Persistent [`StorageAdapter`].
pub struct RecordDatabase {
    db: Database,
}

impl RecordDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(PRINCIPALS)?;
            let _ = write_txn.open_table(LOGIN_INDEX)?;
            let _ = write_txn.open_table(PUBLIC_KEYS)?;
            let _ = write_txn.open_table(ENCRYPTED_FIELDS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }
}

impl StorageAdapter for RecordDatabase {
    fn get_public_key(&self, principal_id: &str) -> StorageResult<String> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PUBLIC_KEYS)?;
        let pem = table
            .get(principal_id)?
            .map(|v| v.value().to_string())
            .ok_or_else(|| StorageError::NotFound(format!("public key for {principal_id}")))?;
        Ok(pem)
    }

    fn put_public_key(&self, principal_id: &str, pem_text: &str) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(PUBLIC_KEYS)?;
            table.insert(principal_id, pem_text)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn put_encrypted_field(&self, record: &RecordRef, ciphertext: &[u8]) -> StorageResult<()> {
        let key = record.storage_key();
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(ENCRYPTED_FIELDS)?;
            table.insert(key.as_str(), ciphertext)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get_encrypted_field(&self, record: &RecordRef) -> StorageResult<Vec<u8>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ENCRYPTED_FIELDS)?;
        let bytes = table
            .get(record.storage_key().as_str())?
            .map(|v| v.value().to_vec())
            .ok_or_else(|| StorageError::NotFound(format!("field {record}")))?;
        Ok(bytes)
    }

    fn put_principal(&self, record: &PrincipalRecord) -> StorageResult<()> {
        let json = serde_json::to_vec(record)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut login_table = write_txn.open_table(LOGIN_INDEX)?;
            let owner = login_table
                .get(record.login_name.as_str())?
                .map(|v| v.value().to_string());
            if owner.as_deref().is_some_and(|id| id != record.principal_id) {
                return Err(StorageError::AlreadyExists(format!(
                    "login name {}",
                    record.login_name
                )));
            }

            let mut principals = write_txn.open_table(PRINCIPALS)?;
            let previous_login = match principals.get(record.principal_id.as_str())? {
                Some(value) => {
                    let previous: PrincipalRecord = serde_json::from_slice(value.value())?;
                    Some(previous.login_name)
                }
                None => None,
            };
            if let Some(previous) = previous_login {
                login_table.remove(previous.as_str())?;
            }

            login_table.insert(record.login_name.as_str(), record.principal_id.as_str())?;
            principals.insert(record.principal_id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get_principal(&self, principal_id: &str) -> StorageResult<Option<PrincipalRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRINCIPALS)?;
        match table.get(principal_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn login_owner(&self, login_name: &str) -> StorageResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LOGIN_INDEX)?;
        Ok(table.get(login_name)?.map(|v| v.value().to_string()))
    }

    fn find_principal_by_credentials(
        &self,
        login_name: &str,
        credential_digest: &[u8],
    ) -> StorageResult<Option<PrincipalRecord>> {
        let read_txn = self.db.begin_read()?;
        let login_table = read_txn.open_table(LOGIN_INDEX)?;
        let Some(principal_id) = login_table.get(login_name)?.map(|v| v.value().to_string()) else {
            return Ok(None);
        };

        let principals = read_txn.open_table(PRINCIPALS)?;
        let Some(value) = principals.get(principal_id.as_str())? else {
            return Ok(None);
        };
        let record: PrincipalRecord = serde_json::from_slice(value.value())?;

        if record.credential_digest == credential_digest {
            Ok(Some(record))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db() -> (RecordDatabase, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = RecordDatabase::open(&dir.path().join("records.redb")).unwrap();
        (db, dir)
    }

    fn sample_principal(id: &str, login: &str) -> PrincipalRecord {
        PrincipalRecord {
            principal_id: id.to_string(),
            full_name: "Nguyen Van A".to_string(),
            email: "nva@example.org".to_string(),
            login_name: login.to_string(),
            credential_digest: vec![0xaa; 20],
            public_key_pem: "-----BEGIN PUBLIC KEY-----\nMIIB\n-----END PUBLIC KEY-----\n"
                .to_string(),
            encrypted_salary: Some(vec![0x5a; 256]),
        }
    }

    #[test]
    fn public_key_put_and_get() {
        let (db, _dir) = temp_db();
        let pem = "-----BEGIN PUBLIC KEY-----\nMIIB\n-----END PUBLIC KEY-----\n";
        db.put_public_key("NV001", pem).unwrap();
        assert_eq!(db.get_public_key("NV001").unwrap(), pem);
        assert!(matches!(db.get_public_key("NV002"), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn ciphertext_is_stored_verbatim() {
        let (db, _dir) = temp_db();
        let record = RecordRef::grade("SV01", "CSC101").unwrap();
        let ciphertext: Vec<u8> = (0..=255u8).rev().collect();

        db.put_encrypted_field(&record, &ciphertext).unwrap();
        assert_eq!(db.get_encrypted_field(&record).unwrap(), ciphertext);

        db.put_encrypted_field(&record, &[1, 2, 3]).unwrap();
        assert_eq!(db.get_encrypted_field(&record).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn principal_lookup_by_credentials() {
        let (db, _dir) = temp_db();
        let principal = sample_principal("NV001", "nva");
        db.put_principal(&principal).unwrap();

        assert_eq!(db.get_principal("NV001").unwrap(), Some(principal.clone()));
        assert_eq!(
            db.find_principal_by_credentials("nva", &[0xaa; 20]).unwrap(),
            Some(principal)
        );
        assert!(db.find_principal_by_credentials("nva", &[0xab; 20]).unwrap().is_none());
        assert!(db.find_principal_by_credentials("ghost", &[0xaa; 20]).unwrap().is_none());
    }

    #[test]
    fn duplicate_login_name_is_rejected() {
        let (db, _dir) = temp_db();
        db.put_principal(&sample_principal("NV001", "nva")).unwrap();
        let result = db.put_principal(&sample_principal("NV002", "nva"));
        assert!(matches!(result, Err(StorageError::AlreadyExists(_))));
        assert!(db.get_principal("NV002").unwrap().is_none());
        assert_eq!(db.login_owner("nva").unwrap().as_deref(), Some("NV001"));
        assert!(db.login_owner("nvb").unwrap().is_none());
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.redb");
        {
            let db = RecordDatabase::open(&path).unwrap();
            db.put_principal(&sample_principal("NV001", "nva")).unwrap();
            let grade = RecordRef::grade("SV01", "CSC101").unwrap();
            db.put_encrypted_field(&grade, &[9; 256]).unwrap();
        }
        let db = RecordDatabase::open(&path).unwrap();
        assert!(db.get_principal("NV001").unwrap().is_some());
        let grade = RecordRef::grade("SV01", "CSC101").unwrap();
        assert_eq!(db.get_encrypted_field(&grade).unwrap(), vec![9; 256]);
    }
}
