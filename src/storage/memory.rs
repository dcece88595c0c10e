// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory record store.
//!
//! Used by tests and by callers that need a throwaway store. With
//! [`FieldTransport::Base64Text`] ciphertext is kept as base64 text, the way a
//! text-only backend call would carry it, and decoded again on read.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{PrincipalRecord, RecordRef, StorageAdapter, StorageError, StorageResult};
use crate::crypto::CipherCodec;

/// How ciphertext columns are carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldTransport {
    /// Raw bytes in a binary column.
    #[default]
    Binary,
    /// Base64 text for text-only calls.
    Base64Text,
}

#[derive(Debug, Clone)]
enum StoredValue {
    Binary(Vec<u8>),
    Text(String),
}

#[derive(Debug, Default)]
struct Tables {
    principals: HashMap<String, PrincipalRecord>,
    login_index: HashMap<String, String>,
    public_keys: HashMap<String, String>,
    fields: HashMap<RecordRef, StoredValue>,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    transport: FieldTransport,
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transport(transport: FieldTransport) -> Self {
        Self {
            transport,
            tables: RwLock::default(),
        }
    }

    pub fn principal_count(&self) -> usize {
        self.read().principals.len()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StorageAdapter for InMemoryStore {
    fn get_public_key(&self, principal_id: &str) -> StorageResult<String> {
        self.read()
            .public_keys
            .get(principal_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("public key for {principal_id}")))
    }

    fn put_public_key(&self, principal_id: &str, pem_text: &str) -> StorageResult<()> {
        self.write()
            .public_keys
            .insert(principal_id.to_string(), pem_text.to_string());
        Ok(())
    }

    fn put_encrypted_field(&self, record: &RecordRef, ciphertext: &[u8]) -> StorageResult<()> {
        let value = match self.transport {
            FieldTransport::Binary => StoredValue::Binary(ciphertext.to_vec()),
            FieldTransport::Base64Text => {
                StoredValue::Text(CipherCodec::encode_for_storage(ciphertext))
            }
        };
        self.write().fields.insert(record.clone(), value);
        Ok(())
    }

    fn get_encrypted_field(&self, record: &RecordRef) -> StorageResult<Vec<u8>> {
        let value = self
            .read()
            .fields
            .get(record)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("field {record}")))?;

        match value {
            StoredValue::Binary(bytes) => Ok(bytes),
            StoredValue::Text(text) => Ok(CipherCodec::decode_from_storage(&text)?),
        }
    }

    fn put_principal(&self, record: &PrincipalRecord) -> StorageResult<()> {
        let mut tables = self.write();

        if let Some(owner) = tables.login_index.get(&record.login_name) {
            if owner != &record.principal_id {
                return Err(StorageError::AlreadyExists(format!(
                    "login name {}",
                    record.login_name
                )));
            }
        }

        let previous_login = tables
            .principals
            .get(&record.principal_id)
            .map(|p| p.login_name.clone());
        if let Some(previous) = previous_login {
            tables.login_index.remove(&previous);
        }

        tables
            .login_index
            .insert(record.login_name.clone(), record.principal_id.clone());
        tables
            .principals
            .insert(record.principal_id.clone(), record.clone());
        Ok(())
    }

    fn get_principal(&self, principal_id: &str) -> StorageResult<Option<PrincipalRecord>> {
        Ok(self.read().principals.get(principal_id).cloned())
    }

    fn login_owner(&self, login_name: &str) -> StorageResult<Option<String>> {
        Ok(self.read().login_index.get(login_name).cloned())
    }

    fn find_principal_by_credentials(
        &self,
        login_name: &str,
        credential_digest: &[u8],
    ) -> StorageResult<Option<PrincipalRecord>> {
        let tables = self.read();
        let found = tables
            .login_index
            .get(login_name)
            .and_then(|id| tables.principals.get(id))
            .filter(|p| p.credential_digest == credential_digest)
            .cloned();
        Ok(found)
    }
}
