// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Record-store collaborator contract.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{StorageError, StorageResult};

/// Address of one ciphertext column value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordRef {
    pub table: String,
    pub key: String,
}

impl RecordRef {
    pub const GRADES: &'static str = "grades";

    /// Separator between the parts of a composite key.
    pub const KEY_SEPARATOR: char = '/';

    pub fn new(table: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            key: key.into(),
        }
    }

    /// A student's exam score for one course.
    ///
    /// Neither id may be empty or contain [`RecordRef::KEY_SEPARATOR`], so
    /// distinct pairs never share a key.
    pub fn grade(student_id: &str, course_id: &str) -> StorageResult<Self> {
        for (what, id) in [("student id", student_id), ("course id", course_id)] {
            if id.is_empty() || id.contains(Self::KEY_SEPARATOR) {
                return Err(StorageError::InvalidKey(format!(
                    "{what} {id:?} must be non-empty and must not contain '{}'",
                    Self::KEY_SEPARATOR
                )));
            }
        }
        Ok(Self::new(
            Self::GRADES,
            format!("{student_id}{}{course_id}", Self::KEY_SEPARATOR),
        ))
    }

    /// Flat key used by key/value backends.
    pub fn storage_key(&self) -> String {
        format!("{}:{}", self.table, self.key)
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.table, self.key)
    }
}

/// A principal as held by the record store.
///
/// `credential_digest` is the SHA-1 login token and `encrypted_salary` is
/// RSA-OAEP ciphertext under `public_key_pem`; neither is secret on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalRecord {
    pub principal_id: String,
    pub full_name: String,
    pub email: String,
    pub login_name: String,
    pub credential_digest: Vec<u8>,
    pub public_key_pem: String,
    #[serde(default)]
    pub encrypted_salary: Option<Vec<u8>>,
}

/// Storage collaborator for public keys, principals and ciphertext columns.
///
/// Implementations persist ciphertext verbatim: no validation, no
/// transformation, no interpretation. A missing record is
/// [`StorageError::NotFound`](super::StorageError::NotFound).
pub trait StorageAdapter: Send + Sync {
    /// Public key PEM for `principal_id`, exactly as stored.
    fn get_public_key(&self, principal_id: &str) -> StorageResult<String>;

    fn put_public_key(&self, principal_id: &str, pem_text: &str) -> StorageResult<()>;

    fn put_encrypted_field(&self, record: &RecordRef, ciphertext: &[u8]) -> StorageResult<()>;

    fn get_encrypted_field(&self, record: &RecordRef) -> StorageResult<Vec<u8>>;

    /// Insert or replace a principal. A login name already bound to another
    /// principal is [`StorageError::AlreadyExists`](super::StorageError::AlreadyExists).
    fn put_principal(&self, record: &PrincipalRecord) -> StorageResult<()>;

    fn get_principal(&self, principal_id: &str) -> StorageResult<Option<PrincipalRecord>>;

    /// Principal id currently bound to `login_name`, if any.
    fn login_owner(&self, login_name: &str) -> StorageResult<Option<String>>;

    /// Identity step of login: match a login name and credential digest.
    fn find_principal_by_credentials(
        &self,
        login_name: &str,
        credential_digest: &[u8],
    ) -> StorageResult<Option<PrincipalRecord>>;
}
