// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistence for everything the vault keeps outside process memory.
//!
//! ## Storage Layout
//!
//! ```text
//! {DATA_DIR}/
//!   keys/
//!     {principal_id}.pem   # PBES2-encrypted PKCS#8 private key
//!   audit/
//!     {date}/events.jsonl  # Daily audit logs
//!   records.redb           # Principal records, public keys, ciphertext columns
//! ```
//!
//! The record store is reached through the [`StorageAdapter`] trait. Adapters
//! carry ciphertext as opaque bytes and never inspect it.

pub mod adapter;
pub mod audit;
pub mod fs;
pub mod memory;
pub mod paths;
pub mod record_db;

use std::io;

use thiserror::Error;

use crate::error::EncodingError;

pub use adapter::{PrincipalRecord, RecordRef, StorageAdapter};
pub use audit::{AuditEvent, AuditEventType, AuditLog};
pub use fs::FileStore;
pub use memory::{FieldTransport, InMemoryStore};
pub use paths::{is_valid_principal_id, VaultPaths};
pub use record_db::RecordDatabase;

/// Error type for storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("storage not initialized")]
    NotInitialized,

    #[error("invalid record key: {0}")]
    InvalidKey(String),

    #[error("stored text column cannot be decoded: {0}")]
    Encoding(#[from] EncodingError),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),
}

impl From<io::Error> for StorageError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound(e.to_string())
        } else {
            StorageError::Io(e)
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
