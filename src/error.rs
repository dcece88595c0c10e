// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Error Taxonomy
//!
//! Typed errors for key custody, field encryption and session handling.
//!
//! | Error | Raised by |
//! |-------|-----------|
//! | [`KeyGenerationError`] | `KeyManager::generate_key_pair` |
//! | [`KeyLoadError`] | `KeyManager::load_private_key` |
//! | [`KeyFormatError`] | `KeyManager::load_public_key` |
//! | [`EncryptionError`] | `CipherCodec::encrypt` |
//! | [`DecryptionError`] | `CipherCodec::decrypt` |
//! | [`EncodingError`] | `CipherCodec::decode_from_storage` |
//! | [`SessionError`] | `SessionKeyContext` |
//!
//! None of these types ever carries a passphrase, key material or a
//! plaintext value; `Display` output is safe to log.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::records::RecordsError;
use crate::storage::StorageError;
use crate::worker::WorkerError;

/// Failure to create or persist a principal's keypair.
#[derive(Debug, Error)]
pub enum KeyGenerationError {
    #[error("invalid principal id {0:?}")]
    InvalidPrincipal(String),

    #[error("a non-empty passphrase is required to protect the private key")]
    EmptyPassphrase,

    #[error("RSA key generation failed: {0}")]
    Rsa(String),

    #[error("failed to seal private key: {0}")]
    Envelope(String),

    #[error("key location {path} is not writable: {reason}")]
    NotWritable { path: PathBuf, reason: String },
}

/// Why a private key could not be unlocked.
///
/// The UI surfaces every kind as "cannot unlock", but the kinds stay
/// distinct so that a missing record is never reported as a bad passphrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyLoadErrorKind {
    /// No key record exists for the principal.
    NotFound,
    /// The envelope did not open with the supplied passphrase.
    WrongPassphrase,
    /// The record exists but is not a well-formed encrypted PKCS#8 document.
    Corrupt,
}

impl fmt::Display for KeyLoadErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyLoadErrorKind::NotFound => write!(f, "no key record"),
            KeyLoadErrorKind::WrongPassphrase => write!(f, "wrong passphrase"),
            KeyLoadErrorKind::Corrupt => write!(f, "key record is corrupt"),
        }
    }
}

/// Failure to unlock a stored private key.
#[derive(Debug, Clone, Error)]
#[error("cannot unlock private key for principal {principal_id}: {kind}")]
pub struct KeyLoadError {
    pub principal_id: String,
    pub kind: KeyLoadErrorKind,
}

impl KeyLoadError {
    pub fn new(principal_id: impl Into<String>, kind: KeyLoadErrorKind) -> Self {
        Self {
            principal_id: principal_id.into(),
            kind,
        }
    }

    pub fn not_found(principal_id: impl Into<String>) -> Self {
        Self::new(principal_id, KeyLoadErrorKind::NotFound)
    }

    pub fn wrong_passphrase(principal_id: impl Into<String>) -> Self {
        Self::new(principal_id, KeyLoadErrorKind::WrongPassphrase)
    }

    pub fn corrupt(principal_id: impl Into<String>) -> Self {
        Self::new(principal_id, KeyLoadErrorKind::Corrupt)
    }
}

/// Malformed public key text.
#[derive(Debug, Error)]
pub enum KeyFormatError {
    #[error("public key is not valid PEM: {0}")]
    Pem(String),

    #[error("unexpected PEM label {0:?}")]
    UnexpectedLabel(String),

    #[error("public key DER is malformed: {0}")]
    Der(String),
}

/// Failure to encrypt a field value.
#[derive(Debug, Error)]
pub enum EncryptionError {
    #[error("plaintext is {len} bytes, the key can encrypt at most {max}")]
    PlaintextTooLong { len: usize, max: usize },

    #[error("refusing to encrypt an empty value")]
    EmptyPlaintext,

    #[error("public key cannot be used for encryption: {0}")]
    InvalidKey(String),
}

/// Failure to decrypt a field value.
///
/// Deliberately a single variant: callers cannot tell a foreign key from
/// corrupted data. The concrete cause is only emitted at `debug` level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecryptionError {
    #[error("decryption failed")]
    PaddingOrKeyMismatch,
}

/// Stored text could not be turned back into binary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("stored value is not valid base64: {0}")]
    InvalidBase64(String),
}

/// Failure to recover a value read from a text column.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoredFieldError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Decryption(#[from] DecryptionError),
}

/// Errors raised by `SessionKeyContext`.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no principal is logged in")]
    NotAuthenticated,

    #[error("principal {0} is already logged in")]
    AlreadyAuthenticated(String),

    #[error("login record has no principal identifier")]
    InvalidPrincipal,

    #[error("private key material is not available in this session")]
    KeyUnavailable,

    #[error("no public key is on record for principal {0}")]
    NoPublicKey(String),

    #[error(transparent)]
    Encryption(#[from] EncryptionError),

    #[error(transparent)]
    Decryption(#[from] DecryptionError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

impl From<StoredFieldError> for SessionError {
    fn from(err: StoredFieldError) -> Self {
        match err {
            StoredFieldError::Encoding(e) => SessionError::Encoding(e),
            StoredFieldError::Decryption(e) => SessionError::Decryption(e),
        }
    }
}

/// Crate-wide error used by the binary and by callers that do not care
/// which subsystem failed.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error(transparent)]
    KeyGeneration(#[from] KeyGenerationError),

    #[error(transparent)]
    KeyLoad(#[from] KeyLoadError),

    #[error(transparent)]
    KeyFormat(#[from] KeyFormatError),

    #[error(transparent)]
    Encryption(#[from] EncryptionError),

    #[error(transparent)]
    Decryption(#[from] DecryptionError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    StoredField(#[from] StoredFieldError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Records(#[from] RecordsError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error("invalid usage: {0}")]
    Usage(String),
}

pub type VaultResult<T> = Result<T, VaultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_load_error_names_principal_and_kind() {
        let err = KeyLoadError::wrong_passphrase("NV001");
        assert_eq!(err.kind, KeyLoadErrorKind::WrongPassphrase);
        assert_eq!(
            err.to_string(),
            "cannot unlock private key for principal NV001: wrong passphrase"
        );
    }

    #[test]
    fn decryption_error_has_constant_shape() {
        assert_eq!(DecryptionError::PaddingOrKeyMismatch.to_string(), "decryption failed");
    }

    #[test]
    fn key_load_kind_serializes_snake_case() {
        let json = serde_json::to_string(&KeyLoadErrorKind::WrongPassphrase).unwrap();
        assert_eq!(json, "\"wrong_passphrase\"");
    }

    #[test]
    fn session_error_wraps_codec_errors_transparently() {
        let err: SessionError = EncryptionError::PlaintextTooLong { len: 200, max: 190 }.into();
        assert_eq!(
            err.to_string(),
            "plaintext is 200 bytes, the key can encrypt at most 190"
        );
    }
}
