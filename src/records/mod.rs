// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Records flows built on the session and storage layers.
//!
//! - `enrollment` - creating principals and the identity step of login
//! - `grades` - encrypted exam scores

pub mod enrollment;
pub mod grades;

use thiserror::Error;

use crate::error::{EncryptionError, KeyFormatError, KeyGenerationError, SessionError};
use crate::storage::StorageError;

pub use enrollment::{authenticate, enroll_principal, EnrolledPrincipal, NewPrincipal};
pub use grades::{FieldView, GradeBook, GradeView, HiddenReason};

#[derive(Debug, Error)]
pub enum RecordsError {
    #[error("principal {0} already has a key; pass overwrite to replace it")]
    KeyExists(String),

    #[error("login name {0} belongs to another principal")]
    LoginTaken(String),

    #[error("invalid login name or password")]
    InvalidCredentials,

    #[error("invalid {field}: {reason}")]
    InvalidInput {
        field: &'static str,
        reason: String,
    },

    #[error(transparent)]
    KeyGeneration(#[from] KeyGenerationError),

    #[error(transparent)]
    KeyFormat(#[from] KeyFormatError),

    #[error(transparent)]
    Encryption(#[from] EncryptionError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl RecordsError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        RecordsError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}

pub type RecordsResult<T> = Result<T, RecordsError>;
