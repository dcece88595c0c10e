// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Principal enrollment and credential authentication.
//!
//! Login is two explicit steps that happen to use the same secret:
//! [`authenticate`] proves identity against the stored credential digest,
//! then [`SessionKeyContext::login`](crate::session::SessionKeyContext::login)
//! unlocks key material with the passphrase.

use std::path::PathBuf;

use super::{RecordsError, RecordsResult};
use crate::crypto::{CipherCodec, Passphrase};
use crate::keys::manager::check_generation_inputs;
use crate::keys::KeyManager;
use crate::session::{EncryptedAttribute, LoginRecord};
use crate::storage::{AuditEvent, AuditEventType, PrincipalRecord, StorageAdapter};

/// Login attribute carrying the encrypted salary.
pub const SALARY_ATTRIBUTE: &str = "salary";

/// Details of a principal to enroll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPrincipal {
    pub principal_id: String,
    pub full_name: String,
    pub email: String,
    pub login_name: String,
    /// Monthly salary; must be positive.
    pub salary: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrolledPrincipal {
    pub principal_id: String,
    pub key_location: PathBuf,
    pub public_key_pem: String,
}

/// Create a principal: keypair, credential digest, encrypted salary and
/// record-store rows.
///
/// An existing key is only replaced when `overwrite` is set, since the old
/// key is the only way to read values encrypted under it. Every check runs
/// before the key record is touched; the new key is written last, after the
/// record store has accepted the principal.
pub fn enroll_principal(
    keys: &KeyManager,
    storage: &dyn StorageAdapter,
    principal: NewPrincipal,
    passphrase: &Passphrase,
    overwrite: bool,
) -> RecordsResult<EnrolledPrincipal> {
    if principal.login_name.trim().is_empty() {
        return Err(RecordsError::invalid("login_name", "must not be empty"));
    }
    if principal.salary == Some(0) {
        return Err(RecordsError::invalid("salary", "must be greater than zero"));
    }
    check_generation_inputs(&principal.principal_id, passphrase)?;
    if keys.has_key(&principal.principal_id) && !overwrite {
        return Err(RecordsError::KeyExists(principal.principal_id));
    }
    if let Some(owner) = storage.login_owner(&principal.login_name)? {
        if owner != principal.principal_id {
            return Err(RecordsError::LoginTaken(principal.login_name));
        }
    }
    let previous = storage.get_principal(&principal.principal_id)?;

    let private_key = KeyManager::new_private_key()?;
    let public_key = private_key.to_public_key();
    let public_key_pem = KeyManager::public_key_to_pem(&public_key)?;

    let encrypted_salary = principal
        .salary
        .map(|salary| CipherCodec::encrypt(&public_key, &salary.to_string()))
        .transpose()?;

    let record = PrincipalRecord {
        principal_id: principal.principal_id.clone(),
        full_name: principal.full_name,
        email: principal.email,
        login_name: principal.login_name,
        credential_digest: CipherCodec::hash_password(passphrase.expose()).to_vec(),
        public_key_pem: public_key_pem.clone(),
        encrypted_salary,
    };

    storage.put_principal(&record)?;
    let installed = storage
        .put_public_key(&record.principal_id, &public_key_pem)
        .map_err(RecordsError::from)
        .and_then(|()| {
            keys.install_key(&record.principal_id, &private_key, passphrase)
                .map_err(RecordsError::from)
        });
    let (key_location, _) = match installed {
        Ok(installed) => installed,
        Err(e) => {
            restore_previous(storage, previous.as_ref());
            return Err(e);
        }
    };

    tracing::info!(principal_id = %record.principal_id, "principal enrolled");
    if let Some(audit) = keys.audit() {
        audit.record(
            AuditEvent::new(AuditEventType::PrincipalEnrolled)
                .with_principal(&record.principal_id)
                .with_details(serde_json::json!({ "overwrite": overwrite })),
        );
    }

    Ok(EnrolledPrincipal {
        principal_id: record.principal_id,
        key_location,
        public_key_pem,
    })
}

/// Put back the rows a failed re-enrollment replaced, so they keep
/// matching the key record that is still on disk.
fn restore_previous(storage: &dyn StorageAdapter, previous: Option<&PrincipalRecord>) {
    let Some(previous) = previous else {
        return;
    };
    let restored = storage
        .put_principal(previous)
        .and_then(|()| storage.put_public_key(&previous.principal_id, &previous.public_key_pem));
    if let Err(e) = restored {
        tracing::error!(
            principal_id = %previous.principal_id,
            error = %e,
            "failed to restore principal after aborted enrollment"
        );
    }
}

/// Identity step of login: match `login_name` and the password digest.
pub fn authenticate(
    storage: &dyn StorageAdapter,
    login_name: &str,
    password: &Passphrase,
) -> RecordsResult<LoginRecord> {
    let digest = CipherCodec::hash_password(password.expose());
    match storage.find_principal_by_credentials(login_name, &digest)? {
        Some(principal) => {
            tracing::debug!(principal_id = %principal.principal_id, "credentials matched");
            Ok(LoginRecord::from(&principal))
        }
        None => {
            tracing::info!(login_name, "credential check failed");
            Err(RecordsError::InvalidCredentials)
        }
    }
}

impl From<&PrincipalRecord> for LoginRecord {
    fn from(principal: &PrincipalRecord) -> Self {
        let encrypted_attributes = principal
            .encrypted_salary
            .iter()
            .map(|ciphertext| EncryptedAttribute::new(SALARY_ATTRIBUTE, ciphertext.clone()))
            .collect();

        LoginRecord {
            principal_id: principal.principal_id.clone(),
            public_key_pem: Some(principal.public_key_pem.clone()),
            encrypted_attributes,
        }
    }
}
