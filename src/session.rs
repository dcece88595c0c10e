// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Key Context
//!
//! Holds one principal's key material for the span of an authenticated
//! session and exposes encryption scoped to that principal.
//!
//! ```text
//! Unauthenticated --login--> Authenticating --> Authenticated --logout--> Unauthenticated
//! ```
//!
//! Login never fails because the private key could not be unlocked. The
//! session instead records [`KeyStatus::Unavailable`] and every decrypt call
//! checks it. Encrypted attributes that arrive with the login record are
//! decrypted best-effort and reported per attribute as an [`Enrichment`].
//!
//! Values are always encrypted under the logged-in principal's own public
//! key, so only that principal can read them back.

use std::fmt;
use std::sync::Arc;

use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::Serialize;
use zeroize::Zeroizing;

use crate::crypto::{CipherCodec, Passphrase};
use crate::error::{EncryptionError, KeyLoadErrorKind, SessionError};
use crate::keys::KeyManager;
use crate::storage::{AuditEvent, AuditEventType};

pub type SessionResult<T> = Result<T, SessionError>;

/// What the identity step hands to [`SessionKeyContext::login`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginRecord {
    pub principal_id: String,
    /// Public key PEM as stored for the principal.
    pub public_key_pem: Option<String>,
    /// Ciphertext attributes shipped with the authentication response.
    pub encrypted_attributes: Vec<EncryptedAttribute>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedAttribute {
    pub name: String,
    pub ciphertext: Vec<u8>,
}

impl EncryptedAttribute {
    pub fn new(name: impl Into<String>, ciphertext: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            ciphertext,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Authenticated,
}

/// Whether the session holds the principal's private key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum KeyStatus {
    Loaded,
    Unavailable(KeyLoadErrorKind),
}

impl KeyStatus {
    pub fn is_loaded(&self) -> bool {
        matches!(self, KeyStatus::Loaded)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStatus {
    Decrypted,
    DecryptFailed,
    KeysUnavailable,
}

/// Outcome of decrypting one login attribute.
///
/// `value` is `Some` only when `status` is `Decrypted`, so a legitimate
/// zero is never confused with a failure.
#[derive(Clone, PartialEq, Eq)]
pub struct Enrichment {
    pub attribute: String,
    pub value: Option<Zeroizing<String>>,
    pub status: EnrichmentStatus,
}

impl Enrichment {
    pub fn value(&self) -> Option<&str> {
        self.value.as_ref().map(|v| v.as_str())
    }
}

impl fmt::Debug for Enrichment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Enrichment")
            .field("attribute", &self.attribute)
            .field("value", &self.value.as_ref().map(|_| "<redacted>"))
            .field("status", &self.status)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub principal_id: String,
    pub key_status: KeyStatus,
    pub enrichments: Vec<Enrichment>,
}

impl LoginOutcome {
    pub fn enrichment(&self, attribute: &str) -> Option<&Enrichment> {
        self.enrichments.iter().find(|e| e.attribute == attribute)
    }
}

struct ActivePrincipal {
    principal_id: String,
    public_key: Option<RsaPublicKey>,
    passphrase: Passphrase,
    private_key: Option<RsaPrivateKey>,
    key_status: KeyStatus,
}

/// Public-key-only handle for encrypting on another thread.
#[derive(Debug, Clone)]
pub struct SelfEncryptor {
    principal_id: String,
    public_key: RsaPublicKey,
}

impl SelfEncryptor {
    pub fn principal_id(&self) -> &str {
        &self.principal_id
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<Vec<u8>, EncryptionError> {
        CipherCodec::encrypt(&self.public_key, plaintext)
    }

    pub fn encrypt_for_storage(&self, plaintext: &str) -> Result<String, EncryptionError> {
        CipherCodec::encrypt_for_storage(&self.public_key, plaintext)
    }
}

/// Key material of the logged-in principal.
///
/// Not shared between sessions; create one per login and pass it by
/// reference. Dropping the context logs out.
pub struct SessionKeyContext {
    keys: Arc<KeyManager>,
    state: SessionState,
    active: Option<ActivePrincipal>,
}

impl SessionKeyContext {
    pub fn new(keys: Arc<KeyManager>) -> Self {
        Self {
            keys,
            state: SessionState::Unauthenticated,
            active: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    pub fn principal_id(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.principal_id.as_str())
    }

    pub fn key_status(&self) -> Option<KeyStatus> {
        self.active.as_ref().map(|a| a.key_status)
    }

    pub fn public_key(&self) -> Option<&RsaPublicKey> {
        self.active.as_ref().and_then(|a| a.public_key.as_ref())
    }

    /// Unlock key material for an already identified principal.
    ///
    /// Fails only for a session that is already logged in or a record
    /// without a principal id.
    pub fn login(
        &mut self,
        record: &LoginRecord,
        passphrase: Passphrase,
    ) -> SessionResult<LoginOutcome> {
        if let Some(active) = &self.active {
            return Err(SessionError::AlreadyAuthenticated(active.principal_id.clone()));
        }
        let principal_id = record.principal_id.trim();
        if principal_id.is_empty() {
            return Err(SessionError::InvalidPrincipal);
        }

        self.state = SessionState::Authenticating;

        let public_key = record.public_key_pem.as_deref().and_then(|pem| {
            KeyManager::load_public_key(pem)
                .map_err(|e| {
                    tracing::warn!(
                        principal_id,
                        error = %e,
                        "login record carries an unusable public key"
                    );
                })
                .ok()
        });

        let loaded = self.keys.load_private_key(principal_id, &passphrase);
        let (private_key, key_status) = match loaded {
            Ok(key) => (Some(key), KeyStatus::Loaded),
            Err(e) => (None, KeyStatus::Unavailable(e.kind)),
        };

        let enrichments = record
            .encrypted_attributes
            .iter()
            .map(|attribute| self.enrich(principal_id, private_key.as_ref(), attribute))
            .collect();

        self.active = Some(ActivePrincipal {
            principal_id: principal_id.to_string(),
            public_key,
            passphrase,
            private_key,
            key_status,
        });
        self.state = SessionState::Authenticated;

        tracing::info!(principal_id, key_status = ?key_status, "session opened");
        self.audit(
            AuditEvent::new(AuditEventType::SessionOpened)
                .with_principal(principal_id)
                .with_details(serde_json::json!({ "key_status": key_status })),
        );

        Ok(LoginOutcome {
            principal_id: principal_id.to_string(),
            key_status,
            enrichments,
        })
    }

    fn enrich(
        &self,
        principal_id: &str,
        private_key: Option<&RsaPrivateKey>,
        attribute: &EncryptedAttribute,
    ) -> Enrichment {
        let Some(private_key) = private_key else {
            return Enrichment {
                attribute: attribute.name.clone(),
                value: None,
                status: EnrichmentStatus::KeysUnavailable,
            };
        };

        match CipherCodec::decrypt(private_key, &attribute.ciphertext) {
            Ok(plaintext) => Enrichment {
                attribute: attribute.name.clone(),
                value: Some(Zeroizing::new(plaintext)),
                status: EnrichmentStatus::Decrypted,
            },
            Err(e) => {
                tracing::warn!(
                    principal_id,
                    attribute = %attribute.name,
                    error = %e,
                    "login attribute could not be decrypted"
                );
                self.audit(
                    AuditEvent::new(AuditEventType::FieldDecryptFailed)
                        .with_principal(principal_id)
                        .with_resource("attribute", attribute.name.clone())
                        .failed(e.to_string()),
                );
                Enrichment {
                    attribute: attribute.name.clone(),
                    value: None,
                    status: EnrichmentStatus::DecryptFailed,
                }
            }
        }
    }

    /// Retry unlocking the private key with the retained passphrase.
    pub fn unlock_keys(&mut self) -> SessionResult<KeyStatus> {
        let active = self.active.as_mut().ok_or(SessionError::NotAuthenticated)?;
        if active.key_status.is_loaded() {
            return Ok(KeyStatus::Loaded);
        }

        match self
            .keys
            .load_private_key(&active.principal_id, &active.passphrase)
        {
            Ok(key) => {
                active.private_key = Some(key);
                active.key_status = KeyStatus::Loaded;
            }
            Err(e) => active.key_status = KeyStatus::Unavailable(e.kind),
        }
        Ok(active.key_status)
    }

    /// Discard all key material and return to `Unauthenticated`.
    ///
    /// The private key and passphrase zeroize their memory on drop.
    pub fn logout(&mut self) {
        self.state = SessionState::Unauthenticated;
        if let Some(active) = self.active.take() {
            tracing::info!(principal_id = %active.principal_id, "session closed");
            self.audit(
                AuditEvent::new(AuditEventType::SessionClosed).with_principal(&active.principal_id),
            );
            drop(active);
        }
    }

    /// Encrypt under the logged-in principal's own public key.
    pub fn encrypt_for_self(&self, plaintext: &str) -> SessionResult<Vec<u8>> {
        let public_key = self.require_public_key()?;
        Ok(CipherCodec::encrypt(public_key, plaintext)?)
    }

    /// Decrypt with the logged-in principal's private key.
    pub fn decrypt_for_self(&self, ciphertext: &[u8]) -> SessionResult<String> {
        let private_key = self.require_private_key()?;
        Ok(CipherCodec::decrypt(private_key, ciphertext)?)
    }

    pub fn encrypt_for_self_to_storage(&self, plaintext: &str) -> SessionResult<String> {
        let public_key = self.require_public_key()?;
        Ok(CipherCodec::encrypt_for_storage(public_key, plaintext)?)
    }

    pub fn decrypt_for_self_from_storage(&self, text: &str) -> SessionResult<String> {
        let private_key = self.require_private_key()?;
        Ok(CipherCodec::decrypt_from_storage(private_key, text)?)
    }

    /// A `Send` handle that can encrypt for this principal off-thread.
    pub fn self_encryptor(&self) -> SessionResult<SelfEncryptor> {
        let public_key = self.require_public_key()?.clone();
        let principal_id = self.principal_id().unwrap_or_default().to_string();
        Ok(SelfEncryptor {
            principal_id,
            public_key,
        })
    }

    /// Report a ciphertext that failed to decrypt on a read path.
    pub(crate) fn note_decrypt_failure(&self, resource: &str, error: &SessionError) {
        let principal_id = self.principal_id().unwrap_or_default();
        tracing::warn!(principal_id, resource, error = %error, "stored field hidden");
        self.audit(
            AuditEvent::new(AuditEventType::FieldDecryptFailed)
                .with_principal(principal_id)
                .with_resource("field", resource)
                .failed(error.to_string()),
        );
    }

    fn require_active(&self) -> SessionResult<&ActivePrincipal> {
        match (&self.state, &self.active) {
            (SessionState::Authenticated, Some(active)) => Ok(active),
            _ => Err(SessionError::NotAuthenticated),
        }
    }

    fn require_public_key(&self) -> SessionResult<&RsaPublicKey> {
        let active = self.require_active()?;
        active
            .public_key
            .as_ref()
            .ok_or_else(|| SessionError::NoPublicKey(active.principal_id.clone()))
    }

    fn require_private_key(&self) -> SessionResult<&RsaPrivateKey> {
        self.require_active()?
            .private_key
            .as_ref()
            .ok_or(SessionError::KeyUnavailable)
    }

    fn audit(&self, event: AuditEvent) {
        if let Some(audit) = self.keys.audit() {
            audit.record(event);
        }
    }
}

impl fmt::Debug for SessionKeyContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKeyContext")
            .field("state", &self.state)
            .field("principal_id", &self.principal_id())
            .field("key_status", &self.key_status())
            .finish_non_exhaustive()
    }
}

impl Drop for SessionKeyContext {
    fn drop(&mut self) {
        self.logout();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KdfProfile;
    use crate::error::DecryptionError;
    use crate::storage::VaultPaths;
    use crate::test_support::{fast_kdf, principal_key_a, principal_key_b};
    use std::path::Path;
    use tempfile::TempDir;

    /// Key manager with NV001 holding key A under "secretpw".
    fn setup() -> (TempDir, Arc<KeyManager>) {
        let temp = TempDir::new().unwrap();
        let manager = KeyManager::open(VaultPaths::new(temp.path()), fast_kdf()).unwrap();
        write_key(temp.path(), "NV001", principal_key_a(), "secretpw", fast_kdf());
        (temp, Arc::new(manager.with_audit_log()))
    }

    fn write_key(root: &Path, id: &str, key: &RsaPrivateKey, pw: &str, kdf: KdfProfile) {
        let document = crate::crypto::envelope::seal(key, &Passphrase::new(pw), kdf).unwrap();
        std::fs::write(VaultPaths::new(root).key_file(id), document).unwrap();
    }

    fn record_for(id: &str, key: &RsaPrivateKey) -> LoginRecord {
        LoginRecord {
            principal_id: id.to_string(),
            public_key_pem: Some(KeyManager::public_key_to_pem(&key.to_public_key()).unwrap()),
            encrypted_attributes: Vec::new(),
        }
    }

    #[test]
    fn login_unlocks_key_and_round_trips() {
        let (_temp, keys) = setup();
        let mut session = SessionKeyContext::new(keys);
        assert_eq!(session.state(), SessionState::Unauthenticated);

        let outcome = session
            .login(&record_for("NV001", principal_key_a()), Passphrase::new("secretpw"))
            .unwrap();
        assert_eq!(outcome.key_status, KeyStatus::Loaded);
        assert!(session.is_authenticated());
        assert_eq!(session.principal_id(), Some("NV001"));

        let ciphertext = session.encrypt_for_self("8.5").unwrap();
        assert_eq!(ciphertext.len(), 256);
        assert_eq!(session.decrypt_for_self(&ciphertext).unwrap(), "8.5");
    }

    #[test]
    fn wrong_passphrase_authenticates_without_keys() {
        let (_temp, keys) = setup();
        let mut session = SessionKeyContext::new(keys);

        let outcome = session
            .login(&record_for("NV001", principal_key_a()), Passphrase::new("wrongpw"))
            .unwrap();
        assert_eq!(
            outcome.key_status,
            KeyStatus::Unavailable(KeyLoadErrorKind::WrongPassphrase)
        );
        assert!(session.is_authenticated());

        let ciphertext = session.encrypt_for_self("8.5").unwrap();
        assert!(matches!(
            session.decrypt_for_self(&ciphertext),
            Err(SessionError::KeyUnavailable)
        ));
    }

    #[test]
    fn missing_key_record_is_reported_as_not_found() {
        let (_temp, keys) = setup();
        let mut session = SessionKeyContext::new(keys);
        let outcome = session
            .login(&record_for("NV002", principal_key_b()), Passphrase::new("secretpw"))
            .unwrap();
        assert_eq!(
            outcome.key_status,
            KeyStatus::Unavailable(KeyLoadErrorKind::NotFound)
        );
    }

    #[test]
    fn empty_principal_id_is_rejected() {
        let (_temp, keys) = setup();
        let mut session = SessionKeyContext::new(keys);
        let record = LoginRecord {
            principal_id: "  ".to_string(),
            ..LoginRecord::default()
        };
        assert!(matches!(
            session.login(&record, Passphrase::new("secretpw")),
            Err(SessionError::InvalidPrincipal)
        ));
        assert_eq!(session.state(), SessionState::Unauthenticated);
    }

    #[test]
    fn second_login_requires_logout() {
        let (_temp, keys) = setup();
        let mut session = SessionKeyContext::new(keys);
        let record = record_for("NV001", principal_key_a());
        session.login(&record, Passphrase::new("secretpw")).unwrap();

        assert!(matches!(
            session.login(&record, Passphrase::new("secretpw")),
            Err(SessionError::AlreadyAuthenticated(id)) if id == "NV001"
        ));

        session.logout();
        session.login(&record, Passphrase::new("secretpw")).unwrap();
    }

    #[test]
    fn logout_clears_key_material() {
        let (_temp, keys) = setup();
        let mut session = SessionKeyContext::new(keys);
        session
            .login(&record_for("NV001", principal_key_a()), Passphrase::new("secretpw"))
            .unwrap();
        let ciphertext = session.encrypt_for_self("8.5").unwrap();

        session.logout();
        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert_eq!(session.principal_id(), None);
        assert!(matches!(
            session.decrypt_for_self(&ciphertext),
            Err(SessionError::NotAuthenticated)
        ));
        assert!(matches!(
            session.encrypt_for_self("1"),
            Err(SessionError::NotAuthenticated)
        ));

        session.logout();
    }

    #[test]
    fn record_without_public_key_cannot_encrypt() {
        let (_temp, keys) = setup();
        let mut session = SessionKeyContext::new(keys);
        let record = LoginRecord {
            principal_id: "NV001".to_string(),
            public_key_pem: None,
            encrypted_attributes: Vec::new(),
        };
        session.login(&record, Passphrase::new("secretpw")).unwrap();

        assert!(matches!(
            session.encrypt_for_self("8.5"),
            Err(SessionError::NoPublicKey(id)) if id == "NV001"
        ));
        assert!(matches!(session.self_encryptor(), Err(SessionError::NoPublicKey(_))));
    }

    #[test]
    fn malformed_public_key_degrades_to_no_public_key() {
        let (_temp, keys) = setup();
        let mut session = SessionKeyContext::new(keys);
        let record = LoginRecord {
            principal_id: "NV001".to_string(),
            public_key_pem: Some("garbage".to_string()),
            encrypted_attributes: Vec::new(),
        };
        let outcome = session.login(&record, Passphrase::new("secretpw")).unwrap();
        assert_eq!(outcome.key_status, KeyStatus::Loaded);
        assert!(session.public_key().is_none());
    }

    #[test]
    fn login_attributes_are_enriched_best_effort() {
        let (_temp, keys) = setup();
        let public = principal_key_a().to_public_key();

        let mut record = record_for("NV001", principal_key_a());
        record.encrypted_attributes = vec![
            EncryptedAttribute::new("salary", CipherCodec::encrypt(&public, "0").unwrap()),
            EncryptedAttribute::new(
                "bonus",
                CipherCodec::encrypt(&principal_key_b().to_public_key(), "100").unwrap(),
            ),
        ];

        let mut session = SessionKeyContext::new(Arc::clone(&keys));
        let outcome = session.login(&record, Passphrase::new("secretpw")).unwrap();

        let salary = outcome.enrichment("salary").unwrap();
        assert_eq!(salary.status, EnrichmentStatus::Decrypted);
        assert_eq!(salary.value(), Some("0"));

        let bonus = outcome.enrichment("bonus").unwrap();
        assert_eq!(bonus.status, EnrichmentStatus::DecryptFailed);
        assert_eq!(bonus.value(), None);
        assert!(!format!("{outcome:?}").contains("\"0\""));

        session.logout();
        let outcome = session.login(&record, Passphrase::new("wrongpw")).unwrap();
        assert!(outcome
            .enrichments
            .iter()
            .all(|e| e.status == EnrichmentStatus::KeysUnavailable && e.value.is_none()));
    }

    #[test]
    fn unlock_keys_picks_up_a_key_created_after_login() {
        let (temp, keys) = setup();
        let mut session = SessionKeyContext::new(keys);
        let outcome = session
            .login(&record_for("NV002", principal_key_b()), Passphrase::new("pw2"))
            .unwrap();
        assert!(!outcome.key_status.is_loaded());

        write_key(temp.path(), "NV002", principal_key_b(), "pw2", fast_kdf());
        assert_eq!(session.unlock_keys().unwrap(), KeyStatus::Loaded);

        let ciphertext = session.encrypt_for_self("7").unwrap();
        assert_eq!(session.decrypt_for_self(&ciphertext).unwrap(), "7");
    }

    #[test]
    fn unlock_keys_requires_login() {
        let (_temp, keys) = setup();
        let mut session = SessionKeyContext::new(keys);
        assert!(matches!(session.unlock_keys(), Err(SessionError::NotAuthenticated)));
    }

    #[test]
    fn storage_helpers_and_self_encryptor() {
        let (_temp, keys) = setup();
        let mut session = SessionKeyContext::new(keys);
        session
            .login(&record_for("NV001", principal_key_a()), Passphrase::new("secretpw"))
            .unwrap();

        let text = session.encrypt_for_self_to_storage("50000").unwrap();
        assert_eq!(session.decrypt_for_self_from_storage(&text).unwrap(), "50000");
        assert!(matches!(
            session.decrypt_for_self_from_storage("***"),
            Err(SessionError::Encoding(_))
        ));

        let encryptor = session.self_encryptor().unwrap();
        let ciphertext = std::thread::spawn(move || encryptor.encrypt("9.75").unwrap())
            .join()
            .unwrap();
        assert_eq!(session.decrypt_for_self(&ciphertext).unwrap(), "9.75");
    }

    #[test]
    fn foreign_ciphertext_surfaces_decryption_error() {
        let (_temp, keys) = setup();
        let mut session = SessionKeyContext::new(keys);
        session
            .login(&record_for("NV001", principal_key_a()), Passphrase::new("secretpw"))
            .unwrap();

        let foreign = CipherCodec::encrypt(&principal_key_b().to_public_key(), "8.5").unwrap();
        assert!(matches!(
            session.decrypt_for_self(&foreign),
            Err(SessionError::Decryption(DecryptionError::PaddingOrKeyMismatch))
        ));
    }

    #[test]
    fn drop_closes_the_session() {
        let (_temp, keys) = setup();
        {
            let mut session = SessionKeyContext::new(Arc::clone(&keys));
            session
                .login(&record_for("NV001", principal_key_a()), Passphrase::new("secretpw"))
                .unwrap();
        }

        let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
        let events = keys
            .audit()
            .unwrap()
            .search_by_principal("NV001", &today)
            .unwrap();
        assert_eq!(
            events.last().map(|e| e.event_type),
            Some(AuditEventType::SessionClosed)
        );
    }
}
