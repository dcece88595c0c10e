// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Records Vault - field-level RSA encryption for records management
//!
//! Each principal owns a 2048-bit RSA keypair. The private key is kept on
//! disk in a passphrase-sealed PKCS#8 envelope; sensitive attributes
//! (salaries, exam scores) are stored as RSA-OAEP ciphertext under the
//! principal's public key and only become readable inside that principal's
//! authenticated session.
//!
//! ## Modules
//!
//! - `crypto` - RSA-OAEP codec, key envelopes, passphrases
//! - `keys` - Per-principal key generation and custody
//! - `session` - Session-scoped key material
//! - `storage` - Record store adapters, key files, audit log
//! - `records` - Enrollment, authentication and grade flows
//! - `worker` - Blocking-pool offload for crypto work

pub mod config;
pub mod crypto;
pub mod error;
pub mod keys;
pub mod logging;
pub mod records;
pub mod session;
pub mod storage;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_support;

pub use crypto::{CipherCodec, Passphrase};
pub use error::{VaultError, VaultResult};
pub use keys::KeyManager;
pub use session::{LoginOutcome, LoginRecord, SessionKeyContext};
pub use storage::StorageAdapter;
