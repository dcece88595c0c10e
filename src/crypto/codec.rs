// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Cipher Codec
//!
//! Field encryption primitives and the encoding needed to carry ciphertext
//! through the record store:
//!
//! - RSA-OAEP with SHA-256 for both the digest and MGF1, no label
//! - SHA-1 credential digests (storage-layer identity matching only)
//! - Standard padded base64 for text-only transports
//!
//! Ciphertext length is always the modulus size (256 bytes for 2048-bit
//! keys), independent of the plaintext.

use base64ct::{Base64, Encoding};
use rand::rngs::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use crate::error::{DecryptionError, EncodingError, EncryptionError, StoredFieldError};

/// Smallest modulus accepted for field encryption.
pub const MIN_RSA_KEY_BITS: usize = 2048;

/// Output size of the OAEP digest (SHA-256).
const OAEP_HASH_LEN: usize = 32;

/// Length of a credential digest.
pub const PASSWORD_DIGEST_LEN: usize = 20;

/// SHA-1 credential token.
pub type PasswordDigest = [u8; PASSWORD_DIGEST_LEN];

/// Stateless field codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct CipherCodec;

impl CipherCodec {
    /// Largest plaintext, in bytes, that fits one OAEP block for `public_key`.
    ///
    /// `k - 2*hLen - 2`, i.e. 190 bytes for a 2048-bit modulus.
    pub fn max_plaintext_len(public_key: &RsaPublicKey) -> usize {
        public_key.size().saturating_sub(2 * OAEP_HASH_LEN + 2)
    }

    /// Encrypt a short UTF-8 value under `public_key`.
    pub fn encrypt(public_key: &RsaPublicKey, plaintext: &str) -> Result<Vec<u8>, EncryptionError> {
        let bits = public_key.size() * 8;
        if bits < MIN_RSA_KEY_BITS {
            return Err(EncryptionError::InvalidKey(format!(
                "{bits}-bit modulus is below the {MIN_RSA_KEY_BITS}-bit minimum"
            )));
        }

        let bytes = plaintext.as_bytes();
        if bytes.is_empty() {
            return Err(EncryptionError::EmptyPlaintext);
        }

        let max = Self::max_plaintext_len(public_key);
        if bytes.len() > max {
            return Err(EncryptionError::PlaintextTooLong {
                len: bytes.len(),
                max,
            });
        }

        let ciphertext = public_key
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), bytes)
            .map_err(|e| match e {
                rsa::Error::MessageTooLong => EncryptionError::PlaintextTooLong {
                    len: bytes.len(),
                    max,
                },
                other => EncryptionError::InvalidKey(other.to_string()),
            })?;

        tracing::debug!(len = ciphertext.len(), "field encrypted");
        Ok(ciphertext)
    }

    /// Decrypt a ciphertext produced by [`CipherCodec::encrypt`].
    ///
    /// Every failure collapses to [`DecryptionError::PaddingOrKeyMismatch`].
    pub fn decrypt(
        private_key: &RsaPrivateKey,
        ciphertext: &[u8],
    ) -> Result<String, DecryptionError> {
        let expected = private_key.size();
        if ciphertext.len() != expected {
            tracing::debug!(
                len = ciphertext.len(),
                expected,
                "ciphertext length does not match modulus"
            );
            return Err(DecryptionError::PaddingOrKeyMismatch);
        }

        let plaintext = private_key
            .decrypt_blinded(&mut OsRng, Oaep::new::<Sha256>(), ciphertext)
            .map_err(|e| {
                tracing::debug!(reason = %e, "OAEP decryption rejected");
                DecryptionError::PaddingOrKeyMismatch
            })?;

        String::from_utf8(plaintext).map_err(|e| {
            // Wipe the recovered bytes before discarding them.
            let mut bytes = e.into_bytes();
            zeroize::Zeroize::zeroize(&mut bytes);
            tracing::debug!("decrypted field is not UTF-8");
            DecryptionError::PaddingOrKeyMismatch
        })
    }

    /// SHA-1 digest of a password, used only as a credential-matching token.
    ///
    /// SHA-1 is kept for compatibility with existing credential columns; it
    /// is never used to derive encryption keys.
    pub fn hash_password(password: &str) -> PasswordDigest {
        let digest = ring::digest::digest(
            &ring::digest::SHA1_FOR_LEGACY_USE_ONLY,
            password.as_bytes(),
        );
        let mut out = [0u8; PASSWORD_DIGEST_LEN];
        out.copy_from_slice(digest.as_ref());
        out
    }

    /// Base64-encode binary for text-only storage calls.
    pub fn encode_for_storage(binary: &[u8]) -> String {
        Base64::encode_string(binary)
    }

    /// Inverse of [`CipherCodec::encode_for_storage`].
    ///
    /// Surrounding whitespace (as left by some text columns) is ignored.
    pub fn decode_from_storage(text: &str) -> Result<Vec<u8>, EncodingError> {
        Base64::decode_vec(text.trim()).map_err(|e| EncodingError::InvalidBase64(e.to_string()))
    }

    /// Encrypt and base64-encode in one step.
    pub fn encrypt_for_storage(
        public_key: &RsaPublicKey,
        plaintext: &str,
    ) -> Result<String, EncryptionError> {
        let ciphertext = Self::encrypt(public_key, plaintext)?;
        Ok(Self::encode_for_storage(&ciphertext))
    }

    /// Decode and decrypt a value read from a text column.
    pub fn decrypt_from_storage(
        private_key: &RsaPrivateKey,
        text: &str,
    ) -> Result<String, StoredFieldError> {
        let ciphertext = Self::decode_from_storage(text)?;
        Ok(Self::decrypt(private_key, &ciphertext)?)
    }
}
