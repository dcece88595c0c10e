// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cryptographic primitives.
//!
//! - `codec` - RSA-OAEP field encryption, credential digests, storage encoding
//! - `envelope` - passphrase-sealed PKCS#8 private keys
//! - `secret` - zeroizing passphrase wrapper

pub mod codec;
pub mod envelope;
pub mod secret;

pub use codec::{CipherCodec, PasswordDigest, MIN_RSA_KEY_BITS, PASSWORD_DIGEST_LEN};
pub use envelope::{EnvelopeError, ENCRYPTED_KEY_LABEL};
pub use secret::Passphrase;
