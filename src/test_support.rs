// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for unit tests.
//!
//! RSA key generation is slow, so keys are generated once per test binary.

use std::sync::OnceLock;

use rand::rngs::OsRng;
use rsa::RsaPrivateKey;

use crate::config::KdfProfile;

static PRINCIPAL_A: OnceLock<RsaPrivateKey> = OnceLock::new();
static PRINCIPAL_B: OnceLock<RsaPrivateKey> = OnceLock::new();
static SMALL: OnceLock<RsaPrivateKey> = OnceLock::new();

/// 2048-bit key standing in for principal NV001.
pub fn principal_key_a() -> &'static RsaPrivateKey {
    PRINCIPAL_A.get_or_init(|| RsaPrivateKey::new(&mut OsRng, 2048).expect("generate key A"))
}

/// 2048-bit key standing in for principal NV002.
pub fn principal_key_b() -> &'static RsaPrivateKey {
    PRINCIPAL_B.get_or_init(|| RsaPrivateKey::new(&mut OsRng, 2048).expect("generate key B"))
}

/// Undersized key for envelope tests and minimum-size checks.
pub fn small_key() -> &'static RsaPrivateKey {
    SMALL.get_or_init(|| RsaPrivateKey::new(&mut OsRng, 1024).expect("generate small key"))
}

/// Cheap scrypt profile so envelope tests stay fast.
pub fn fast_kdf() -> KdfProfile {
    KdfProfile::Scrypt { log_n: 8 }
}
