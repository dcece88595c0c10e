// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-principal RSA key custody.

pub mod locks;
pub mod manager;

pub use locks::PrincipalLocks;
pub use manager::{KeyManager, RSA_KEY_BITS};
