// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-principal mutual exclusion for key records.
//!
//! Generation and loading of the same principal's key serialize; different
//! principals proceed in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
pub struct PrincipalLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PrincipalLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock handle for `principal_id`, created on first use.
    pub fn handle(&self, principal_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(principal_id.to_string()).or_default())
    }

    /// Run `f` while holding `principal_id`'s lock.
    pub fn with_lock<T>(&self, principal_id: &str, f: impl FnOnce() -> T) -> T {
        let handle = self.handle(principal_id);
        let _guard: MutexGuard<'_, ()> = handle.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }
}
