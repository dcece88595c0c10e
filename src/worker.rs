// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Offloading CPU-bound crypto from async callers.
//!
//! RSA keygen, scrypt and private-key operations take milliseconds to
//! seconds; run them on tokio's blocking pool rather than a runtime worker.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("crypto worker panicked")]
    Panicked,

    #[error("crypto worker was cancelled")]
    Cancelled,
}

/// Run `f` on the blocking pool and wait for its result.
pub async fn offload<F, T>(f: F) -> Result<T, WorkerError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        if e.is_panic() {
            tracing::error!("crypto worker panicked");
            WorkerError::Panicked
        } else {
            WorkerError::Cancelled
        }
    })
}
