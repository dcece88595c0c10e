// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit logging for key custody and session lifecycle events.
//!
//! Events are appended to `audit/{date}/events.jsonl`. They carry principal
//! ids, record references and error kinds; never passphrases, key material
//! or decrypted values.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{FileStore, StorageError, StorageResult};

/// Types of auditable events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Key events
    KeyPairGenerated,
    KeyUnlocked,
    KeyUnlockFailed,

    // Session events
    SessionOpened,
    SessionClosed,
    FieldDecryptFailed,

    // Enrollment events
    PrincipalEnrolled,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    /// Principal the event concerns (if known).
    pub principal_id: Option<String>,
    /// Resource affected (record reference, key file, ...).
    pub resource_id: Option<String>,
    pub resource_type: Option<String>,
    pub details: Option<serde_json::Value>,
    pub success: bool,
    pub error: Option<String>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            principal_id: None,
            resource_id: None,
            resource_type: None,
            details: None,
            success: true,
            error: None,
        }
    }

    pub fn with_principal(mut self, principal_id: impl Into<String>) -> Self {
        self.principal_id = Some(principal_id.into());
        self
    }

    pub fn with_resource(
        mut self,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        self.resource_type = Some(resource_type.into());
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark as failed with an error description.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }

    fn date(&self) -> String {
        self.timestamp.format("%Y-%m-%d").to_string()
    }
}

/// Append-only audit log.
#[derive(Debug)]
pub struct AuditLog {
    store: FileStore,
    append: Mutex<()>,
}

impl AuditLog {
    pub fn new(store: FileStore) -> Self {
        Self {
            store,
            append: Mutex::new(()),
        }
    }

    /// Append an event to its day's log.
    pub fn log(&self, event: &AuditEvent) -> StorageResult<()> {
        let path = self.store.paths().audit_events_file(&event.date());
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let _guard = self.append.lock().unwrap_or_else(PoisonError::into_inner);
        self.store.append_raw(&path, &line)
    }

    /// Append an event, downgrading failure to a warning.
    pub fn record(&self, event: AuditEvent) {
        if let Err(e) = self.log(&event) {
            tracing::warn!(
                event_type = ?event.event_type,
                error = %e,
                "failed to write audit event"
            );
        }
    }

    /// Read audit events for a specific date (`YYYY-MM-DD`).
    pub fn read_events(&self, date: &str) -> StorageResult<Vec<AuditEvent>> {
        let path = self.store.paths().audit_events_file(date);
        let content = match self.store.read_raw(&path) {
            Ok(content) => content,
            Err(StorageError::NotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut events = Vec::new();
        for line in content.split(|b| *b == b'\n') {
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            events.push(serde_json::from_slice(line)?);
        }
        Ok(events)
    }

    /// Read events for an inclusive date range.
    pub fn read_events_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StorageResult<Vec<AuditEvent>> {
        let mut all_events = Vec::new();
        for day in start.iter_days().take_while(|d| *d <= end) {
            all_events.extend(self.read_events(&day.format("%Y-%m-%d").to_string())?);
        }
        Ok(all_events)
    }

    /// Events of one day concerning `principal_id`.
    pub fn search_by_principal(
        &self,
        principal_id: &str,
        date: &str,
    ) -> StorageResult<Vec<AuditEvent>> {
        let events = self.read_events(date)?;
        Ok(events
            .into_iter()
            .filter(|e| e.principal_id.as_deref() == Some(principal_id))
            .collect())
    }
}
