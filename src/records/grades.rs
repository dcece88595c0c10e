// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Encrypted exam scores.
//!
//! A score is encrypted under the public key of the principal entering it,
//! not the student's, so only that principal can read it back. Reads never
//! fail as a whole: each field is either visible or hidden with a reason.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::{RecordsError, RecordsResult};
use crate::error::SessionError;
use crate::session::SessionKeyContext;
use crate::storage::{RecordRef, StorageAdapter, StorageError};

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 10.0;

/// Shown in place of a value that cannot be displayed.
pub const HIDDEN_PLACEHOLDER: &str = "***";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HiddenReason {
    NotStored,
    NotAuthenticated,
    KeysUnavailable,
    DecryptFailed,
    StorageUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldView {
    Visible(String),
    Hidden { reason: HiddenReason },
}

impl FieldView {
    pub fn is_visible(&self) -> bool {
        matches!(self, FieldView::Visible(_))
    }
}

impl fmt::Display for FieldView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldView::Visible(text) => f.write_str(text),
            FieldView::Hidden { .. } => f.write_str(HIDDEN_PLACEHOLDER),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeView {
    pub record: RecordRef,
    pub view: FieldView,
}

/// Decimal text for a score: `8.5`, `10`, `0`.
pub fn format_score(score: f64) -> String {
    // Avoid rendering -0.
    let score = if score == 0.0 { 0.0 } else { score };
    score.to_string()
}

pub struct GradeBook {
    storage: Arc<dyn StorageAdapter>,
}

impl GradeBook {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    /// Encrypt `score` for the session's principal and store it.
    pub fn record_grade(
        &self,
        session: &SessionKeyContext,
        student_id: &str,
        course_id: &str,
        score: f64,
    ) -> RecordsResult<RecordRef> {
        if student_id.trim().is_empty() {
            return Err(RecordsError::invalid("student_id", "must not be empty"));
        }
        if course_id.trim().is_empty() {
            return Err(RecordsError::invalid("course_id", "must not be empty"));
        }
        if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
            return Err(RecordsError::invalid(
                "score",
                format!("must be between {MIN_SCORE} and {MAX_SCORE}"),
            ));
        }

        let record = RecordRef::grade(student_id, course_id)?;
        let ciphertext = session.encrypt_for_self(&format_score(score))?;
        self.storage.put_encrypted_field(&record, &ciphertext)?;

        tracing::info!(
            record = %record,
            entered_by = session.principal_id().unwrap_or_default(),
            "grade recorded"
        );
        Ok(record)
    }

    /// Decrypt one stored field for display.
    pub fn read_grade(&self, session: &SessionKeyContext, record: &RecordRef) -> FieldView {
        let ciphertext = match self.storage.get_encrypted_field(record) {
            Ok(ciphertext) => ciphertext,
            Err(StorageError::NotFound(_)) => {
                return FieldView::Hidden {
                    reason: HiddenReason::NotStored,
                }
            }
            Err(e) => {
                tracing::warn!(record = %record, error = %e, "stored field unreadable");
                return FieldView::Hidden {
                    reason: HiddenReason::StorageUnavailable,
                };
            }
        };

        match session.decrypt_for_self(&ciphertext) {
            Ok(text) => FieldView::Visible(text),
            Err(SessionError::NotAuthenticated) => FieldView::Hidden {
                reason: HiddenReason::NotAuthenticated,
            },
            Err(SessionError::KeyUnavailable) => FieldView::Hidden {
                reason: HiddenReason::KeysUnavailable,
            },
            Err(e) => {
                session.note_decrypt_failure(&record.to_string(), &e);
                FieldView::Hidden {
                    reason: HiddenReason::DecryptFailed,
                }
            }
        }
    }

    /// One view per reference, in order.
    pub fn read_grades(
        &self,
        session: &SessionKeyContext,
        records: &[RecordRef],
    ) -> Vec<GradeView> {
        records
            .iter()
            .map(|record| GradeView {
                record: record.clone(),
                view: self.read_grade(session, record),
            })
            .collect()
    }
}
