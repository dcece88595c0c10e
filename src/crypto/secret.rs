// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Passphrase handling.
//!
//! A [`Passphrase`] owns its bytes in a zeroizing buffer and never prints
//! them: `Debug` is redacted and there is no `Display`.

use std::fmt;

use zeroize::Zeroizing;

/// A principal's passphrase, wiped from memory when dropped.
#[derive(Clone)]
pub struct Passphrase(Zeroizing<String>);

impl Passphrase {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the raw passphrase.
    ///
    /// Only key derivation and credential hashing should call this.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl From<String> for Passphrase {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Passphrase {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_is_redacted() {
        let pw = Passphrase::new("secretpw");
        let rendered = format!("{pw:?}");
        assert!(!rendered.contains("secretpw"));
        assert_eq!(rendered, "Passphrase(<redacted>)");
    }

    #[test]
    fn expose_returns_original_text() {
        let pw: Passphrase = "pass123".into();
        assert_eq!(pw.expose(), "pass123");
        assert!(!pw.is_empty());
        assert!(Passphrase::new("").is_empty());
    }
}
