// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the vault. Configuration is loaded from the environment at
//! startup; the CLI may override individual values with flags.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Root directory for keys, audit log and record database | `./data` |
//! | `KEY_KDF` | Passphrase KDF for private-key envelopes (`scrypt` or `pbkdf2`) | `scrypt` |
//! | `KEY_KDF_COST` | scrypt `log_n` or PBKDF2 iteration count | `17` / `600000` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,records_vault=debug` |
//! | `RECORDS_PASSPHRASE` | Passphrase source for the CLI | Required for key operations |

use std::env;
use std::path::PathBuf;

use thiserror::Error;

/// Environment variable name for the vault data directory.
///
/// Private keys live under `{DATA_DIR}/keys/`, audit logs under
/// `{DATA_DIR}/audit/` and the record database at `{DATA_DIR}/records.redb`.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Default data directory, relative to the working directory.
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Environment variable selecting the private-key envelope KDF.
pub const KEY_KDF_ENV: &str = "KEY_KDF";

/// Environment variable carrying the KDF cost parameter.
pub const KEY_KDF_COST_ENV: &str = "KEY_KDF_COST";

/// Environment variable selecting the log output format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Environment variable the CLI reads passphrases from by default.
pub const PASSPHRASE_ENV: &str = "RECORDS_PASSPHRASE";

/// scrypt work factor used by [`KdfProfile::best_available`].
pub const DEFAULT_SCRYPT_LOG_N: u8 = 17;

/// PBKDF2-SHA256 iteration count used when `KEY_KDF=pbkdf2` has no cost.
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 600_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var} has unsupported value {value:?} (expected one of: {expected})")]
    UnsupportedValue {
        var: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

/// Password-based key derivation used to seal private keys at rest.
///
/// Both variants wrap the derived key in AES-256-CBC per PBES2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfProfile {
    /// scrypt with `r = 8`, `p = 1` and the given work factor.
    Scrypt { log_n: u8 },
    /// PBKDF2 with HMAC-SHA256.
    Pbkdf2Sha256 { iterations: u32 },
}

impl KdfProfile {
    /// Strongest scheme the PKCS#8 stack offers.
    pub fn best_available() -> Self {
        KdfProfile::Scrypt {
            log_n: DEFAULT_SCRYPT_LOG_N,
        }
    }

    /// Parse a profile from the `KEY_KDF` / `KEY_KDF_COST` pair.
    pub fn parse(kind: Option<&str>, cost: Option<&str>) -> Result<Self, ConfigError> {
        let kind = kind.map(|k| k.trim().to_lowercase());
        match kind.as_deref() {
            None | Some("") | Some("scrypt") => {
                let log_n = match cost {
                    Some(raw) => parse_positive(KEY_KDF_COST_ENV, raw)
                        .and_then(|n| {
                            u8::try_from(n).map_err(|_| ConfigError::InvalidNumber {
                                var: KEY_KDF_COST_ENV,
                                value: raw.to_string(),
                            })
                        })?,
                    None => DEFAULT_SCRYPT_LOG_N,
                };
                Ok(KdfProfile::Scrypt { log_n })
            }
            Some("pbkdf2") => {
                let iterations = match cost {
                    Some(raw) => parse_positive(KEY_KDF_COST_ENV, raw)?,
                    None => DEFAULT_PBKDF2_ITERATIONS,
                };
                Ok(KdfProfile::Pbkdf2Sha256 { iterations })
            }
            Some(other) => Err(ConfigError::UnsupportedValue {
                var: KEY_KDF_ENV,
                value: other.to_string(),
                expected: "scrypt, pbkdf2",
            }),
        }
    }
}

impl Default for KdfProfile {
    fn default() -> Self {
        Self::best_available()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(ConfigError::UnsupportedValue {
                var: LOG_FORMAT_ENV,
                value: other.to_string(),
                expected: "pretty, json",
            }),
        }
    }
}

/// Resolved vault configuration.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    pub data_dir: PathBuf,
    pub kdf: KdfProfile,
    pub log_format: LogFormat,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            kdf: KdfProfile::best_available(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl VaultConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = lookup(DATA_DIR_ENV)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let kdf = KdfProfile::parse(
            lookup(KEY_KDF_ENV).as_deref(),
            lookup(KEY_KDF_COST_ENV).as_deref(),
        )?;

        let log_format = match lookup(LOG_FORMAT_ENV) {
            Some(v) => LogFormat::parse(&v)?,
            None => LogFormat::default(),
        };

        Ok(Self {
            data_dir,
            kdf,
            log_format,
        })
    }
}

fn parse_positive(var: &'static str, raw: &str) -> Result<u32, ConfigError> {
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber {
            var,
            value: raw.to_string(),
        }),
    }
}
