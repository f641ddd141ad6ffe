//! Error kinds for engine implementations.

use std::fmt;

/// Errors returned by [`KeyEngine`](crate::KeyEngine) and
/// [`TokenEngine`](crate::TokenEngine) implementations.
///
/// Operations either succeed, report `KeyNotFound`, or surface a
/// backend-specific failure. No operation mutates state partially on error.
#[derive(Debug)]
pub enum EngineError {
    /// The referenced key id does not exist in the namespace (never created,
    /// or hard-deleted).
    KeyNotFound(String),
    /// Key generation failed while creating missing keys.
    KeyGen(String),
    /// Backend-specific I/O failure.
    Storage(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyNotFound(key_id) => write!(f, "key not found: {}", key_id),
            Self::KeyGen(detail) => write!(f, "key generation failed: {}", detail),
            Self::Storage(detail) => write!(f, "storage error: {}", detail),
        }
    }
}

impl std::error::Error for EngineError {}
