//! Error kinds for cipher implementations.

use std::fmt;

/// Errors returned by [`Cipher`](crate::Cipher) implementations.
///
/// The detail string carries the underlying cause.
#[derive(Debug)]
pub enum CipherError {
    EncryptionFailure(String),
    DecryptionFailure(String),
}

impl fmt::Display for CipherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EncryptionFailure(detail) => write!(f, "failed to encrypt data: {}", detail),
            Self::DecryptionFailure(detail) => write!(f, "failed to decrypt data: {}", detail),
        }
    }
}

impl std::error::Error for CipherError {}
