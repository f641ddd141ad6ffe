//! Error kinds surfaced by the protector.

use std::fmt;

use shroud_cipher::CipherError;
use shroud_engine::EngineError;

use crate::walker::WalkError;

/// Errors returned by [`Protector`](crate::Protector) operations.
#[derive(Debug)]
pub enum ProtectError {
    /// The subject's key was disabled by a graceful forget; new PII cannot
    /// be encrypted for it unless the subject is recovered first.
    SubjectForgotten { subject_id: String },
    /// The subject's key is gone for good (hard-deleted or never created);
    /// recovery is impossible.
    CannotRecoverSubject { subject_id: String },
    /// The target's tagged-field declaration is unusable.
    Walk(WalkError),
    /// The cipher rejected an encrypt or decrypt call.
    Cipher(CipherError),
    /// The key or token engine failed.
    Engine(EngineError),
}

impl fmt::Display for ProtectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubjectForgotten { subject_id } => {
                write!(f, "subject is forgotten: {}", subject_id)
            }
            Self::CannotRecoverSubject { subject_id } => {
                write!(f, "cannot recover subject: {}", subject_id)
            }
            Self::Walk(err) => write!(f, "{}", err),
            Self::Cipher(err) => write!(f, "{}", err),
            Self::Engine(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ProtectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Walk(err) => Some(err),
            Self::Cipher(err) => Some(err),
            Self::Engine(err) => Some(err),
            _ => None,
        }
    }
}

impl From<WalkError> for ProtectError {
    fn from(err: WalkError) -> Self {
        Self::Walk(err)
    }
}

impl From<CipherError> for ProtectError {
    fn from(err: CipherError) -> Self {
        Self::Cipher(err)
    }
}

impl From<EngineError> for ProtectError {
    fn from(err: EngineError) -> Self {
        Self::Engine(err)
    }
}
