//! PII ciphertext wire format.
//!
//! Encrypted field values travel as a tagged, self-describing string:
//!
//! ```text
//! <pii::BASE64URL(subject_id):BASE64STD(nonce || ciphertext || tag)>
//! ```
//!
//! The `<pii::` prefix and `>` suffix let field walkers recognize values
//! that are already encrypted, and the first segment carries the subject id
//! so decryption can resolve keys without consulting the surrounding struct.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;

use crate::error::CipherError;

/// Literal prefix of a wire-formatted value.
pub const PREFIX: &str = "<pii::";

/// Literal suffix of a wire-formatted value.
pub const SUFFIX: char = '>';

/// A parsed wire envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireParts {
    /// The subject the ciphertext belongs to (doubles as the key id).
    pub subject_id: String,
    /// AEAD output with the nonce prefixed.
    pub ciphertext: Vec<u8>,
}

/// Whether `value` is a wire-formatted ciphertext envelope.
pub fn is_wire_formatted(value: &str) -> bool {
    value.starts_with(PREFIX) && value.ends_with(SUFFIX)
}

/// Wraps a ciphertext into the wire envelope.
pub fn seal(subject_id: &str, ciphertext: &[u8]) -> String {
    format!(
        "{}{}:{}{}",
        PREFIX,
        URL_SAFE_NO_PAD.encode(subject_id),
        STANDARD.encode(ciphertext),
        SUFFIX,
    )
}

/// Parses a wire envelope back into its subject id and ciphertext.
pub fn open(value: &str) -> Result<WireParts, CipherError> {
    let inner = value
        .strip_prefix(PREFIX)
        .and_then(|rest| rest.strip_suffix(SUFFIX))
        .ok_or_else(|| CipherError::DecryptionFailure("value is not wire formatted".into()))?;

    let (subject_b64, cipher_b64) = inner
        .split_once(':')
        .ok_or_else(|| CipherError::DecryptionFailure("missing wire delimiter".into()))?;

    let subject_raw = URL_SAFE_NO_PAD
        .decode(subject_b64)
        .map_err(|e| CipherError::DecryptionFailure(format!("subject segment: {}", e)))?;
    let subject_id = String::from_utf8(subject_raw)
        .map_err(|e| CipherError::DecryptionFailure(format!("subject segment: {}", e)))?;
    let ciphertext = STANDARD
        .decode(cipher_b64)
        .map_err(|e| CipherError::DecryptionFailure(format!("cipher segment: {}", e)))?;

    Ok(WireParts { subject_id, ciphertext })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_roundtrip() {
        let sealed = seal("kal5430", &[0x01, 0x02, 0xFF]);
        assert!(is_wire_formatted(&sealed));

        let parts = open(&sealed).unwrap();
        assert_eq!(parts.subject_id, "kal5430");
        assert_eq!(parts.ciphertext, vec![0x01, 0x02, 0xFF]);
    }

    #[test]
    fn predicate_rejects_plain_values() {
        assert!(!is_wire_formatted(""));
        assert!(!is_wire_formatted("Idir Moore"));
        assert!(!is_wire_formatted("<pii::unterminated"));
        assert!(!is_wire_formatted("pii::a:b>"));
    }

    #[test]
    fn open_rejects_missing_delimiter() {
        let err = open("<pii::bm90LWEtZGVsaW1pdGVy>").unwrap_err();
        assert!(matches!(err, CipherError::DecryptionFailure(_)));
    }

    #[test]
    fn open_rejects_bad_base64() {
        let err = open("<pii::!!!:###>").unwrap_err();
        assert!(matches!(err, CipherError::DecryptionFailure(_)));
    }

    #[test]
    fn subject_ids_survive_non_alphanumeric_characters() {
        let sealed = seal("Samanta_Murray25@hotmail.com", b"ct");
        assert_eq!(open(&sealed).unwrap().subject_id, "Samanta_Murray25@hotmail.com");
    }
}
