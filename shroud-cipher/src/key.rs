//! Per-subject key material.

use std::fmt;
use std::sync::Arc;

use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CipherError;

/// Key length required by AES-256-GCM.
pub const AES256_KEY_SIZE: usize = 32;

/// A per-subject symmetric key.
///
/// The bytes are wiped from memory on drop. `Debug` never prints the
/// material, and equality runs in constant time.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Key(Vec<u8>);

impl Key {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({} bytes)", self.0.len())
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for Key {}

/// Generates a valid key for `(namespace, subject_id)`.
///
/// Implementations must produce cryptographically random bytes of the length
/// the cipher requires. Engines call this lazily, on the first encryption
/// involving a subject.
pub type KeyGen = Arc<dyn Fn(&str, &str) -> Result<Key, CipherError> + Send + Sync>;

/// Returns a [`KeyGen`] producing `len` random bytes, independent of
/// namespace and subject.
pub fn random_key_gen(len: usize) -> KeyGen {
    Arc::new(move |_namespace, _subject_id| random_bytes(len).map(Key::new))
}

pub(crate) fn random_bytes(len: usize) -> Result<Vec<u8>, CipherError> {
    let mut data = vec![0u8; len];
    getrandom::getrandom(&mut data)
        .map_err(|e| CipherError::EncryptionFailure(format!("rng: {}", e)))?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_key_gen_produces_distinct_keys_of_requested_length() {
        let gen = random_key_gen(AES256_KEY_SIZE);
        let k1 = gen("tenant-a", "subject-1").unwrap();
        let k2 = gen("tenant-a", "subject-1").unwrap();
        assert_eq!(k1.len(), AES256_KEY_SIZE);
        assert_eq!(k2.len(), AES256_KEY_SIZE);
        assert_ne!(k1, k2);
    }

    #[test]
    fn debug_redacts_material() {
        let key = Key::new(vec![0xAB; 32]);
        let printed = format!("{:?}", key);
        assert!(!printed.contains("AB"));
        assert!(printed.contains("32 bytes"));
    }

    #[test]
    fn equality_ignores_length_mismatch_gracefully() {
        let a = Key::new(vec![1, 2, 3]);
        let b = Key::new(vec![1, 2, 3, 4]);
        assert_ne!(a, b);
        assert_eq!(a, Key::new(vec![1, 2, 3]));
    }
}
