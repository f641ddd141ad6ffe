//! AEAD: AES-256-GCM with namespace-bound associated data.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};

use crate::error::CipherError;
use crate::key::{random_key_gen, Key, KeyGen, AES256_KEY_SIZE};

/// AEAD nonce length (96 bits).
pub const NONCE_SIZE: usize = 12;

/// Marker prepended to the namespace when building associated data.
const AAD_MARKER: &[u8] = b"ns:";

/// A namespace-scoped symmetric cipher.
///
/// Implementations are purely computational: no I/O, no suspension points.
/// The namespace must be bound into the ciphertext so that decryption under
/// any other namespace fails authentication.
pub trait Cipher: Send + Sync {
    /// Encrypts `plaintext` under `key`, binding the result to `namespace`.
    fn encrypt(&self, namespace: &str, key: &Key, plaintext: &str)
        -> Result<Vec<u8>, CipherError>;

    /// Decrypts a ciphertext produced by [`Cipher::encrypt`] in the same
    /// namespace.
    fn decrypt(&self, namespace: &str, key: &Key, ciphertext: &[u8])
        -> Result<String, CipherError>;

    /// Returns a generator producing keys of the length this cipher requires.
    fn key_gen(&self) -> KeyGen;
}

/// The default cipher: AES-256-GCM with a fresh random 96-bit nonce prefixed
/// to the AEAD output.
#[derive(Debug, Default, Clone, Copy)]
pub struct Aes256GcmCipher;

impl Aes256GcmCipher {
    pub fn new() -> Self {
        Self
    }
}

// An empty namespace yields no associated data, so ciphertexts produced
// without a namespace stay compatible with AEAD calls that pass none.
fn namespace_aad(namespace: &str) -> Vec<u8> {
    if namespace.is_empty() {
        return Vec::new();
    }
    let mut aad = Vec::with_capacity(AAD_MARKER.len() + namespace.len());
    aad.extend_from_slice(AAD_MARKER);
    aad.extend_from_slice(namespace.as_bytes());
    aad
}

fn fresh_nonce() -> Result<[u8; NONCE_SIZE], CipherError> {
    let mut nonce = [0u8; NONCE_SIZE];
    getrandom::getrandom(&mut nonce)
        .map_err(|e| CipherError::EncryptionFailure(format!("nonce: {}", e)))?;
    Ok(nonce)
}

impl Cipher for Aes256GcmCipher {
    fn encrypt(
        &self,
        namespace: &str,
        key: &Key,
        plaintext: &str,
    ) -> Result<Vec<u8>, CipherError> {
        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| CipherError::EncryptionFailure(format!("key: {}", e)))?;

        let nonce = fresh_nonce()?;
        let aad = namespace_aad(namespace);
        let payload = Payload { msg: plaintext.as_bytes(), aad: &aad };
        let sealed = cipher
            .encrypt(Nonce::from_slice(&nonce), payload)
            .map_err(|e| CipherError::EncryptionFailure(format!("seal: {}", e)))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    fn decrypt(
        &self,
        namespace: &str,
        key: &Key,
        ciphertext: &[u8],
    ) -> Result<String, CipherError> {
        if ciphertext.len() < NONCE_SIZE {
            return Err(CipherError::DecryptionFailure(
                "ciphertext shorter than nonce".into(),
            ));
        }
        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| CipherError::DecryptionFailure(format!("key: {}", e)))?;

        let (nonce, sealed) = ciphertext.split_at(NONCE_SIZE);
        let aad = namespace_aad(namespace);
        let payload = Payload { msg: sealed, aad: &aad };
        let plain = cipher
            .decrypt(Nonce::from_slice(nonce), payload)
            .map_err(|_| CipherError::DecryptionFailure("authentication failed".into()))?;

        String::from_utf8(plain)
            .map_err(|e| CipherError::DecryptionFailure(format!("utf-8: {}", e)))
    }

    fn key_gen(&self) -> KeyGen {
        random_key_gen(AES256_KEY_SIZE)
    }
}
