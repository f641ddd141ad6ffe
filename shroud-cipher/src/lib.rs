//! # Shroud Cipher
//!
//! Symmetric AEAD primitives for the Shroud privacy engine: the [`Cipher`]
//! contract, its default AES-256-GCM implementation, zeroizing key material,
//! and the `<pii::…:…>` ciphertext wire format.
//!
//! Encryption binds the tenant namespace as associated data, so a ciphertext
//! produced for one tenant never authenticates under another.

pub mod aead;
pub mod error;
pub mod key;
pub mod wire;

pub use aead::{Aes256GcmCipher, Cipher, NONCE_SIZE};
pub use error::CipherError;
pub use key::{random_key_gen, Key, KeyGen, AES256_KEY_SIZE};
