//! # Shroud
//!
//! Privacy-by-design protection for PII embedded in application structs:
//!
//! - **Tokenization** — random pseudonyms for canonical identifiers, so the
//!   identifier itself never needs to leave the trust boundary.
//! - **Client-side encryption** — at the struct-field level, one key per
//!   subject, namespaced per tenant.
//! - **Crypto-shredding** — forgetting a subject destroys (or, in graceful
//!   mode, disables) its key, rendering its ciphertext permanently
//!   unreadable. Particularly useful over immutable storage.
//!
//! ## Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use shroud::Protector;
//! use shroud_engine::{InMemoryKeyEngine, InMemoryTokenEngine};
//!
//! let protector = Protector::builder("tnt-a20873", Arc::new(InMemoryKeyEngine::new()))
//!     // Token engine is optional; tokenize/detokenize panic without one.
//!     .token_engine(Arc::new(InMemoryTokenEngine::new()))
//!     // Decorate both engines with in-memory TTL caches.
//!     .cache_ttl(Duration::from_secs(15 * 60))
//!     // Soft crypto-shredding: forgotten subjects stay recoverable within
//!     // the engine's grace period.
//!     .graceful_mode(true)
//!     .build();
//!
//! // A record implementing `SensitiveRecord` declares its tagged fields.
//! protector.encrypt(&mut [&mut user]).await?;
//! protector.decrypt(&mut [&mut user]).await?;
//! protector.forget(&user_id).await?;
//! ```

pub mod error;
pub mod factory;
pub mod protector;
pub mod walker;

pub use error::ProtectError;
pub use factory::{ClearHandle, Factory, DEFAULT_CHECK_INTERVAL, DEFAULT_IDLE_TTL};
pub use protector::{Protector, ProtectorBuilder};
pub use walker::{
    walk, FieldKind, FieldMut, FieldSlot, PiiField, SensitiveRecord, Traversal, WalkError,
};

// Re-export the collaborating layers so applications can depend on one crate.
pub use shroud_cipher as cipher;
pub use shroud_engine as engine;
