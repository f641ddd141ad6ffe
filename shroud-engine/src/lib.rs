//! # Shroud Engine
//!
//! Namespaced storage contracts behind the Shroud protector: the per-subject
//! [`KeyEngine`] with its lifecycle (active → disabled → deleted, plus a
//! recoverable grace window), the [`TokenEngine`] value ↔ pseudonym
//! bijection, in-memory reference implementations, and TTL cache decorators.
//!
//! Backend drivers implement the same traits against real storage; the
//! [`testkit`] module ships the conformance suites they are expected to pass.

pub mod cache;
pub mod error;
pub mod key_engine;
pub mod testkit;
pub mod token_engine;
pub mod types;

pub use cache::{CacheClear, KeyEngineCache, TokenEngineCache};
pub use error::EngineError;
pub use key_engine::{InMemoryKeyEngine, KeyEngine, DEFAULT_GRACE_PERIOD};
pub use token_engine::{InMemoryTokenEngine, TokenEngine};
pub use types::{KeyMap, KeyRecord, KeyState, TokenMap, TokenRecord};
