//! Record types shared by engine implementations.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shroud_cipher::Key;

// ---------------------------------------------------------------------------
// Key lifecycle
// ---------------------------------------------------------------------------

/// Key lifecycle state.
///
/// ```text
/// (absent) → ACTIVE ⇄ DISABLED → (deleted)
///    any state ─────────────────→ (deleted)
/// ```
///
/// Deletion is absence: a hard-deleted key is indistinguishable from one
/// that never existed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyState {
    /// Returned by lookups; usable for encryption.
    Active,
    /// Hidden from lookups but recoverable until the grace-period sweep.
    Disabled,
}

/// A stored key with its lifecycle metadata.
#[derive(Clone, Debug)]
pub struct KeyRecord {
    pub key: Key,
    pub state: KeyState,
    pub created_at: DateTime<Utc>,
    /// Set while the record is `Disabled`; the sweep compares it against
    /// the engine's grace period.
    pub disabled_at: Option<DateTime<Utc>>,
}

impl KeyRecord {
    /// A freshly created, active record.
    pub fn active(key: Key) -> Self {
        Self {
            key,
            state: KeyState::Active,
            created_at: Utc::now(),
            disabled_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == KeyState::Active
    }
}

/// Active keys resolved for a set of subject ids.
pub type KeyMap = HashMap<String, Key>;

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// A value ↔ pseudonym pair within a namespace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// The opaque pseudonym, unique within its namespace.
    pub token: String,
    /// The original value.
    pub value: String,
    pub created_at: DateTime<Utc>,
}

/// Token records keyed by the lookup input: the original value for
/// `tokenize`, the token for `detokenize`. Misses are absent entries.
pub type TokenMap = HashMap<String, TokenRecord>;
