//! Key engine: the namespaced per-subject key store and its lifecycle.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use shroud_cipher::KeyGen;

use crate::error::EngineError;
use crate::types::{KeyMap, KeyRecord, KeyState};

/// Default recovery window for disabled keys.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(7 * 86_400);

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// The namespaced key store.
///
/// Implement this against your infrastructure:
/// - [`InMemoryKeyEngine`] (testing and ephemeral use)
/// - a database or KMS driver (production)
///
/// Every operation is a suspension point; dropping the calling future
/// abandons the operation. Implementations must serialize conflicting
/// mutations per `(namespace, key_id)` and must not mutate partially on
/// error.
#[async_trait]
pub trait KeyEngine: Send + Sync {
    /// Returns the active key for each requested id, creating missing ones
    /// with `key_gen`.
    ///
    /// Disabled ids are **omitted** from the result, never silently
    /// replaced: a caller that requested an id and did not get it back can
    /// tell the subject was forgotten.
    async fn get_or_create_keys(
        &self,
        namespace: &str,
        key_ids: &[String],
        key_gen: KeyGen,
    ) -> Result<KeyMap, EngineError>;

    /// Returns only active keys. `None` means every active key in the
    /// namespace.
    async fn get_keys(
        &self,
        namespace: &str,
        key_ids: Option<&[String]>,
    ) -> Result<KeyMap, EngineError>;

    /// Active → Disabled, stamping the disable time. Disabling an already
    /// disabled key is a no-op; an absent id is [`EngineError::KeyNotFound`].
    async fn disable_key(&self, namespace: &str, key_id: &str) -> Result<(), EngineError>;

    /// Disabled → Active. Re-enabling an active key is a no-op; an absent id
    /// (never created, or hard-deleted) is [`EngineError::KeyNotFound`].
    async fn re_enable_key(&self, namespace: &str, key_id: &str) -> Result<(), EngineError>;

    /// Removes the key whatever its state. Idempotent: deleting an absent id
    /// succeeds.
    async fn delete_key(&self, namespace: &str, key_id: &str) -> Result<(), EngineError>;

    /// Removes every key disabled for longer than the engine's configured
    /// grace period. Idempotent.
    async fn delete_unused_keys(&self, namespace: &str) -> Result<(), EngineError>;

    /// Every namespace holding at least one key, in any state.
    async fn list_namespaces(&self) -> Result<Vec<String>, EngineError>;
}

// ---------------------------------------------------------------------------
// In-memory reference engine
// ---------------------------------------------------------------------------

type NamespaceKeys = Arc<RwLock<HashMap<String, KeyRecord>>>;

/// In-memory key engine.
///
/// A reader/writer lock per namespace serializes conflicting mutations while
/// keeping distinct namespaces fully independent.
pub struct InMemoryKeyEngine {
    namespaces: RwLock<HashMap<String, NamespaceKeys>>,
    grace_period: Duration,
}

impl InMemoryKeyEngine {
    pub fn new() -> Self {
        Self::with_grace_period(DEFAULT_GRACE_PERIOD)
    }

    /// An engine whose [`delete_unused_keys`](KeyEngine::delete_unused_keys)
    /// sweep reaps keys disabled for longer than `grace_period`.
    pub fn with_grace_period(grace_period: Duration) -> Self {
        Self {
            namespaces: RwLock::new(HashMap::new()),
            grace_period,
        }
    }

    fn namespace(&self, namespace: &str) -> NamespaceKeys {
        if let Some(ns) = self.namespaces.read().unwrap().get(namespace) {
            return ns.clone();
        }
        self.namespaces
            .write()
            .unwrap()
            .entry(namespace.to_string())
            .or_default()
            .clone()
    }
}

impl Default for InMemoryKeyEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyEngine for InMemoryKeyEngine {
    async fn get_or_create_keys(
        &self,
        namespace: &str,
        key_ids: &[String],
        key_gen: KeyGen,
    ) -> Result<KeyMap, EngineError> {
        let ns = self.namespace(namespace);

        let mut keys = KeyMap::new();
        let mut missing: Vec<String> = Vec::new();
        {
            let records = ns.read().unwrap();
            for id in key_ids {
                match records.get(id) {
                    Some(rec) if rec.is_active() => {
                        keys.insert(id.clone(), rec.key.clone());
                    }
                    // Disabled: omitted, never recreated.
                    Some(_) => {}
                    None => missing.push(id.clone()),
                }
            }
        }
        if missing.is_empty() {
            return Ok(keys);
        }

        // Generate everything first so a key-gen failure mutates nothing.
        let mut created = Vec::with_capacity(missing.len());
        for id in &missing {
            let key = key_gen(namespace, id).map_err(|e| EngineError::KeyGen(e.to_string()))?;
            created.push((id.clone(), key));
        }

        let mut records = ns.write().unwrap();
        for (id, key) in created {
            // A concurrent caller may have won the race; keep what landed
            // first so both sides encrypt with the same material.
            let rec = records
                .entry(id.clone())
                .or_insert_with(|| KeyRecord::active(key));
            if rec.is_active() {
                keys.insert(id, rec.key.clone());
            }
        }
        Ok(keys)
    }

    async fn get_keys(
        &self,
        namespace: &str,
        key_ids: Option<&[String]>,
    ) -> Result<KeyMap, EngineError> {
        let ns = self.namespace(namespace);
        let records = ns.read().unwrap();

        let mut keys = KeyMap::new();
        match key_ids {
            Some(ids) => {
                for id in ids {
                    if let Some(rec) = records.get(id) {
                        if rec.is_active() {
                            keys.insert(id.clone(), rec.key.clone());
                        }
                    }
                }
            }
            None => {
                for (id, rec) in records.iter() {
                    if rec.is_active() {
                        keys.insert(id.clone(), rec.key.clone());
                    }
                }
            }
        }
        Ok(keys)
    }

    async fn disable_key(&self, namespace: &str, key_id: &str) -> Result<(), EngineError> {
        let ns = self.namespace(namespace);
        let mut records = ns.write().unwrap();
        let rec = records
            .get_mut(key_id)
            .ok_or_else(|| EngineError::KeyNotFound(key_id.to_string()))?;

        if rec.is_active() {
            rec.state = KeyState::Disabled;
            rec.disabled_at = Some(Utc::now());
            tracing::debug!(namespace, key_id, "key disabled");
        }
        Ok(())
    }

    async fn re_enable_key(&self, namespace: &str, key_id: &str) -> Result<(), EngineError> {
        let ns = self.namespace(namespace);
        let mut records = ns.write().unwrap();
        let rec = records
            .get_mut(key_id)
            .ok_or_else(|| EngineError::KeyNotFound(key_id.to_string()))?;

        if rec.state == KeyState::Disabled {
            rec.state = KeyState::Active;
            rec.disabled_at = None;
            tracing::debug!(namespace, key_id, "key re-enabled");
        }
        Ok(())
    }

    async fn delete_key(&self, namespace: &str, key_id: &str) -> Result<(), EngineError> {
        let ns = self.namespace(namespace);
        // Key material zeroizes when the record drops.
        if ns.write().unwrap().remove(key_id).is_some() {
            tracing::debug!(namespace, key_id, "key deleted");
        }
        Ok(())
    }

    async fn delete_unused_keys(&self, namespace: &str) -> Result<(), EngineError> {
        let grace = chrono::Duration::from_std(self.grace_period)
            .unwrap_or(chrono::Duration::MAX);
        let now = Utc::now();

        let ns = self.namespace(namespace);
        let mut records = ns.write().unwrap();
        let before = records.len();
        records.retain(|_, rec| match (rec.state, rec.disabled_at) {
            (KeyState::Disabled, Some(at)) => now - at < grace,
            _ => true,
        });

        let removed = before - records.len();
        if removed > 0 {
            tracing::info!(namespace, removed, "swept unused keys");
        }
        Ok(())
    }

    async fn list_namespaces(&self) -> Result<Vec<String>, EngineError> {
        let namespaces = self.namespaces.read().unwrap();
        Ok(namespaces
            .iter()
            .filter(|(_, ns)| !ns.read().unwrap().is_empty())
            .map(|(name, _)| name.clone())
            .collect())
    }
}
