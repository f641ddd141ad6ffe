//! TTL cache decorators over the key and token engines.
//!
//! Reads consult the cache; misses fall through to the wrapped engine and
//! populate. Mutations invalidate affected entries first, then delegate, so
//! the cache never outlives the truth beneath it. All contract semantics of
//! the wrapped engine are preserved, exact error kinds included.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use shroud_cipher::{Key, KeyGen};

use crate::error::EngineError;
use crate::key_engine::KeyEngine;
use crate::token_engine::TokenEngine;
use crate::types::{KeyMap, TokenMap, TokenRecord};

/// Dropping every cached entry at once. Factory teardown uses this so key
/// material does not linger in evicted protectors.
pub trait CacheClear: Send + Sync {
    fn clear(&self);
}

struct Entry<T> {
    value: T,
    expires_at: Instant,
}

impl<T> Entry<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

// ---------------------------------------------------------------------------
// Key engine cache
// ---------------------------------------------------------------------------

/// TTL cache over a [`KeyEngine`], keyed by `(namespace, key_id)`.
pub struct KeyEngineCache {
    inner: Arc<dyn KeyEngine>,
    ttl: Duration,
    entries: RwLock<HashMap<(String, String), Entry<Key>>>,
}

impl KeyEngineCache {
    pub fn new(inner: Arc<dyn KeyEngine>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn cached(&self, namespace: &str, key_id: &str) -> Option<Key> {
        let entries = self.entries.read().unwrap();
        entries
            .get(&(namespace.to_string(), key_id.to_string()))
            .filter(|e| e.live())
            .map(|e| e.value.clone())
    }

    fn populate(&self, namespace: &str, keys: &KeyMap) {
        let mut entries = self.entries.write().unwrap();
        for (id, key) in keys {
            entries.insert(
                (namespace.to_string(), id.clone()),
                Entry::new(key.clone(), self.ttl),
            );
        }
    }

    fn invalidate(&self, namespace: &str, key_id: &str) {
        self.entries
            .write()
            .unwrap()
            .remove(&(namespace.to_string(), key_id.to_string()));
    }

    fn invalidate_namespace(&self, namespace: &str) {
        self.entries
            .write()
            .unwrap()
            .retain(|(ns, _), _| ns != namespace);
    }
}

impl CacheClear for KeyEngineCache {
    fn clear(&self) {
        // Keys zeroize as their entries drop.
        self.entries.write().unwrap().clear();
    }
}

#[async_trait]
impl KeyEngine for KeyEngineCache {
    async fn get_or_create_keys(
        &self,
        namespace: &str,
        key_ids: &[String],
        key_gen: KeyGen,
    ) -> Result<KeyMap, EngineError> {
        let mut keys = KeyMap::new();
        let mut misses = Vec::new();
        for id in key_ids {
            match self.cached(namespace, id) {
                Some(key) => {
                    keys.insert(id.clone(), key);
                }
                None => misses.push(id.clone()),
            }
        }
        if !misses.is_empty() {
            let fetched = self.inner.get_or_create_keys(namespace, &misses, key_gen).await?;
            self.populate(namespace, &fetched);
            keys.extend(fetched);
        }
        Ok(keys)
    }

    async fn get_keys(
        &self,
        namespace: &str,
        key_ids: Option<&[String]>,
    ) -> Result<KeyMap, EngineError> {
        match key_ids {
            // Whole-namespace reads bypass the cache: only the engine knows
            // the full id set.
            None => {
                let fetched = self.inner.get_keys(namespace, None).await?;
                self.populate(namespace, &fetched);
                Ok(fetched)
            }
            Some(ids) => {
                let mut keys = KeyMap::new();
                let mut misses = Vec::new();
                for id in ids {
                    match self.cached(namespace, id) {
                        Some(key) => {
                            keys.insert(id.clone(), key);
                        }
                        None => misses.push(id.clone()),
                    }
                }
                if !misses.is_empty() {
                    let fetched = self.inner.get_keys(namespace, Some(&misses)).await?;
                    self.populate(namespace, &fetched);
                    keys.extend(fetched);
                }
                Ok(keys)
            }
        }
    }

    async fn disable_key(&self, namespace: &str, key_id: &str) -> Result<(), EngineError> {
        self.invalidate(namespace, key_id);
        self.inner.disable_key(namespace, key_id).await
    }

    async fn re_enable_key(&self, namespace: &str, key_id: &str) -> Result<(), EngineError> {
        self.invalidate(namespace, key_id);
        self.inner.re_enable_key(namespace, key_id).await
    }

    async fn delete_key(&self, namespace: &str, key_id: &str) -> Result<(), EngineError> {
        self.invalidate(namespace, key_id);
        self.inner.delete_key(namespace, key_id).await
    }

    async fn delete_unused_keys(&self, namespace: &str) -> Result<(), EngineError> {
        // The sweep's reach is only known to the engine; drop the namespace.
        self.invalidate_namespace(namespace);
        self.inner.delete_unused_keys(namespace).await
    }

    async fn list_namespaces(&self) -> Result<Vec<String>, EngineError> {
        self.inner.list_namespaces().await
    }
}

// ---------------------------------------------------------------------------
// Token engine cache
// ---------------------------------------------------------------------------

/// TTL cache over a [`TokenEngine`], maintained in both directions:
/// `(namespace, value) → record` and `(namespace, token) → record`.
pub struct TokenEngineCache {
    inner: Arc<dyn TokenEngine>,
    ttl: Duration,
    by_value: RwLock<HashMap<(String, String), Entry<TokenRecord>>>,
    by_token: RwLock<HashMap<(String, String), Entry<TokenRecord>>>,
}

impl TokenEngineCache {
    pub fn new(inner: Arc<dyn TokenEngine>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            by_value: RwLock::new(HashMap::new()),
            by_token: RwLock::new(HashMap::new()),
        }
    }

    fn populate<'a>(&self, namespace: &str, records: impl Iterator<Item = &'a TokenRecord>) {
        let mut by_value = self.by_value.write().unwrap();
        let mut by_token = self.by_token.write().unwrap();
        for record in records {
            by_value.insert(
                (namespace.to_string(), record.value.clone()),
                Entry::new(record.clone(), self.ttl),
            );
            by_token.insert(
                (namespace.to_string(), record.token.clone()),
                Entry::new(record.clone(), self.ttl),
            );
        }
    }
}

impl CacheClear for TokenEngineCache {
    fn clear(&self) {
        self.by_value.write().unwrap().clear();
        self.by_token.write().unwrap().clear();
    }
}

#[async_trait]
impl TokenEngine for TokenEngineCache {
    async fn tokenize(
        &self,
        namespace: &str,
        values: &[String],
    ) -> Result<TokenMap, EngineError> {
        let mut result = TokenMap::new();
        let mut misses = Vec::new();
        {
            let by_value = self.by_value.read().unwrap();
            for value in values {
                match by_value
                    .get(&(namespace.to_string(), value.clone()))
                    .filter(|e| e.live())
                {
                    Some(entry) => {
                        result.insert(value.clone(), entry.value.clone());
                    }
                    None => misses.push(value.clone()),
                }
            }
        }
        if !misses.is_empty() {
            let fetched = self.inner.tokenize(namespace, &misses).await?;
            self.populate(namespace, fetched.values());
            result.extend(fetched);
        }
        Ok(result)
    }

    async fn detokenize(
        &self,
        namespace: &str,
        tokens: &[String],
    ) -> Result<TokenMap, EngineError> {
        let mut result = TokenMap::new();
        let mut misses = Vec::new();
        {
            let by_token = self.by_token.read().unwrap();
            for token in tokens {
                match by_token
                    .get(&(namespace.to_string(), token.clone()))
                    .filter(|e| e.live())
                {
                    Some(entry) => {
                        result.insert(token.clone(), entry.value.clone());
                    }
                    None => misses.push(token.clone()),
                }
            }
        }
        if !misses.is_empty() {
            let fetched = self.inner.detokenize(namespace, &misses).await?;
            self.populate(namespace, fetched.values());
            result.extend(fetched);
        }
        Ok(result)
    }

    async fn delete_token(&self, namespace: &str, token: &str) -> Result<(), EngineError> {
        // Purge both directions before the engine forgets the pair. The
        // value-side entry is found by scanning because its own key may have
        // expired out of the token-side map already.
        self.by_token
            .write()
            .unwrap()
            .remove(&(namespace.to_string(), token.to_string()));
        self.by_value
            .write()
            .unwrap()
            .retain(|(ns, _), entry| ns != namespace || entry.value.token != token);
        self.inner.delete_token(namespace, token).await
    }
}
