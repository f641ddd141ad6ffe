//! Token engine: the namespaced value ↔ pseudonym bijection.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;

use crate::error::EngineError;
use crate::types::{TokenMap, TokenRecord};

/// Random bytes in a freshly minted token (128 bits).
const TOKEN_BYTES: usize = 16;

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// The namespaced pseudonym store.
///
/// Within a namespace, `token → value` is always a function; `value → token`
/// is one until the token is deleted, after which the value gets a fresh
/// pseudonym on its next `tokenize`.
#[async_trait]
pub trait TokenEngine: Send + Sync {
    /// Resolves each value to its pseudonym, minting fresh unpredictable
    /// tokens for values seen for the first time (or whose prior token was
    /// deleted). Idempotent: repeated calls return the identical map.
    async fn tokenize(&self, namespace: &str, values: &[String])
        -> Result<TokenMap, EngineError>;

    /// Resolves tokens back to their stored values. Unknown tokens are
    /// omitted from the result; callers detect misses by absence.
    async fn detokenize(&self, namespace: &str, tokens: &[String])
        -> Result<TokenMap, EngineError>;

    /// Removes the record. Idempotent. A later `tokenize` of the original
    /// value mints a fresh token; the deleted one is never revived.
    async fn delete_token(&self, namespace: &str, token: &str) -> Result<(), EngineError>;
}

// ---------------------------------------------------------------------------
// In-memory reference engine
// ---------------------------------------------------------------------------

#[derive(Default)]
struct NamespaceTokens {
    by_value: HashMap<String, TokenRecord>,
    by_token: HashMap<String, String>,
    // Every token ever minted here, deleted ones included. No token string
    // repeats within a namespace across the engine's lifetime.
    issued: HashSet<String>,
}

/// In-memory token engine, locked per namespace like the key engine.
pub struct InMemoryTokenEngine {
    namespaces: RwLock<HashMap<String, Arc<RwLock<NamespaceTokens>>>>,
}

impl InMemoryTokenEngine {
    pub fn new() -> Self {
        Self {
            namespaces: RwLock::new(HashMap::new()),
        }
    }

    fn namespace(&self, namespace: &str) -> Arc<RwLock<NamespaceTokens>> {
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

impl Default for InMemoryTokenEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn mint_token(issued: &HashSet<String>) -> Result<String, EngineError> {
    loop {
        let mut raw = [0u8; TOKEN_BYTES];
        getrandom::getrandom(&mut raw).map_err(|e| EngineError::Storage(format!("rng: {}", e)))?;
        let token = URL_SAFE_NO_PAD.encode(raw);
        if !issued.contains(&token) {
            return Ok(token);
        }
    }
}

#[async_trait]
impl TokenEngine for InMemoryTokenEngine {
    async fn tokenize(
        &self,
        namespace: &str,
        values: &[String],
    ) -> Result<TokenMap, EngineError> {
        let ns = self.namespace(namespace);
        let mut tokens = ns.write().unwrap();

        let mut result = TokenMap::new();
        for value in values {
            if let Some(record) = tokens.by_value.get(value) {
                result.insert(value.clone(), record.clone());
                continue;
            }

            let token = mint_token(&tokens.issued)?;
            let record = TokenRecord {
                token: token.clone(),
                value: value.clone(),
                created_at: Utc::now(),
            };
            tokens.issued.insert(token.clone());
            tokens.by_token.insert(token, value.clone());
            tokens.by_value.insert(value.clone(), record.clone());
            result.insert(value.clone(), record);
        }
        Ok(result)
    }

    async fn detokenize(
        &self,
        namespace: &str,
        wanted: &[String],
    ) -> Result<TokenMap, EngineError> {
        let ns = self.namespace(namespace);
        let tokens = ns.read().unwrap();

        let mut result = TokenMap::new();
        for token in wanted {
            if let Some(value) = tokens.by_token.get(token) {
                if let Some(record) = tokens.by_value.get(value) {
                    result.insert(token.clone(), record.clone());
                }
            }
        }
        Ok(result)
    }

    async fn delete_token(&self, namespace: &str, token: &str) -> Result<(), EngineError> {
        let ns = self.namespace(namespace);
        let mut tokens = ns.write().unwrap();
        if let Some(value) = tokens.by_token.remove(token) {
            tokens.by_value.remove(&value);
            tracing::debug!(namespace, "token deleted");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tokens_are_scoped_by_namespace() {
        let engine = InMemoryTokenEngine::new();
        let values = vec!["Samanta_Murray25@hotmail.com".to_string()];

        let a = engine.tokenize("tenant-a", &values).await.unwrap();
        let b = engine.tokenize("tenant-b", &values).await.unwrap();
        assert_ne!(a[&values[0]].token, b[&values[0]].token);

        // Namespace B cannot resolve A's token.
        let cross = engine
            .detokenize("tenant-b", &[a[&values[0]].token.clone()])
            .await
            .unwrap();
        assert!(cross.is_empty());
    }

    #[tokio::test]
    async fn token_records_serialize() {
        let engine = InMemoryTokenEngine::new();
        let values = vec!["value".to_string()];
        let tokens = engine.tokenize("tenant-a", &values).await.unwrap();

        let json = serde_json::to_string(&tokens[&values[0]]).unwrap();
        let restored: TokenRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, tokens[&values[0]]);
    }
}
