//! Reusable conformance suites for engine implementations.
//!
//! Backend drivers (a database- or KMS-backed engine) should pass the same
//! suites as the in-memory reference engines. Each suite works inside a
//! random namespace so repeated runs never collide.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use shroud_cipher::{random_key_gen, Cipher, CipherError, Key, KeyGen, AES256_KEY_SIZE};

use crate::error::EngineError;
use crate::key_engine::{InMemoryKeyEngine, KeyEngine};
use crate::token_engine::TokenEngine;
use crate::types::KeyMap;

/// A short random identifier for test subjects and values.
pub fn random_id() -> String {
    let mut data = [0u8; 8];
    getrandom::getrandom(&mut data).expect("rng");
    hex::encode(data)
}

/// Drives a key engine through the full lifecycle contract.
pub async fn run_key_engine_suite(engine: &dyn KeyEngine) {
    let namespace = format!("tenant-{}", random_id());
    let key_gen = random_key_gen(AES256_KEY_SIZE);

    let keys = engine.get_keys(&namespace, None).await.unwrap();
    assert!(keys.is_empty(), "fresh namespace must hold no keys");

    let ids = vec![random_id(), random_id(), random_id()];

    // First call creates; later calls return the same material.
    let created = engine
        .get_or_create_keys(&namespace, &ids[..1], key_gen.clone())
        .await
        .unwrap();
    assert_eq!(created.len(), 1);
    let first = created.get(&ids[0]).cloned().expect("created key present");

    let all = engine
        .get_or_create_keys(&namespace, &ids, key_gen.clone())
        .await
        .unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all.get(&ids[0]), Some(&first), "existing key must be reused");

    // Subset reads.
    let partial = engine.get_keys(&namespace, Some(&ids[1..])).await.unwrap();
    assert_eq!(partial.len(), 2);
    assert!(!partial.contains_key(&ids[0]));

    // Disable hides the key and is idempotent.
    engine.disable_key(&namespace, &ids[0]).await.unwrap();
    engine.disable_key(&namespace, &ids[0]).await.unwrap();
    assert!(engine
        .get_keys(&namespace, Some(&ids[..1]))
        .await
        .unwrap()
        .is_empty());

    // A disabled id is omitted from get_or_create, never replaced.
    let without_disabled = engine
        .get_or_create_keys(&namespace, &ids, key_gen.clone())
        .await
        .unwrap();
    assert_eq!(without_disabled.len(), 2);
    assert!(!without_disabled.contains_key(&ids[0]));

    // Re-enable restores the original material and is idempotent.
    engine.re_enable_key(&namespace, &ids[0]).await.unwrap();
    engine.re_enable_key(&namespace, &ids[0]).await.unwrap();
    let restored = engine.get_keys(&namespace, Some(&ids[..1])).await.unwrap();
    assert_eq!(restored.get(&ids[0]), Some(&first));

    // Delete drops any state and is idempotent.
    engine.disable_key(&namespace, &ids[0]).await.unwrap();
    engine.delete_key(&namespace, &ids[0]).await.unwrap();
    engine.delete_key(&namespace, &ids[0]).await.unwrap();
    assert!(engine
        .get_keys(&namespace, Some(&ids[..1]))
        .await
        .unwrap()
        .is_empty());

    // Hard-deleted ids cannot change state.
    assert!(matches!(
        engine.re_enable_key(&namespace, &ids[0]).await,
        Err(EngineError::KeyNotFound(_))
    ));
    assert!(matches!(
        engine.disable_key(&namespace, &ids[0]).await,
        Err(EngineError::KeyNotFound(_))
    ));

    // The namespace shows up in the listing while keys remain.
    let namespaces = engine.list_namespaces().await.unwrap();
    assert!(namespaces.contains(&namespace));
}

/// Exercises the grace-period sweep. `grace` must match the engine's
/// configured grace period and should be short.
pub async fn run_key_engine_grace_suite(engine: &dyn KeyEngine, grace: Duration) {
    let namespace = format!("tenant-{}", random_id());
    let key_gen = random_key_gen(AES256_KEY_SIZE);
    let id = random_id();

    engine
        .get_or_create_keys(&namespace, std::slice::from_ref(&id), key_gen)
        .await
        .unwrap();
    engine.disable_key(&namespace, &id).await.unwrap();

    tokio::time::sleep(grace + Duration::from_millis(20)).await;

    engine.delete_unused_keys(&namespace).await.unwrap();
    // Idempotent.
    engine.delete_unused_keys(&namespace).await.unwrap();

    assert!(matches!(
        engine.re_enable_key(&namespace, &id).await,
        Err(EngineError::KeyNotFound(_))
    ));
}

/// Drives a token engine through the bijection contract.
pub async fn run_token_engine_suite(engine: &dyn TokenEngine) {
    let namespace = format!("tenant-{}", random_id());
    let values = vec![random_id(), random_id(), random_id()];

    let first = engine.tokenize(&namespace, &values).await.unwrap();
    assert_eq!(first.len(), 3);

    // Stable across repeated calls.
    let second = engine.tokenize(&namespace, &values).await.unwrap();
    assert_eq!(first, second);

    // Tokens resolve back to the original values.
    let tokens: Vec<String> = first.values().map(|r| r.token.clone()).collect();
    let resolved = engine.detokenize(&namespace, &tokens).await.unwrap();
    assert_eq!(resolved.len(), 3);
    for (token, record) in &resolved {
        assert_eq!(&record.token, token);
        assert!(values.contains(&record.value));
    }

    // Unknown tokens are omitted, not errors.
    let missing = engine
        .detokenize(&namespace, &["no-such-token".to_string()])
        .await
        .unwrap();
    assert!(missing.is_empty());

    // Deleting breaks the reverse mapping; re-tokenizing mints fresh.
    let victim = first.get(&values[0]).unwrap().token.clone();
    engine.delete_token(&namespace, &victim).await.unwrap();
    assert!(engine
        .detokenize(&namespace, std::slice::from_ref(&victim))
        .await
        .unwrap()
        .is_empty());

    let third = engine.tokenize(&namespace, &values).await.unwrap();
    assert_ne!(third.get(&values[0]).unwrap().token, victim);
    // Untouched values keep their pseudonyms.
    assert_eq!(third.get(&values[1]), first.get(&values[1]));
}

// ---------------------------------------------------------------------------
// Failure-injecting cipher
// ---------------------------------------------------------------------------

/// A cipher that succeeds `failure_point` times, then fails every call.
///
/// Lets tests exercise mid-batch failure paths without touching real
/// cryptography: "ciphertexts" are the plaintext with a `mock` prefix.
pub struct FlakyCipher {
    state: Mutex<FlakyState>,
}

struct FlakyState {
    counter: usize,
    failure_point: usize,
}

impl FlakyCipher {
    pub fn new(failure_point: usize) -> Self {
        Self {
            state: Mutex::new(FlakyState {
                counter: 0,
                failure_point,
            }),
        }
    }

    /// Restarts the call counter, optionally moving the failure point.
    pub fn reset(&self, failure_point: usize) {
        let mut state = self.state.lock().unwrap();
        state.counter = 0;
        state.failure_point = failure_point;
    }

    fn tick(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.counter >= state.failure_point {
            return false;
        }
        state.counter += 1;
        true
    }
}

impl Cipher for FlakyCipher {
    fn encrypt(
        &self,
        _namespace: &str,
        _key: &Key,
        plaintext: &str,
    ) -> Result<Vec<u8>, CipherError> {
        if !self.tick() {
            return Err(CipherError::EncryptionFailure("injected failure".into()));
        }
        Ok(format!("mock{}", plaintext).into_bytes())
    }

    fn decrypt(
        &self,
        _namespace: &str,
        _key: &Key,
        ciphertext: &[u8],
    ) -> Result<String, CipherError> {
        if !self.tick() {
            return Err(CipherError::DecryptionFailure("injected failure".into()));
        }
        String::from_utf8(ciphertext.to_vec())
            .ok()
            .and_then(|s| s.strip_prefix("mock").map(str::to_string))
            .ok_or_else(|| CipherError::DecryptionFailure("not a mock ciphertext".into()))
    }

    fn key_gen(&self) -> KeyGen {
        random_key_gen(AES256_KEY_SIZE)
    }
}

// ---------------------------------------------------------------------------
// Read-counting engine
// ---------------------------------------------------------------------------

/// An in-memory key engine that counts the reads reaching it.
///
/// Wrap it in a cache decorator to assert which reads were served from the
/// cache and which fell through.
pub struct CountingKeyEngine {
    inner: InMemoryKeyEngine,
    reads: AtomicUsize,
}

impl CountingKeyEngine {
    pub fn new() -> Self {
        Self {
            inner: InMemoryKeyEngine::new(),
            reads: AtomicUsize::new(0),
        }
    }

    /// How many `get_keys` / `get_or_create_keys` calls reached this engine.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl Default for CountingKeyEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyEngine for CountingKeyEngine {
    async fn get_or_create_keys(
        &self,
        namespace: &str,
        key_ids: &[String],
        key_gen: KeyGen,
    ) -> Result<KeyMap, EngineError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get_or_create_keys(namespace, key_ids, key_gen).await
    }

    async fn get_keys(
        &self,
        namespace: &str,
        key_ids: Option<&[String]>,
    ) -> Result<KeyMap, EngineError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get_keys(namespace, key_ids).await
    }

    async fn disable_key(&self, namespace: &str, key_id: &str) -> Result<(), EngineError> {
        self.inner.disable_key(namespace, key_id).await
    }

    async fn re_enable_key(&self, namespace: &str, key_id: &str) -> Result<(), EngineError> {
        self.inner.re_enable_key(namespace, key_id).await
    }

    async fn delete_key(&self, namespace: &str, key_id: &str) -> Result<(), EngineError> {
        self.inner.delete_key(namespace, key_id).await
    }

    async fn delete_unused_keys(&self, namespace: &str) -> Result<(), EngineError> {
        self.inner.delete_unused_keys(namespace).await
    }

    async fn list_namespaces(&self) -> Result<Vec<String>, EngineError> {
        self.inner.list_namespaces().await
    }
}
