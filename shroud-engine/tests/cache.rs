//! Cache-wrapper behavior: hits avoid the wrapped engine, mutations
//! invalidate, entries expire after the TTL, clear drops everything.

use std::sync::Arc;
use std::time::Duration;

use shroud_cipher::{random_key_gen, AES256_KEY_SIZE};
use shroud_engine::cache::CacheClear;
use shroud_engine::testkit::CountingKeyEngine;
use shroud_engine::{EngineError, KeyEngine, KeyEngineCache};

fn ids(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn reads_are_served_from_cache() {
    let origin = Arc::new(CountingKeyEngine::new());
    let cache = KeyEngineCache::new(origin.clone(), Duration::from_secs(60));
    let key_gen = random_key_gen(AES256_KEY_SIZE);
    let subject = ids(&["subject-1"]);

    let created = cache
        .get_or_create_keys("tenant-a", &subject, key_gen.clone())
        .await
        .unwrap();
    assert_eq!(origin.reads(), 1);

    // Both read paths hit the cache now.
    let got = cache.get_keys("tenant-a", Some(&subject)).await.unwrap();
    let again = cache
        .get_or_create_keys("tenant-a", &subject, key_gen)
        .await
        .unwrap();
    assert_eq!(origin.reads(), 1);
    assert_eq!(got, created);
    assert_eq!(again, created);
}

#[tokio::test]
async fn entries_expire_after_ttl() {
    let origin = Arc::new(CountingKeyEngine::new());
    let cache = KeyEngineCache::new(origin.clone(), Duration::from_millis(40));
    let key_gen = random_key_gen(AES256_KEY_SIZE);
    let subject = ids(&["subject-1"]);

    cache
        .get_or_create_keys("tenant-a", &subject, key_gen)
        .await
        .unwrap();
    assert_eq!(origin.reads(), 1);

    tokio::time::sleep(Duration::from_millis(60)).await;

    cache.get_keys("tenant-a", Some(&subject)).await.unwrap();
    assert_eq!(origin.reads(), 2, "expired entry must fall through");
}

#[tokio::test]
async fn mutations_invalidate_before_delegating() {
    let origin = Arc::new(CountingKeyEngine::new());
    let cache = KeyEngineCache::new(origin, Duration::from_secs(60));
    let key_gen = random_key_gen(AES256_KEY_SIZE);
    let subject = ids(&["subject-1"]);

    cache
        .get_or_create_keys("tenant-a", &subject, key_gen)
        .await
        .unwrap();

    // A stale cache would still return the disabled key here.
    cache.disable_key("tenant-a", "subject-1").await.unwrap();
    let got = cache.get_keys("tenant-a", Some(&subject)).await.unwrap();
    assert!(got.is_empty());
}

#[tokio::test]
async fn clear_forces_fallthrough() {
    let origin = Arc::new(CountingKeyEngine::new());
    let cache = KeyEngineCache::new(origin.clone(), Duration::from_secs(60));
    let key_gen = random_key_gen(AES256_KEY_SIZE);
    let subject = ids(&["subject-1"]);

    cache
        .get_or_create_keys("tenant-a", &subject, key_gen)
        .await
        .unwrap();
    assert_eq!(origin.reads(), 1);

    cache.clear();

    cache.get_keys("tenant-a", Some(&subject)).await.unwrap();
    assert_eq!(origin.reads(), 2);
}

#[tokio::test]
async fn error_kinds_pass_through_unchanged() {
    let origin = Arc::new(CountingKeyEngine::new());
    let cache = KeyEngineCache::new(origin, Duration::from_secs(60));

    let err = cache.disable_key("tenant-a", "ghost").await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
    let err = cache.re_enable_key("tenant-a", "ghost").await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}
