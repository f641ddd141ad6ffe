//! The in-memory engines and their cache-wrapped forms must satisfy the same
//! contracts.

use std::sync::Arc;
use std::time::Duration;

use shroud_engine::testkit;
use shroud_engine::{
    InMemoryKeyEngine, InMemoryTokenEngine, KeyEngineCache, TokenEngineCache,
};

#[tokio::test]
async fn in_memory_key_engine() {
    let engine = InMemoryKeyEngine::new();
    testkit::run_key_engine_suite(&engine).await;
}

#[tokio::test]
async fn cache_wrapped_key_engine() {
    let origin = Arc::new(InMemoryKeyEngine::new());
    let engine = KeyEngineCache::new(origin, Duration::from_secs(20 * 60));
    testkit::run_key_engine_suite(&engine).await;
}

#[tokio::test]
async fn in_memory_key_engine_grace_sweep() {
    let grace = Duration::from_millis(50);
    let engine = InMemoryKeyEngine::with_grace_period(grace);
    testkit::run_key_engine_grace_suite(&engine, grace).await;
}

#[tokio::test]
async fn cache_wrapped_key_engine_grace_sweep() {
    let grace = Duration::from_millis(50);
    let origin = Arc::new(InMemoryKeyEngine::with_grace_period(grace));
    let engine = KeyEngineCache::new(origin, Duration::from_secs(20 * 60));
    testkit::run_key_engine_grace_suite(&engine, grace).await;
}

#[tokio::test]
async fn in_memory_token_engine() {
    let engine = InMemoryTokenEngine::new();
    testkit::run_token_engine_suite(&engine).await;
}

#[tokio::test]
async fn cache_wrapped_token_engine() {
    let origin = Arc::new(InMemoryTokenEngine::new());
    let engine = TokenEngineCache::new(origin, Duration::from_secs(20 * 60));
    testkit::run_token_engine_suite(&engine).await;
}
