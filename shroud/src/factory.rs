//! Per-tenant protector registry with background idle eviction.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};

use crate::protector::Protector;

/// Builds a protector for a tenant on first use.
pub type BuildProtector = dyn Fn(&str) -> Arc<Protector> + Send + Sync;

/// Default idle window before a cached protector is evicted.
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(15 * 60);

/// Default monitor tick.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(60);

struct FactoryEntry {
    protector: Arc<Protector>,
    last_used: Mutex<Instant>,
}

/// Caches one protector per tenant and hands out [`ClearHandle`]s so callers
/// can drop cached key material as soon as they are done.
///
/// [`Factory::monitor`] runs the companion background task that evicts idle
/// protectors and clears their caches.
pub struct Factory {
    build: Box<BuildProtector>,
    entries: RwLock<HashMap<String, FactoryEntry>>,
    idle_ttl: Duration,
    check_interval: Duration,
}

/// Invoke [`clear`](ClearHandle::clear) when done with a protector to drop
/// its cached key material immediately instead of waiting for eviction.
pub struct ClearHandle {
    protector: Arc<Protector>,
}

impl ClearHandle {
    pub fn clear(&self) {
        self.protector.clear_caches();
    }
}

impl Factory {
    pub fn new(build: impl Fn(&str) -> Arc<Protector> + Send + Sync + 'static) -> Self {
        Self {
            build: Box::new(build),
            entries: RwLock::new(HashMap::new()),
            idle_ttl: DEFAULT_IDLE_TTL,
            check_interval: DEFAULT_CHECK_INTERVAL,
        }
    }

    pub fn with_idle_ttl(mut self, idle_ttl: Duration) -> Self {
        self.idle_ttl = idle_ttl;
        self
    }

    pub fn with_check_interval(mut self, check_interval: Duration) -> Self {
        self.check_interval = check_interval;
        self
    }

    /// Returns the tenant's protector, building one on first use, plus a
    /// handle for clearing its caches when the caller is done.
    pub fn instance(&self, tenant_id: &str) -> (Arc<Protector>, ClearHandle) {
        if let Some(entry) = self.entries.read().unwrap().get(tenant_id) {
            *entry.last_used.lock().unwrap() = Instant::now();
            let protector = entry.protector.clone();
            return (protector.clone(), ClearHandle { protector });
        }

        let mut entries = self.entries.write().unwrap();
        let entry = entries.entry(tenant_id.to_string()).or_insert_with(|| {
            tracing::debug!(tenant_id, "building protector");
            FactoryEntry {
                protector: (self.build)(tenant_id),
                last_used: Mutex::new(Instant::now()),
            }
        });
        *entry.last_used.lock().unwrap() = Instant::now();
        let protector = entry.protector.clone();
        (protector.clone(), ClearHandle { protector })
    }

    /// How many protectors are currently cached.
    pub fn active_instances(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Evicts protectors idle longer than the configured TTL, clearing
    /// their caches.
    pub fn evict_idle(&self) {
        let idle_ttl = self.idle_ttl;
        let mut entries = self.entries.write().unwrap();
        entries.retain(|tenant_id, entry| {
            let idle = entry.last_used.lock().unwrap().elapsed();
            if idle < idle_ttl {
                return true;
            }
            tracing::info!(%tenant_id, idle_secs = idle.as_secs(), "evicting idle protector");
            entry.protector.clear_caches();
            false
        });
    }

    /// Clears every cached protector's caches and drops the registry.
    pub fn clear_all(&self) {
        let mut entries = self.entries.write().unwrap();
        for entry in entries.values() {
            entry.protector.clear_caches();
        }
        entries.clear();
    }

    /// Spawns the background monitor: a single cooperative task that evicts
    /// idle protectors on every tick. On shutdown (or when the sender side
    /// of `shutdown` is dropped) it clears every cache and exits.
    pub fn monitor(self: &Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let factory = self.clone();
        tokio::spawn(async move {
            let mut tick = interval(factory.check_interval);
            tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::info!(
                check_interval_secs = factory.check_interval.as_secs(),
                idle_ttl_secs = factory.idle_ttl.as_secs(),
                "protector monitor started"
            );

            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = tick.tick() => {
                        factory.evict_idle();
                    }
                }
            }

            factory.clear_all();
            tracing::info!("protector monitor stopped");
        })
    }
}
