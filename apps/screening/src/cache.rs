//! Content-addressed memoization for expensive, deterministic-by-input
//! operations (extraction, interpretation, analysis).
//!
//! The cache is advisory, never authoritative: a store failure degrades to a
//! miss on read and to a warning on write, and never fails the caller.
//! Computation failures are never stored, so a retry is not poisoned by a
//! stale failure record.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hasher;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use twox_hash::XxHash64;

/// Deterministic cache key: operation name, canonicalized input, and the
/// logic version of the code that computes the value. Bumping the version
/// changes every key, which transparently invalidates stale entries.
pub fn fingerprint(operation: &str, input: &str, version: &str) -> String {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(operation.as_bytes());
    hasher.write(&[0]);
    hasher.write(input.as_bytes());
    hasher.write(&[0]);
    hasher.write(version.as_bytes());
    format!("{operation}:{version}:{:016x}", hasher.finish())
}

/// Whether a lookup was served from the store. Carried into report
/// provenance for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Miss,
}

/// Narrow key-value interface over a cache backend. All methods are
/// advisory: implementations log failures and report them as misses or
/// no-ops instead of returning errors.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> bool;
    async fn delete(&self, key: &str) -> bool;
}

/// In-process store backing tests and single-node deployments.
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, (String, Option<Instant>)>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((_, Some(deadline))) if *deadline <= Instant::now() => {
                entries.remove(key);
                None
            }
            Some((value, _)) => Some(value.clone()),
            None => None,
        }
    }

    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> bool {
        let deadline = ttl.map(|d| Instant::now() + d);
        self.entries
            .lock()
            .await
            .insert(key.to_string(), (value.to_string(), deadline));
        true
    }

    async fn delete(&self, key: &str) -> bool {
        self.entries.lock().await.remove(key).is_some()
    }
}

/// Redis-backed store for shared deployments. Connection failures degrade
/// to misses.
pub struct RedisCacheStore {
    client: redis::Client,
}

impl RedisCacheStore {
    pub fn new(url: &str) -> Result<Self, redis::RedisError> {
        Ok(Self {
            client: redis::Client::open(url)?,
        })
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Option<String> {
        use redis::AsyncCommands;
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(c) => c,
            Err(e) => {
                warn!("cache get: redis unavailable: {e}");
                return None;
            }
        };
        match conn.get::<_, Option<String>>(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!("cache get failed for {key}: {e}");
                None
            }
        }
    }

    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> bool {
        use redis::AsyncCommands;
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(c) => c,
            Err(e) => {
                warn!("cache put: redis unavailable: {e}");
                return false;
            }
        };
        let result = match ttl {
            Some(d) => conn.set_ex::<_, _, ()>(key, value, d.as_secs()).await,
            None => conn.set::<_, _, ()>(key, value).await,
        };
        if let Err(e) = result {
            warn!("cache put failed for {key}: {e}");
            return false;
        }
        true
    }

    async fn delete(&self, key: &str) -> bool {
        use redis::AsyncCommands;
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(c) => c,
            Err(e) => {
                warn!("cache delete: redis unavailable: {e}");
                return false;
            }
        };
        match conn.del::<_, u64>(key).await {
            Ok(n) => n > 0,
            Err(e) => {
                warn!("cache delete failed for {key}: {e}");
                false
            }
        }
    }
}

/// Memoization layer with single-flight coalescing.
///
/// `get_or_compute` guarantees that across concurrent callers sharing a key,
/// a successful computation runs exactly once: the first caller computes
/// under a per-key gate while the rest wait, then observe the stored value
/// as a hit. A failed computation is returned to the caller that ran it and
/// nothing is stored, so the next caller through the gate retries cleanly.
pub struct CacheLayer {
    store: Arc<dyn CacheStore>,
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CacheLayer {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Plain lookup with a hit/miss flag. Undeserializable entries count as
    /// misses and are purged.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> (Option<T>, CacheOutcome) {
        match self.store.get(key).await {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    debug!("cache hit: {key}");
                    (Some(value), CacheOutcome::Hit)
                }
                Err(e) => {
                    warn!("cache entry for {key} undeserializable, purging: {e}");
                    self.store.delete(key).await;
                    (None, CacheOutcome::Miss)
                }
            },
            None => {
                debug!("cache miss: {key}");
                (None, CacheOutcome::Miss)
            }
        }
    }

    /// Returns the cached value if present, else runs `compute` under the
    /// key's single-flight gate, stores the result, and returns it. A store
    /// failure never fails the call — the freshly computed value is still
    /// returned.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        compute: F,
    ) -> Result<(T, CacheOutcome), E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let (Some(value), CacheOutcome::Hit) = self.get(key).await {
            return Ok((value, CacheOutcome::Hit));
        }

        let gate = {
            let mut inflight = self.inflight.lock().await;
            inflight
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _guard = gate.lock().await;

        // A coalesced waiter lands here after the leader finished; the
        // leader's result is now in the store.
        if let (Some(value), CacheOutcome::Hit) = self.get(key).await {
            self.release_gate(key, &gate).await;
            return Ok((value, CacheOutcome::Hit));
        }

        let result = compute().await;

        if let Ok(value) = &result {
            match serde_json::to_string(value) {
                Ok(raw) => {
                    if !self.store.put(key, &raw, ttl).await {
                        warn!("failed to persist cache entry {key}; returning computed value");
                    }
                }
                Err(e) => warn!("cache value for {key} unserializable: {e}"),
            }
        }

        self.release_gate(key, &gate).await;
        result.map(|value| (value, CacheOutcome::Miss))
    }

    pub async fn invalidate(&self, key: &str) -> bool {
        self.store.delete(key).await
    }

    async fn release_gate(&self, key: &str, gate: &Arc<Mutex<()>>) {
        let mut inflight = self.inflight.lock().await;
        // The map holds one reference and this caller another; anything more
        // means a waiter is still queued on the gate.
        if Arc::strong_count(gate) <= 2 {
            inflight.remove(key);
        }
    }
}
