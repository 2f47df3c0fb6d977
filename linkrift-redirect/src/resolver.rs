//! Two-tier read-through cache of link snapshots.
//!
//! L1 is an in-process DashMap with a short TTL checked lazily on read; L2
//! is Redis under `link:resolve:<short_code>` with a longer TTL. Cache
//! failures at either layer are logged and fall through; only the
//! authoritative read can fail a request.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use metrics::counter;

use linkrift_shared::clients::db::DbPool;
use linkrift_shared::clients::redis::RedisClient;
use linkrift_shared::errors::AppResult;
use linkrift_shared::types::{resolve_cache_key, LinkSnapshot};

use crate::services::link_service;

struct CachedSnapshot {
    snapshot: LinkSnapshot,
    expires_at: Instant,
}

pub struct Resolver {
    db: DbPool,
    redis: RedisClient,
    l1: DashMap<String, CachedSnapshot>,
    l1_ttl: Duration,
    l2_ttl_secs: u64,
}

impl Resolver {
    pub fn new(db: DbPool, redis: RedisClient, l1_ttl: Duration, l2_ttl_secs: u64) -> Self {
        Self {
            db,
            redis,
            l1: DashMap::new(),
            l1_ttl,
            l2_ttl_secs,
        }
    }

    /// Resolve a short code: L1 → L2 → authoritative store.
    ///
    /// Concurrent misses for the same code may all reach the store; the
    /// read is idempotent and cheap, so no single-flight suppression.
    pub async fn resolve(&self, short_code: &str) -> AppResult<Option<LinkSnapshot>> {
        if let Some(entry) = self.l1.get(short_code) {
            if entry.expires_at > Instant::now() {
                counter!("resolver_l1_hits_total").increment(1);
                return Ok(Some(entry.snapshot.clone()));
            }
            drop(entry);
            // Lazy eviction of the expired entry.
            self.l1.remove(short_code);
        }

        match self.redis.get(&resolve_cache_key(short_code)).await {
            Ok(Some(raw)) => match serde_json::from_str::<LinkSnapshot>(&raw) {
                Ok(snapshot) => {
                    counter!("resolver_l2_hits_total").increment(1);
                    self.insert_l1(snapshot.clone());
                    return Ok(Some(snapshot));
                }
                Err(e) => {
                    tracing::warn!(short_code = %short_code, error = %e, "corrupt L2 snapshot, falling through");
                }
            },
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(short_code = %short_code, error = %e, "L2 lookup failed, falling through");
            }
        }

        counter!("resolver_store_reads_total").increment(1);
        let Some(snapshot) = link_service::build_snapshot(&self.db, short_code)? else {
            return Ok(None);
        };
        self.insert(snapshot.clone()).await;
        Ok(Some(snapshot))
    }

    /// Write a snapshot to both layers. Cache write failures log only.
    pub async fn insert(&self, snapshot: LinkSnapshot) {
        match serde_json::to_string(&snapshot) {
            Ok(raw) => {
                if let Err(e) = self
                    .redis
                    .set(&resolve_cache_key(&snapshot.short_code), &raw, self.l2_ttl_secs)
                    .await
                {
                    tracing::warn!(short_code = %snapshot.short_code, error = %e, "L2 cache write failed");
                }
            }
            Err(e) => {
                tracing::warn!(short_code = %snapshot.short_code, error = %e, "snapshot serialization failed");
            }
        }
        self.insert_l1(snapshot);
    }

    /// Drop a short code from both layers. Delete failures log only.
    pub async fn invalidate(&self, short_code: &str) {
        self.l1.remove(short_code);
        if let Err(e) = self.redis.del(&resolve_cache_key(short_code)).await {
            tracing::warn!(short_code = %short_code, error = %e, "L2 cache delete failed");
        }
    }

    fn insert_l1(&self, snapshot: LinkSnapshot) {
        self.l1.insert(
            snapshot.short_code.clone(),
            CachedSnapshot {
                snapshot,
                expires_at: Instant::now() + self.l1_ttl,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l2_keys_follow_the_documented_scheme() {
        assert_eq!(resolve_cache_key("abc"), "link:resolve:abc");
    }
}
