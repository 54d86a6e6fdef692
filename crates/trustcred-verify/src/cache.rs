//! # Read-through Cache Store
//!
//! [`CacheStore`] is the `GET` / `SETEX` / `DEL` surface the verification
//! pipeline needs. Two backends:
//!
//! - [`MemoryCache`] -- in-process TTL map for development and tests.
//! - [`RedisCache`] -- shared Redis instance in production.
//!
//! ## Keys
//!
//! [`CacheKeys`] owns the key scheme: `{prefix}credential:{id}` for raw
//! ledger reads (300 s) and `{prefix}verification:{id}` for merged results
//! (60 s). Values are JSON.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use trustcred_core::CredentialId;

use crate::error::CacheError;

/// TTL for raw ledger credential reads.
pub const CREDENTIAL_TTL: Duration = Duration::from_secs(300);
/// TTL for merged verification results.
pub const VERIFICATION_TTL: Duration = Duration::from_secs(60);
/// Default key prefix.
pub const DEFAULT_KEY_PREFIX: &str = "trustcred:";

/// String-keyed TTL store.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    async fn del(&self, key: &str) -> Result<(), CacheError>;

    async fn ping(&self) -> Result<(), CacheError>;

    /// Backend name for health reporting.
    fn backend(&self) -> &'static str;
}

/// Cache key scheme.
#[derive(Debug, Clone)]
pub struct CacheKeys {
    prefix: String,
}

impl Default for CacheKeys {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_PREFIX)
    }
}

impl CacheKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn credential(&self, id: &CredentialId) -> String {
        format!("{}credential:{}", self.prefix, id)
    }

    pub fn verification(&self, id: &CredentialId) -> String {
        format!("{}verification:{}", self.prefix, id)
    }
}

// -- In-process backend -------------------------------------------------------

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct Slots {
    entries: HashMap<String, Entry>,
    /// Min-heap of `(expires_at, key)`, one per write. Overwritten keys
    /// leave stale items behind; those are skipped when popped.
    expiries: BinaryHeap<Reverse<(Instant, String)>>,
}

impl Slots {
    /// Drop every entry whose deadline is at or before `now`.
    fn purge_expired(&mut self, now: Instant) {
        while let Some(Reverse((deadline, _))) = self.expiries.peek() {
            if *deadline > now {
                break;
            }
            let Some(Reverse((deadline, key))) = self.expiries.pop() else {
                break;
            };
            if self
                .entries
                .get(&key)
                .is_some_and(|e| e.expires_at == deadline)
            {
                self.entries.remove(&key);
            }
        }
    }
}

/// In-process TTL map. Expired entries are dropped on the next write, so
/// the map never holds more than the keys written within one TTL.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    slots: Arc<RwLock<Slots>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.slots
            .read()
            .entries
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries physically held, expired or not.
    pub fn stored(&self) -> usize {
        self.slots.read().entries.len()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        {
            let slots = self.slots.read();
            match slots.entries.get(key) {
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
                None => return Ok(None),
                Some(_) => {}
            }
        }
        let mut slots = self.slots.write();
        if slots.entries.get(key).is_some_and(|e| e.expires_at <= now) {
            slots.entries.remove(key);
        }
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let expires_at = now + ttl;
        let mut slots = self.slots.write();
        slots.purge_expired(now);
        slots.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        slots.expiries.push(Reverse((expires_at, key.to_string())));
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        self.slots.write().entries.remove(key);
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

// -- Redis backend ------------------------------------------------------------

/// Redis-backed cache over a reconnecting connection manager.
#[derive(Clone)]
pub struct RedisCache {
    conn: redis::aio::ConnectionManager,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache").finish_non_exhaustive()
    }
}

impl RedisCache {
    /// Connect to `url` (e.g. `redis://localhost:6379`).
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let conn = redis::aio::ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        use redis::AsyncCommands;
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        use redis::AsyncCommands;
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl.as_secs().max(1)).await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        use redis::AsyncCommands;
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
