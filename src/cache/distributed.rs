//! Distributed Cache Module
//!
//! Network-shared key to serialized-snapshot cache, one key per collection.
//! This tier is an optimization only; the coordinator treats every failure
//! here as a miss.
//!
//! Each snapshot key has a generation counter beside it. Invalidation bumps
//! the counter, and a snapshot built from a scan is only stored if the
//! counter has not moved since the scan began. This keeps a slow publisher
//! in one process from overwriting an invalidation issued by another.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use redis::{
    aio::ConnectionManager, AsyncCommands, Client, ConnectionAddr, ConnectionInfo,
    RedisConnectionInfo, Script,
};
use tokio::sync::{OnceCell, RwLock};
use tracing::info;

use crate::error::TierError;

/// Distributed cache facade.
#[async_trait]
pub trait DistributedCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, TierError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), TierError>;

    async fn delete(&self, key: &str) -> Result<(), TierError>;

    /// Current generation of `key`; zero if never invalidated.
    async fn generation(&self, key: &str) -> Result<u64, TierError>;

    /// Stores `value` only if the generation of `key` still equals `generation`.
    ///
    /// Returns `true` if the value was stored.
    async fn set_if_generation(
        &self,
        key: &str,
        value: &str,
        generation: u64,
    ) -> Result<bool, TierError>;

    /// Deletes `key` and bumps its generation in one atomic step.
    async fn invalidate(&self, key: &str) -> Result<(), TierError>;
}

/// Key holding the generation counter for a snapshot key.
fn generation_key(key: &str) -> String {
    format!("{key}:gen")
}

const SET_IF_GENERATION: &str = r"
    local current = redis.call('GET', KEYS[1]) or '0'
    if current == ARGV[1] then
        redis.call('SET', KEYS[2], ARGV[2])
        return 1
    end
    return 0
";

// == Redis ==
/// Redis-backed tier.
///
/// The connection is opened on first use and reopened after a failed attempt,
/// so an unreachable server never blocks startup.
pub struct RedisCache {
    client: Client,
    conn: OnceCell<ConnectionManager>,
    set_if_generation: Script,
}

impl RedisCache {
    /// Builds a client for `host:port`. No credential means an unauthenticated connection.
    pub fn new(host: &str, port: u16, password: Option<String>) -> Result<Self, TierError> {
        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(host.to_string(), port),
            redis: RedisConnectionInfo {
                password,
                ..Default::default()
            },
        };

        Ok(Self {
            client: Client::open(info)?,
            conn: OnceCell::new(),
            set_if_generation: Script::new(SET_IF_GENERATION),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, TierError> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                let manager = self.client.get_connection_manager().await?;
                info!("connected to distributed cache");
                Ok::<_, TierError>(manager)
            })
            .await?;

        Ok(conn.clone())
    }
}

#[async_trait]
impl DistributedCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, TierError> {
        let mut conn = self.connection().await?;
        Ok(conn.get::<_, Option<String>>(key).await?)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), TierError> {
        let mut conn = self.connection().await?;
        conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), TierError> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn generation(&self, key: &str) -> Result<u64, TierError> {
        let mut conn = self.connection().await?;
        let generation: Option<u64> = conn.get(generation_key(key)).await?;
        Ok(generation.unwrap_or(0))
    }

    async fn set_if_generation(
        &self,
        key: &str,
        value: &str,
        generation: u64,
    ) -> Result<bool, TierError> {
        let mut conn = self.connection().await?;
        let stored: i64 = self
            .set_if_generation
            .key(generation_key(key))
            .key(key)
            .arg(generation)
            .arg(value)
            .invoke_async(&mut conn)
            .await?;
        Ok(stored == 1)
    }

    async fn invalidate(&self, key: &str) -> Result<(), TierError> {
        let mut conn = self.connection().await?;
        let _: () = redis::pipe()
            .atomic()
            .del(key)
            .ignore()
            .incr(generation_key(key), 1)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}

// == In-Memory ==
/// In-process stand-in for a shared cache.
///
/// Clones share state, so two coordinators holding clones behave like two
/// processes sharing one server. Can be switched offline to simulate an outage.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, String>>>,
    generations: Arc<RwLock<HashMap<String, u64>>>,
    available: Arc<AtomicBool>,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self {
            entries: Arc::default(),
            generations: Arc::default(),
            available: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Reads a key regardless of availability.
    pub async fn peek(&self, key: &str) -> Option<String> {
        self.entries.read().await.get(key).cloned()
    }

    fn check_available(&self) -> Result<(), TierError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TierError::Unavailable)
        }
    }
}

#[async_trait]
impl DistributedCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, TierError> {
        self.check_available()?;
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), TierError> {
        self.check_available()?;
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), TierError> {
        self.check_available()?;
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn generation(&self, key: &str) -> Result<u64, TierError> {
        self.check_available()?;
        Ok(self.generations.read().await.get(key).copied().unwrap_or(0))
    }

    async fn set_if_generation(
        &self,
        key: &str,
        value: &str,
        generation: u64,
    ) -> Result<bool, TierError> {
        self.check_available()?;
        // Held across the write so check and store are one step
        let generations = self.generations.read().await;
        if generations.get(key).copied().unwrap_or(0) != generation {
            return Ok(false);
        }
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(true)
    }

    async fn invalidate(&self, key: &str) -> Result<(), TierError> {
        self.check_available()?;
        let mut generations = self.generations.write().await;
        self.entries.write().await.remove(key);
        *generations.entry(key.to_string()).or_insert(0) += 1;
        Ok(())
    }
}
