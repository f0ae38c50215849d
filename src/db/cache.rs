// db/cache.rs
use std::sync::Arc;

use redis::{aio::ConnectionManager, AsyncCommands};
use serde::{de::DeserializeOwned, Serialize};

/// Reference data changes only through seeding, so it can live long.
pub const CATALOG_CACHE_TTL: usize = 3600;

pub const CATEGORIES_KEY: &str = "catalog:categories";
pub const LOCATIONS_KEY: &str = "catalog:locations";

pub struct CacheHelper;

impl CacheHelper {
    pub async fn get<T: DeserializeOwned>(
        redis: &Arc<ConnectionManager>,
        key: &str,
    ) -> Option<T> {
        let mut conn = ConnectionManager::clone(redis);
        let cached: Result<Option<String>, redis::RedisError> = conn.get(key).await;

        match cached {
            Ok(Some(data)) => match serde_json::from_str::<T>(&data) {
                Ok(value) => {
                    tracing::debug!("Cache HIT: {}", key);
                    Some(value)
                }
                Err(_) => {
                    tracing::warn!("Cache deserialization failed for: {}", key);
                    None
                }
            },
            Ok(None) => {
                tracing::debug!("Cache MISS: {}", key);
                None
            }
            Err(e) => {
                tracing::warn!("Cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    /// Best-effort write; failures are logged, never surfaced.
    pub async fn set<T: Serialize>(
        redis: &Arc<ConnectionManager>,
        key: &str,
        value: &T,
        ttl_seconds: usize,
    ) {
        let Ok(json) = serde_json::to_string(value) else {
            return;
        };
        let mut conn = ConnectionManager::clone(redis);
        let result: Result<(), redis::RedisError> = conn.set_ex(key, json, ttl_seconds).await;
        match result {
            Ok(()) => tracing::debug!("Cache SET: {} (TTL: {}s)", key, ttl_seconds),
            Err(e) => tracing::warn!("Cache write failed for {}: {}", key, e),
        }
    }
}
