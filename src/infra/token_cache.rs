use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};

use super::InfraError;
use crate::{
    app_error::{PortError, PortResult},
    use_cases::token_validator::CacheStore,
};

impl From<redis::RedisError> for PortError {
    fn from(err: redis::RedisError) -> Self {
        PortError::Cache(err.to_string())
    }
}

/// Redis-backed [`CacheStore`] for cached login grants.
#[derive(Clone)]
pub struct RedisCacheStore {
    manager: ConnectionManager,
}

impl RedisCacheStore {
    pub async fn connect(redis_url: &str) -> Result<Self, InfraError> {
        let client = redis::Client::open(redis_url).map_err(InfraError::RedisConnection)?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(InfraError::RedisConnection)?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn exists(&self, key: &str) -> PortResult<bool> {
        let mut conn = self.manager.clone();
        let present: bool = conn.exists(key).await?;
        Ok(present)
    }

    async fn get(&self, key: &str) -> PortResult<Option<Vec<u8>>> {
        let mut conn = self.manager.clone();
        let raw: Option<Vec<u8>> = conn.get(key).await?;
        Ok(raw)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> PortResult<()> {
        let mut conn = self.manager.clone();
        let ttl_secs = ttl.as_secs().max(1);
        let _: () = conn.set_ex(key, value, ttl_secs).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> PortResult<()> {
        let mut conn = self.manager.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }
}
