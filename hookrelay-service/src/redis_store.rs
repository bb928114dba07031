use anyhow::{anyhow, Context as _};
use hookrelay_core::{Error, Result, RetryStore};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::config::RedisConfig;

/// [`RetryStore`] over a shared redis connection.
///
/// The connection manager multiplexes a single connection and reconnects
/// after failures; clones share it, so one store value can be handed to
/// every delivery task.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    /// Connect using the `redis` section of the config file.
    pub async fn connect(config: &RedisConfig) -> anyhow::Result<Self> {
        let client = redis::Client::open(config.url().as_str())
            .with_context(|| format!("invalid redis address {}", config.server))?;
        let connection = ConnectionManager::new(client)
            .await
            .with_context(|| format!("connect to redis at {} failed", config.server))?;
        Ok(Self { connection })
    }
}

#[async_trait::async_trait]
impl RetryStore for RedisStore {
    async fn rpush(&self, key: &str, value: &str) -> Result<()> {
        let mut connection = self.connection.clone();
        connection
            .rpush::<_, _, ()>(key, value)
            .await
            .map_err(Error::store)
    }

    async fn lrange_head(&self, key: &str) -> Result<Option<String>> {
        let mut connection = self.connection.clone();
        let head: Vec<String> = connection.lrange(key, 0, 0).await.map_err(Error::store)?;
        Ok(head.into_iter().next())
    }

    async fn lpop(&self, key: &str) -> Result<Option<String>> {
        let mut connection = self.connection.clone();
        connection.lpop(key, None).await.map_err(Error::store)
    }

    async fn hset(&self, key: &str, fields: &[(&str, String)]) -> Result<()> {
        let mut connection = self.connection.clone();
        connection
            .hset_multiple::<_, _, _, ()>(key, fields)
            .await
            .map_err(Error::store)
    }

    async fn hget(&self, key: &str, field: &str) -> Result<String> {
        let mut connection = self.connection.clone();
        let value: Option<String> = connection.hget(key, field).await.map_err(Error::store)?;
        value.ok_or_else(|| Error::store(anyhow!("hash {key} has no field {field}")))
    }

    async fn expire_at(&self, key: &str, deadline: i64) -> Result<()> {
        let mut connection = self.connection.clone();
        connection
            .expire_at::<_, ()>(key, deadline as usize)
            .await
            .map_err(Error::store)
    }

    async fn ping(&self) -> Result<String> {
        let mut connection = self.connection.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut connection)
            .await
            .map_err(Error::store)
    }
}
