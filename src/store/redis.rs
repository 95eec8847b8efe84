use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;

use super::{Pipeline, StateStore, StoreError, StoreOp};

/// Redis-backed [`StateStore`], pooled via `deadpool-redis` so that many
/// concurrent upload handlers share a small number of real connections
/// instead of serializing on a single client.
#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    pub fn connect(server: &str) -> Result<Self, StoreError> {
        let cfg = Config::from_url(format!("redis://{server}"));
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(Self { pool })
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection, StoreError> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl StateStore for RedisStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.conn().await?;
        conn.get(key)
            .await
            .map_err(|e| StoreError::Protocol(e.to_string()))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(|e| StoreError::Protocol(e.to_string()))
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await
            .map_err(|e| StoreError::Protocol(e.to_string()))
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, StoreError> {
        let mut conn = self.conn().await?;
        conn.incr(key, delta)
            .await
            .map_err(|e| StoreError::Protocol(e.to_string()))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        conn.expire::<_, ()>(key, ttl.as_secs().max(1) as i64)
            .await
            .map_err(|e| StoreError::Protocol(e.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| StoreError::Protocol(e.to_string()))
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn().await?;
        conn.exists(key)
            .await
            .map_err(|e| StoreError::Protocol(e.to_string()))
    }

    async fn set_add(&self, key: &str, member: Vec<u8>) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        conn.sadd::<_, _, ()>(key, member)
            .await
            .map_err(|e| StoreError::Protocol(e.to_string()))
    }

    async fn set_members(&self, key: &str) -> Result<Vec<Vec<u8>>, StoreError> {
        let mut conn = self.conn().await?;
        conn.smembers(key)
            .await
            .map_err(|e| StoreError::Protocol(e.to_string()))
    }

    async fn set_cardinality(&self, key: &str) -> Result<u64, StoreError> {
        let mut conn = self.conn().await?;
        conn.scard(key)
            .await
            .map_err(|e| StoreError::Protocol(e.to_string()))
    }

    async fn list_push_right(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        conn.rpush::<_, _, ()>(key, value)
            .await
            .map_err(|e| StoreError::Protocol(e.to_string()))
    }

    async fn list_range(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<Vec<u8>>, StoreError> {
        let mut conn = self.conn().await?;
        conn.lrange(key, start as isize, stop as isize)
            .await
            .map_err(|e| StoreError::Protocol(e.to_string()))
    }

    async fn commit(&self, pipeline: Pipeline) -> Result<(), StoreError> {
        if pipeline.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn().await?;
        let mut pipe = redis::pipe();
        pipe.atomic();

        for op in &pipeline.ops {
            match op {
                StoreOp::SetWithTtl { key, value, ttl } => {
                    pipe.set_ex(key, value.as_slice(), ttl.as_secs().max(1));
                }
                StoreOp::Delete { key } => {
                    pipe.del(key);
                }
                StoreOp::ListPushRight { key, value } => {
                    pipe.rpush(key, value.as_slice());
                }
            }
        }

        pipe.query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Protocol(e.to_string()))
    }
}
