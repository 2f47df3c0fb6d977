use redis::aio::ConnectionManager;
use redis::AsyncCommands;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
    conn: ConnectionManager,
}

impl RedisClient {
    pub async fn connect(url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        tracing::info!(url = %url, "connected to Redis");
        Ok(Self { client, conn })
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.get(key).await
    }

    pub async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.set_ex(key, value, ttl_secs).await
    }

    pub async fn del(&self, key: &str) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.del(key).await
    }

    /// Append a batch of values to the tail of a list in one round trip.
    pub async fn rpush(&self, key: &str, values: &[String]) -> Result<i64, redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.rpush(key, values).await
    }

    /// Blocking pop from the head of a list.
    ///
    /// Returns `None` when the timeout elapses with the list still empty,
    /// which is how consumer loops idle without spinning.
    pub async fn blpop(
        &self,
        key: &str,
        timeout_secs: f64,
    ) -> Result<Option<String>, redis::RedisError> {
        let mut conn = self.conn.clone();
        let popped: Option<(String, String)> = redis::cmd("BLPOP")
            .arg(key)
            .arg(timeout_secs)
            .query_async(&mut conn)
            .await?;
        Ok(popped.map(|(_, value)| value))
    }

    pub async fn llen(&self, key: &str) -> Result<i64, redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.llen(key).await
    }

    pub async fn incr(&self, key: &str) -> Result<i64, redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.incr(key, 1i64).await
    }

    pub async fn expire(&self, key: &str, ttl_secs: i64) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.expire(key, ttl_secs).await
    }

    pub async fn publish(&self, channel: &str, payload: &str) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.publish(channel, payload).await
    }

    /// Dedicated pub/sub connection; the multiplexed manager cannot carry
    /// subscriptions.
    pub async fn pubsub(&self) -> Result<redis::aio::PubSub, redis::RedisError> {
        let conn = self.client.get_async_connection().await?;
        Ok(conn.into_pubsub())
    }

    pub async fn ping(&self) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
