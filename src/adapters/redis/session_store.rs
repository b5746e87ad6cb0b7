use crate::adapters::redis::RedisClient;
use crate::adapters::session::SessionStore;
use crate::domain::session::{Session, SessionId};
use async_trait::async_trait;
use redis::AsyncCommands;

/// Sessions as JSON strings under `<prefix><id>`, expiring after the configured TTL.
#[derive(Debug, Clone)]
pub struct RedisSessionStore {
    redis: RedisClient,
    prefix: String,
    ttl_secs: u64,
}

impl RedisSessionStore {
    #[must_use]
    pub const fn new(redis: RedisClient, prefix: String, ttl_secs: u64) -> Self {
        Self { redis, prefix, ttl_secs }
    }

    /// Redis key holding the record for `id`.
    #[must_use]
    pub fn key(&self, id: SessionId) -> String {
        session_key(&self.prefix, id)
    }
}

fn session_key(prefix: &str, id: SessionId) -> String {
    format!("{prefix}{id}")
}

fn encode(session: &Session) -> serde_json::Result<String> {
    serde_json::to_string(session)
}

fn decode(raw: Option<String>) -> serde_json::Result<Option<Session>> {
    raw.map(|json| serde_json::from_str(&json)).transpose()
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, id: SessionId) -> anyhow::Result<Option<Session>> {
        let mut conn = self.redis.connection();
        let raw: Option<String> = conn.get(self.key(id)).await?;
        Ok(decode(raw)?)
    }

    async fn save(&self, id: SessionId, session: &Session) -> anyhow::Result<()> {
        let mut conn = self.redis.connection();
        let json = encode(session)?;
        let _: () = conn.set_ex(self.key(id), json, self.ttl_secs).await?;
        Ok(())
    }

    async fn delete(&self, id: SessionId) -> anyhow::Result<()> {
        let mut conn = self.redis.connection();
        let _: () = conn.del(self.key(id)).await?;
        Ok(())
    }

    async fn ping(&self) -> anyhow::Result<()> {
        self.redis.ping().await
    }
}
