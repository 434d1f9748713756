use async_trait::async_trait;
use redis::{AsyncCommands, Script, aio::ConnectionManager};

use crate::{error::AppResult, queue::DelayQueue};

// Read and remove in one server-side step so concurrent pops never share a
// member and nothing due is left behind.
const POP_DUE_SCRIPT: &str = r#"
local due = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', ARGV[1])
if #due > 0 then
    redis.call('ZREMRANGEBYSCORE', KEYS[1], '-inf', ARGV[1])
end
return due
"#;

/// Delay queue on a Redis sorted set.
#[derive(Clone)]
pub struct RedisDelayQueue {
    conn: ConnectionManager,
    key: String,
    pop_script: Script,
}

impl RedisDelayQueue {
    pub fn new(conn: ConnectionManager, key: impl Into<String>) -> Self {
        Self {
            conn,
            key: key.into(),
            pop_script: Script::new(POP_DUE_SCRIPT),
        }
    }

    pub async fn connect(redis_url: &str, key: impl Into<String>) -> AppResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::new(conn, key))
    }
}

#[async_trait]
impl DelayQueue for RedisDelayQueue {
    async fn schedule(&self, payload: Vec<u8>, due_at: i64) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.zadd(&self.key, payload, due_at).await?;
        Ok(())
    }

    async fn pop_due(&self, now: i64) -> AppResult<Vec<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let payloads: Vec<Vec<u8>> = self
            .pop_script
            .key(&self.key)
            .arg(now)
            .invoke_async(&mut conn)
            .await?;
        Ok(payloads)
    }

    async fn len(&self) -> AppResult<u64> {
        let mut conn = self.conn.clone();
        let count: u64 = conn.zcard(&self.key).await?;
        Ok(count)
    }
}
