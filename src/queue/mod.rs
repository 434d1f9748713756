//! Delay queue: opaque payloads scored by their due time in Unix seconds.

use async_trait::async_trait;

use crate::error::AppResult;

pub mod memory;
pub mod sorted_set;
pub mod task;

pub use memory::InMemoryDelayQueue;
pub use sorted_set::RedisDelayQueue;
pub use task::EvictionTask;

#[async_trait]
pub trait DelayQueue: Send + Sync {
    /// Store `payload` with score `due_at`. Payloads are never deduplicated
    /// by content shape; the caller keeps them distinct.
    async fn schedule(&self, payload: Vec<u8>, due_at: i64) -> AppResult<()>;

    /// Atomically remove and return every payload with score `<= now`.
    /// Order among the returned payloads is unspecified.
    async fn pop_due(&self, now: i64) -> AppResult<Vec<Vec<u8>>>;

    /// Number of pending payloads.
    async fn len(&self) -> AppResult<u64>;

    async fn is_empty(&self) -> AppResult<bool> {
        Ok(self.len().await? == 0)
    }
}
