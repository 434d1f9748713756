use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{error::AppResult, queue::DelayQueue};

#[derive(Default)]
struct Inner {
    // (due_at, insertion sequence) keeps equal scores apart.
    items: BTreeMap<(i64, u64), Vec<u8>>,
    next_seq: u64,
}

/// Process-local delay queue. The pop runs under one lock, which gives the
/// same all-or-nothing hand-off as the Redis script.
#[derive(Default)]
pub struct InMemoryDelayQueue {
    inner: Mutex<Inner>,
}

impl InMemoryDelayQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pending `(due_at, payload)` pairs in score order.
    pub async fn snapshot(&self) -> Vec<(i64, Vec<u8>)> {
        let inner = self.inner.lock().await;
        inner
            .items
            .iter()
            .map(|((due_at, _), payload)| (*due_at, payload.clone()))
            .collect()
    }
}

#[async_trait]
impl DelayQueue for InMemoryDelayQueue {
    async fn schedule(&self, payload: Vec<u8>, due_at: i64) -> AppResult<()> {
        let mut inner = self.inner.lock().await;
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.items.insert((due_at, seq), payload);
        Ok(())
    }

    async fn pop_due(&self, now: i64) -> AppResult<Vec<Vec<u8>>> {
        let mut inner = self.inner.lock().await;
        let Some(bound) = now.checked_add(1) else {
            return Ok(std::mem::take(&mut inner.items).into_values().collect());
        };
        let pending = inner.items.split_off(&(bound, 0));
        let due = std::mem::replace(&mut inner.items, pending);
        Ok(due.into_values().collect())
    }

    async fn len(&self) -> AppResult<u64> {
        Ok(self.inner.lock().await.items.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pops_only_due_items() -> AppResult<()> {
        let queue = InMemoryDelayQueue::new();
        queue.schedule(b"early".to_vec(), 10).await?;
        queue.schedule(b"exact".to_vec(), 20).await?;
        queue.schedule(b"late".to_vec(), 21).await?;

        let mut popped = queue.pop_due(20).await?;
        popped.sort();
        assert_eq!(popped, vec![b"early".to_vec(), b"exact".to_vec()]);
        assert_eq!(queue.len().await?, 1);
        assert!(queue.pop_due(20).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn identical_payloads_coexist() -> AppResult<()> {
        let queue = InMemoryDelayQueue::new();
        queue.schedule(b"same".to_vec(), 5).await?;
        queue.schedule(b"same".to_vec(), 5).await?;
        assert_eq!(queue.pop_due(5).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn max_score_drains_everything() -> AppResult<()> {
        let queue = InMemoryDelayQueue::new();
        queue.schedule(b"far".to_vec(), i64::MAX).await?;
        assert_eq!(queue.pop_due(i64::MAX).await?.len(), 1);
        Ok(())
    }
}
