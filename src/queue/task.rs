use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppResult;

/// Request to clear a user's cart lines once `due_at` has passed.
///
/// `id` makes every scheduled task a distinct sorted-set member, so two tasks
/// for the same user and second never collapse into one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvictionTask {
    pub id: Uuid,
    pub user_id: Uuid,
    pub due_at: i64,
}

impl EvictionTask {
    pub fn new(user_id: Uuid, due_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            due_at: due_at.timestamp(),
        }
    }

    pub fn encode(&self) -> AppResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(payload: &[u8]) -> AppResult<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}
