use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub const MIN_LINE_QUANTITY: i32 = 1;
pub const MAX_LINE_QUANTITY: i32 = 99;

/// Quantities a cart line may hold.
pub const LINE_QUANTITY_RANGE: RangeInclusive<i32> = MIN_LINE_QUANTITY..=MAX_LINE_QUANTITY;

/// `BadRequest` unless `quantity` lies in [`LINE_QUANTITY_RANGE`].
pub fn check_quantity(quantity: i32) -> AppResult<()> {
    if !LINE_QUANTITY_RANGE.contains(&quantity) {
        return Err(AppError::BadRequest(format!(
            "quantity must be between {MIN_LINE_QUANTITY} and {MAX_LINE_QUANTITY}"
        )));
    }
    Ok(())
}

/// A cart together with all of its lines. One cart per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Cart {
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub lines: Vec<CartLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartLine {
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of clearing a cart's lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct ClearedLines {
    pub removed: u64,
    /// `false` when no cart row existed; clearing is then a no-op.
    pub cart_present: bool,
}

/// Insert-or-replace payload for a single line.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LineInput {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i32,
}
