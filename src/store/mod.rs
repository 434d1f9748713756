//! Aggregate store: durable storage of carts and their lines.
//!
//! Every line mutation runs in one transaction that also advances the parent
//! cart's `updated_at`, so the cart timestamp always reflects the latest
//! committed line change.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Cart, CartLine, ClearedLines, LineInput},
};

pub mod fold;
pub mod memory;
pub mod postgres;

pub use memory::InMemoryCartStore;
pub use postgres::PgCartStore;

#[async_trait]
pub trait CartStore: Send + Sync {
    /// Full aggregate, or `NotFound` when no cart row exists.
    async fn get_aggregate(&self, user_id: Uuid) -> AppResult<Cart>;

    /// Insert an empty cart. `Conflict` if one already exists.
    async fn create_cart(&self, user_id: Uuid) -> AppResult<Cart>;

    /// Insert the line, or replace name and quantity of an existing one.
    /// `NotFound` when the cart does not exist, `BadRequest` when the
    /// quantity is outside [`LINE_QUANTITY_RANGE`](crate::models::LINE_QUANTITY_RANGE).
    async fn upsert_line(&self, user_id: Uuid, line: LineInput) -> AppResult<CartLine>;

    /// `NotFound` when the line does not exist, `BadRequest` on a bad quantity.
    async fn update_line_quantity(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> AppResult<CartLine>;

    /// `NotFound` when the line does not exist.
    async fn delete_line(&self, user_id: Uuid, product_id: Uuid) -> AppResult<()>;

    /// Remove every line. Succeeds with zero lines, and is a no-op when the
    /// cart itself is absent.
    async fn clear_lines(&self, user_id: Uuid) -> AppResult<ClearedLines>;

    /// Remove the cart and all of its lines. `NotFound` when absent.
    async fn delete_cart(&self, user_id: Uuid) -> AppResult<()>;
}
