use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Cart, CartLine, ClearedLines, LineInput, check_quantity},
    store::CartStore,
};

/// Process-local aggregate store for tests and local runs.
///
/// A single lock covers every cart, so each operation is trivially atomic.
#[derive(Default)]
pub struct InMemoryCartStore {
    carts: Mutex<HashMap<Uuid, Cart>>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn touch(cart: &mut Cart) -> DateTime<Utc> {
    let now = Utc::now().max(cart.updated_at + Duration::microseconds(1));
    cart.updated_at = now;
    now
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn get_aggregate(&self, user_id: Uuid) -> AppResult<Cart> {
        let carts = self.carts.lock().await;
        carts.get(&user_id).cloned().ok_or(AppError::NotFound)
    }

    async fn create_cart(&self, user_id: Uuid) -> AppResult<Cart> {
        let mut carts = self.carts.lock().await;
        if carts.contains_key(&user_id) {
            return Err(AppError::Conflict(format!("cart for user {user_id} exists")));
        }
        let now = Utc::now();
        let cart = Cart {
            user_id,
            created_at: now,
            updated_at: now,
            lines: Vec::new(),
        };
        carts.insert(user_id, cart.clone());
        Ok(cart)
    }

    async fn upsert_line(&self, user_id: Uuid, line: LineInput) -> AppResult<CartLine> {
        check_quantity(line.quantity)?;
        let mut carts = self.carts.lock().await;
        let cart = carts.get_mut(&user_id).ok_or(AppError::NotFound)?;
        let now = touch(cart);

        if let Some(existing) = cart
            .lines
            .iter_mut()
            .find(|l| l.product_id == line.product_id)
        {
            existing.name = line.name;
            existing.quantity = line.quantity;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let created = CartLine {
            user_id,
            product_id: line.product_id,
            name: line.name,
            quantity: line.quantity,
            created_at: now,
            updated_at: now,
        };
        cart.lines.push(created.clone());
        Ok(created)
    }

    async fn update_line_quantity(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> AppResult<CartLine> {
        check_quantity(quantity)?;
        let mut carts = self.carts.lock().await;
        let cart = carts.get_mut(&user_id).ok_or(AppError::NotFound)?;
        let Some(index) = cart.lines.iter().position(|l| l.product_id == product_id) else {
            return Err(AppError::NotFound);
        };

        let now = touch(cart);
        let line = &mut cart.lines[index];
        line.quantity = quantity;
        line.updated_at = now;
        Ok(line.clone())
    }

    async fn delete_line(&self, user_id: Uuid, product_id: Uuid) -> AppResult<()> {
        let mut carts = self.carts.lock().await;
        let cart = carts.get_mut(&user_id).ok_or(AppError::NotFound)?;
        let Some(index) = cart.lines.iter().position(|l| l.product_id == product_id) else {
            return Err(AppError::NotFound);
        };

        cart.lines.remove(index);
        touch(cart);
        Ok(())
    }

    async fn clear_lines(&self, user_id: Uuid) -> AppResult<ClearedLines> {
        let mut carts = self.carts.lock().await;
        let Some(cart) = carts.get_mut(&user_id) else {
            return Ok(ClearedLines {
                removed: 0,
                cart_present: false,
            });
        };

        let removed = cart.lines.len() as u64;
        cart.lines.clear();
        touch(cart);
        Ok(ClearedLines {
            removed,
            cart_present: true,
        })
    }

    async fn delete_cart(&self, user_id: Uuid) -> AppResult<()> {
        let mut carts = self.carts.lock().await;
        carts.remove(&user_id).map(|_| ()).ok_or(AppError::NotFound)
    }
}
