use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Cart, CartLine, ClearedLines, LineInput, check_quantity},
    queue::{DelayQueue, EvictionTask},
    store::CartStore,
    worker::EvictionSettings,
};

/// Entry point for request handlers.
///
/// Only cart creation touches the delay queue; line mutations go straight to
/// the store.
#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn CartStore>,
    queue: Arc<dyn DelayQueue>,
    settings: EvictionSettings,
}

impl CartService {
    pub fn new(
        store: Arc<dyn CartStore>,
        queue: Arc<dyn DelayQueue>,
        settings: EvictionSettings,
    ) -> Self {
        Self {
            store,
            queue,
            settings,
        }
    }

    /// Create the cart and schedule its first eviction.
    ///
    /// A scheduling failure is returned but the cart row stays; that cart is
    /// then never evicted automatically.
    pub async fn create_cart(&self, user_id: Uuid) -> AppResult<Cart> {
        let cart = self.store.create_cart(user_id).await?;

        let task = EvictionTask::new(user_id, self.settings.due_after(Utc::now()));
        if let Err(err) = self.queue.schedule(task.encode()?, task.due_at).await {
            tracing::error!(
                %user_id,
                error = %err,
                "cart created but eviction could not be scheduled"
            );
            return Err(err);
        }

        tracing::info!(%user_id, due_at = task.due_at, "cart created");
        Ok(cart)
    }

    pub async fn get_cart(&self, user_id: Uuid) -> AppResult<Cart> {
        self.store.get_aggregate(user_id).await
    }

    pub async fn upsert_line(&self, user_id: Uuid, line: LineInput) -> AppResult<CartLine> {
        check_quantity(line.quantity)?;
        let name = line.name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("name must not be empty".to_string()));
        }
        let line = LineInput {
            name: name.to_string(),
            ..line
        };
        self.store.upsert_line(user_id, line).await
    }

    pub async fn update_line_quantity(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> AppResult<CartLine> {
        check_quantity(quantity)?;
        self.store
            .update_line_quantity(user_id, product_id, quantity)
            .await
    }

    pub async fn delete_line(&self, user_id: Uuid, product_id: Uuid) -> AppResult<()> {
        self.store.delete_line(user_id, product_id).await
    }

    pub async fn clear_lines(&self, user_id: Uuid) -> AppResult<ClearedLines> {
        self.store.clear_lines(user_id).await
    }

    /// Pending eviction tasks stay queued and fire as no-ops.
    pub async fn delete_cart(&self, user_id: Uuid) -> AppResult<()> {
        self.store.delete_cart(user_id).await?;
        tracing::info!(%user_id, "cart deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{queue::InMemoryDelayQueue, store::InMemoryCartStore};

    fn service() -> (CartService, Arc<InMemoryDelayQueue>) {
        let queue = Arc::new(InMemoryDelayQueue::new());
        let service = CartService::new(
            Arc::new(InMemoryCartStore::new()),
            queue.clone(),
            EvictionSettings::default(),
        );
        (service, queue)
    }

    #[tokio::test]
    async fn only_creation_schedules_eviction() -> AppResult<()> {
        let (service, queue) = service();
        let user = Uuid::new_v4();
        let product = Uuid::new_v4();

        service.create_cart(user).await?;
        assert_eq!(queue.len().await?, 1);

        service
            .upsert_line(
                user,
                LineInput {
                    product_id: product,
                    name: "Mug".into(),
                    quantity: 2,
                },
            )
            .await?;
        service.update_line_quantity(user, product, 3).await?;
        service.delete_line(user, product).await?;
        service.clear_lines(user).await?;

        assert_eq!(queue.len().await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn rejects_out_of_range_quantity() -> AppResult<()> {
        let (service, _) = service();
        let user = Uuid::new_v4();
        service.create_cart(user).await?;

        for quantity in [0, -1, 100] {
            let result = service
                .upsert_line(
                    user,
                    LineInput {
                        product_id: Uuid::new_v4(),
                        name: "Mug".into(),
                        quantity,
                    },
                )
                .await;
            assert!(matches!(result, Err(AppError::BadRequest(_))));
        }
        assert!(service.get_cart(user).await?.lines.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_create_does_not_schedule_again() -> AppResult<()> {
        let (service, queue) = service();
        let user = Uuid::new_v4();
        service.create_cart(user).await?;
        assert!(matches!(
            service.create_cart(user).await,
            Err(AppError::Conflict(_))
        ));
        assert_eq!(queue.len().await?, 1);
        Ok(())
    }
}
