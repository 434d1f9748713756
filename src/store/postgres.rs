use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseTransaction, EntityTrait,
    QueryFilter, Set, TransactionTrait,
};
use sqlx::{FromRow, PgConnection, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    db::{DbPool, OrmConn},
    entity::{
        cart_lines::{Column as LineCol, Entity as CartLines},
        carts::{ActiveModel as CartActive, Entity as Carts, Model as CartModel},
    },
    error::{AppError, AppResult},
    models::{Cart, CartLine, ClearedLines, LineInput, check_quantity},
    store::{
        CartStore,
        fold::{CartLineRow, fold_rows},
    },
};

const SELECT_AGGREGATE: &str = r#"
    SELECT c.user_id,
           c.created_at AS cart_created_at,
           c.updated_at AS cart_updated_at,
           l.product_id, l.name, l.quantity, l.created_at, l.updated_at
    FROM carts c
    JOIN cart_lines l ON l.user_id = c.user_id
    WHERE c.user_id = $1
    ORDER BY l.created_at, l.product_id
"#;

// Strictly advances the timestamp even when two commits share a clock reading.
// Also takes the row lock that serializes writers of the same cart.
const TOUCH_CART: &str = r#"
    UPDATE carts
    SET updated_at = GREATEST(clock_timestamp(), updated_at + INTERVAL '1 microsecond')
    WHERE user_id = $1
"#;

#[derive(FromRow)]
struct CartRow {
    user_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct LineRow {
    user_id: Uuid,
    product_id: Uuid,
    name: String,
    quantity: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<LineRow> for CartLine {
    fn from(row: LineRow) -> Self {
        CartLine {
            user_id: row.user_id,
            product_id: row.product_id,
            name: row.name,
            quantity: row.quantity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct PgCartStore {
    pool: DbPool,
    orm: OrmConn,
}

impl PgCartStore {
    pub fn new(pool: DbPool, orm: OrmConn) -> Self {
        Self { pool, orm }
    }
}

#[async_trait]
impl CartStore for PgCartStore {
    async fn get_aggregate(&self, user_id: Uuid) -> AppResult<Cart> {
        let rows = sqlx::query_as::<_, CartLineRow>(SELECT_AGGREGATE)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        if let Some(cart) = fold_rows(rows).into_iter().next() {
            return Ok(cart);
        }

        // No joined rows: either an empty cart or no cart at all.
        let bare = sqlx::query_as::<_, CartRow>(
            "SELECT user_id, created_at, updated_at FROM carts WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match bare {
            Some(row) => Ok(Cart {
                user_id: row.user_id,
                created_at: row.created_at,
                updated_at: row.updated_at,
                lines: Vec::new(),
            }),
            None => Err(AppError::NotFound),
        }
    }

    async fn create_cart(&self, user_id: Uuid) -> AppResult<Cart> {
        let model = CartActive {
            user_id: Set(user_id),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(&self.orm)
        .await
        .map_err(AppError::from_cart_insert)?;

        Ok(cart_from_entity(model))
    }

    async fn upsert_line(&self, user_id: Uuid, line: LineInput) -> AppResult<CartLine> {
        check_quantity(line.quantity)?;
        let mut tx = self.pool.begin().await?;
        let result = upsert_line_tx(&mut tx, user_id, line).await;
        finish(tx, result).await
    }

    async fn update_line_quantity(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> AppResult<CartLine> {
        check_quantity(quantity)?;
        let mut tx = self.pool.begin().await?;
        let result = update_quantity_tx(&mut tx, user_id, product_id, quantity).await;
        finish(tx, result).await
    }

    async fn delete_line(&self, user_id: Uuid, product_id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        let result = delete_line_tx(&mut tx, user_id, product_id).await;
        finish(tx, result).await
    }

    async fn clear_lines(&self, user_id: Uuid) -> AppResult<ClearedLines> {
        let mut tx = self.pool.begin().await?;
        let result = clear_lines_tx(&mut tx, user_id).await;
        finish(tx, result).await
    }

    async fn delete_cart(&self, user_id: Uuid) -> AppResult<()> {
        let txn = self.orm.begin().await?;
        match delete_cart_txn(&txn, user_id).await {
            Ok(()) => {
                txn.commit().await?;
                Ok(())
            }
            Err(err) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!(
                        %user_id,
                        error = %rollback_err,
                        original = %err,
                        "cart delete rollback failed"
                    );
                }
                Err(err)
            }
        }
    }
}

/// Commit on success; on failure roll back and surface the original error.
async fn finish<T>(tx: Transaction<'static, Postgres>, result: AppResult<T>) -> AppResult<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!(
                    error = %rollback_err,
                    original = %err,
                    "cart transaction rollback failed"
                );
            }
            Err(err)
        }
    }
}

async fn touch_cart(conn: &mut PgConnection, user_id: Uuid) -> AppResult<bool> {
    let result = sqlx::query(TOUCH_CART)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

async fn upsert_line_tx(
    conn: &mut PgConnection,
    user_id: Uuid,
    line: LineInput,
) -> AppResult<CartLine> {
    if !touch_cart(conn, user_id).await? {
        return Err(AppError::NotFound);
    }

    let row = sqlx::query_as::<_, LineRow>(
        r#"
        INSERT INTO cart_lines (user_id, product_id, name, quantity)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, product_id) DO UPDATE
        SET name = EXCLUDED.name,
            quantity = EXCLUDED.quantity,
            updated_at = clock_timestamp()
        RETURNING user_id, product_id, name, quantity, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(line.product_id)
    .bind(&line.name)
    .bind(line.quantity)
    .fetch_one(&mut *conn)
    .await
    .map_err(AppError::from_line_write)?;

    Ok(row.into())
}

async fn update_quantity_tx(
    conn: &mut PgConnection,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<CartLine> {
    if !touch_cart(conn, user_id).await? {
        return Err(AppError::NotFound);
    }

    let row = sqlx::query_as::<_, LineRow>(
        r#"
        UPDATE cart_lines
        SET quantity = $3, updated_at = clock_timestamp()
        WHERE user_id = $1 AND product_id = $2
        RETURNING user_id, product_id, name, quantity, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(product_id)
    .bind(quantity)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(CartLine::from).ok_or(AppError::NotFound)
}

async fn delete_line_tx(conn: &mut PgConnection, user_id: Uuid, product_id: Uuid) -> AppResult<()> {
    if !touch_cart(conn, user_id).await? {
        return Err(AppError::NotFound);
    }

    let result = sqlx::query("DELETE FROM cart_lines WHERE user_id = $1 AND product_id = $2")
        .bind(user_id)
        .bind(product_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

async fn clear_lines_tx(conn: &mut PgConnection, user_id: Uuid) -> AppResult<ClearedLines> {
    if !touch_cart(conn, user_id).await? {
        return Ok(ClearedLines {
            removed: 0,
            cart_present: false,
        });
    }

    let result = sqlx::query("DELETE FROM cart_lines WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    Ok(ClearedLines {
        removed: result.rows_affected(),
        cart_present: true,
    })
}

async fn delete_cart_txn(txn: &DatabaseTransaction, user_id: Uuid) -> AppResult<()> {
    CartLines::delete_many()
        .filter(LineCol::UserId.eq(user_id))
        .exec(txn)
        .await?;

    let deleted = Carts::delete_by_id(user_id).exec(txn).await?;
    if deleted.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

fn cart_from_entity(model: CartModel) -> Cart {
    Cart {
        user_id: model.user_id,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
        lines: Vec::new(),
    }
}
