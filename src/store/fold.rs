use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::{Cart, CartLine};

/// One row of the `carts JOIN cart_lines` read.
#[derive(Debug, Clone, FromRow)]
pub struct CartLineRow {
    pub user_id: Uuid,
    pub cart_created_at: DateTime<Utc>,
    pub cart_updated_at: DateTime<Utc>,
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Folds join rows into carts keyed by user id.
///
/// Carts come out in the order their key was first seen, and each cart keeps
/// the attributes of the first row that introduced it.
#[derive(Debug, Default)]
pub struct CartAssembler {
    carts: Vec<Cart>,
}

impl CartAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: CartLineRow) {
        let line = CartLine {
            user_id: row.user_id,
            product_id: row.product_id,
            name: row.name,
            quantity: row.quantity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        };

        // A handful of carts per read at most, so a linear scan is fine.
        match self.carts.iter_mut().find(|c| c.user_id == row.user_id) {
            Some(cart) => cart.lines.push(line),
            None => self.carts.push(Cart {
                user_id: row.user_id,
                created_at: row.cart_created_at,
                updated_at: row.cart_updated_at,
                lines: vec![line],
            }),
        }
    }

    pub fn finish(self) -> Vec<Cart> {
        self.carts
    }
}

pub fn fold_rows(rows: impl IntoIterator<Item = CartLineRow>) -> Vec<Cart> {
    let mut assembler = CartAssembler::new();
    for row in rows {
        assembler.push(row);
    }
    assembler.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn row(user_id: Uuid, product_id: Uuid, quantity: i32, at: DateTime<Utc>) -> CartLineRow {
        CartLineRow {
            user_id,
            cart_created_at: at,
            cart_updated_at: at,
            product_id,
            name: format!("product-{quantity}"),
            quantity,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn folds_lines_of_one_cart_into_one_aggregate() {
        let user = Uuid::new_v4();
        let now = Utc::now();
        let rows: Vec<_> = (1..=3)
            .map(|q| row(user, Uuid::new_v4(), q, now))
            .collect();

        let carts = fold_rows(rows.clone());
        assert_eq!(carts.len(), 1);
        assert_eq!(carts[0].user_id, user);
        assert_eq!(carts[0].lines.len(), 3);
        for (line, source) in carts[0].lines.iter().zip(&rows) {
            assert_eq!(line.product_id, source.product_id);
            assert_eq!(line.quantity, source.quantity);
            assert_eq!(line.name, source.name);
        }
    }

    #[test]
    fn row_order_does_not_change_the_line_set() {
        let user = Uuid::new_v4();
        let now = Utc::now();
        let mut rows: Vec<_> = (1..=4)
            .map(|q| row(user, Uuid::new_v4(), q, now))
            .collect();

        let mut forward: Vec<_> = fold_rows(rows.clone())[0]
            .lines
            .iter()
            .map(|l| (l.product_id, l.quantity))
            .collect();
        rows.reverse();
        let mut backward: Vec<_> = fold_rows(rows)[0]
            .lines
            .iter()
            .map(|l| (l.product_id, l.quantity))
            .collect();

        forward.sort();
        backward.sort();
        assert_eq!(forward, backward);
    }

    #[test]
    fn first_seen_cart_attributes_win() {
        let user = Uuid::new_v4();
        let first = Utc::now();
        let later = first + Duration::seconds(10);

        let mut second = row(user, Uuid::new_v4(), 2, later);
        second.cart_created_at = later;
        let carts = fold_rows(vec![row(user, Uuid::new_v4(), 1, first), second]);

        assert_eq!(carts.len(), 1);
        assert_eq!(carts[0].created_at, first);
        assert_eq!(carts[0].updated_at, first);
    }

    #[test]
    fn interleaved_users_stay_separate() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let now = Utc::now();
        let carts = fold_rows(vec![
            row(a, Uuid::new_v4(), 1, now),
            row(b, Uuid::new_v4(), 2, now),
            row(a, Uuid::new_v4(), 3, now),
        ]);

        assert_eq!(carts.len(), 2);
        assert_eq!(carts[0].user_id, a);
        assert_eq!(carts[0].lines.len(), 2);
        assert_eq!(carts[1].user_id, b);
        assert_eq!(carts[1].lines.len(), 1);
    }

    #[test]
    fn no_rows_no_carts() {
        assert!(fold_rows(Vec::new()).is_empty());
    }
}
