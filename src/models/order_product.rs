//! Order line items and their upsert rule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use validator::Validate;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderProduct {
    pub id: i32,
    pub order_id: i32,
    pub product_id: i32,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A requested change to one (order, product) pair. A missing amount counts
/// as zero and leaves the line item untouched.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LineItemChange {
    #[serde(alias = "ProductId")]
    pub product_id: i32,
    #[serde(default)]
    pub amount: f64,
}

/// What applying a delta to a line item resolves to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum AmountChange {
    Insert(f64),
    Set(f64),
    Delete,
    Noop,
}

/// The upsert rule: adding to a missing pair creates it, adding to an
/// existing pair accumulates, and an accumulated amount of zero or less
/// deletes the row. Removing from a missing pair does nothing.
pub(crate) fn resolve_amount(existing: Option<f64>, delta: f64) -> AmountChange {
    match existing {
        _ if delta == 0.0 => AmountChange::Noop,
        None if delta > 0.0 => AmountChange::Insert(delta),
        None => AmountChange::Noop,
        Some(current) => {
            let next = current + delta;
            if next <= 0.0 {
                AmountChange::Delete
            } else {
                AmountChange::Set(next)
            }
        }
    }
}

impl OrderProduct {
    /// Applies a signed amount delta to the (order, product) pair and
    /// returns the surviving row, if any.
    pub async fn apply(
        conn: &mut PgConnection,
        order_id: i32,
        product_id: i32,
        delta: f64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let existing = sqlx::query_as::<_, Self>(
            "SELECT * FROM order_products WHERE order_id = $1 AND product_id = $2",
        )
        .bind(order_id)
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;

        match resolve_amount(existing.as_ref().map(|row| row.amount), delta) {
            AmountChange::Insert(amount) => {
                let row = sqlx::query_as::<_, Self>(
                    "INSERT INTO order_products (order_id, product_id, amount) \
                     VALUES ($1, $2, $3) RETURNING *",
                )
                .bind(order_id)
                .bind(product_id)
                .bind(amount)
                .fetch_one(conn)
                .await?;
                Ok(Some(row))
            }
            AmountChange::Set(amount) => {
                let row = sqlx::query_as::<_, Self>(
                    "UPDATE order_products SET amount = $3, updated_at = NOW() \
                     WHERE order_id = $1 AND product_id = $2 RETURNING *",
                )
                .bind(order_id)
                .bind(product_id)
                .bind(amount)
                .fetch_one(conn)
                .await?;
                Ok(Some(row))
            }
            AmountChange::Delete => {
                sqlx::query("DELETE FROM order_products WHERE order_id = $1 AND product_id = $2")
                    .bind(order_id)
                    .bind(product_id)
                    .execute(conn)
                    .await?;
                Ok(None)
            }
            AmountChange::Noop => Ok(existing),
        }
    }

    /// Line items of an order, optionally narrowed to one product.
    pub async fn for_order(
        pool: &PgPool,
        order_id: i32,
        product_id: Option<i32>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM order_products WHERE order_id = $1 \
             AND ($2::int4 IS NULL OR product_id = $2) \
             ORDER BY product_id",
        )
        .bind(order_id)
        .bind(product_id)
        .fetch_all(pool)
        .await
    }

    /// Line items whose `updated_at` falls inside the (inclusive) window.
    pub async fn in_window(
        pool: &PgPool,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM order_products \
             WHERE ($1::timestamptz IS NULL OR updated_at >= $1) \
             AND ($2::timestamptz IS NULL OR updated_at <= $2) \
             ORDER BY id",
        )
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_to_missing_pair_inserts() {
        assert_eq!(resolve_amount(None, 3.0), AmountChange::Insert(3.0));
    }

    #[test]
    fn test_add_to_existing_pair_accumulates() {
        assert_eq!(resolve_amount(Some(2.0), 3.0), AmountChange::Set(5.0));
    }

    #[test]
    fn test_decrement_keeps_positive_remainder() {
        assert_eq!(resolve_amount(Some(5.0), -3.0), AmountChange::Set(2.0));
    }

    #[test]
    fn test_decrement_to_zero_deletes() {
        assert_eq!(resolve_amount(Some(3.0), -3.0), AmountChange::Delete);
    }

    #[test]
    fn test_decrement_below_zero_deletes() {
        assert_eq!(resolve_amount(Some(1.0), -4.0), AmountChange::Delete);
    }

    #[test]
    fn test_remove_from_missing_pair_is_noop() {
        assert_eq!(resolve_amount(None, -2.0), AmountChange::Noop);
    }

    #[test]
    fn test_zero_delta_is_noop() {
        assert_eq!(resolve_amount(Some(4.0), 0.0), AmountChange::Noop);
        assert_eq!(resolve_amount(None, 0.0), AmountChange::Noop);
    }
}
