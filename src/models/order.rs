//! Orders and the historical cost computation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use validator::Validate;

use crate::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i32,
    pub final_cost: Option<Decimal>,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Orders are created empty; both fields are optional so `{}` is a valid
/// creation body.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub final_cost: Option<Decimal>,
    pub is_paid: Option<bool>,
}

/// One priced line of a cost breakdown: the product's historically-correct
/// base price paired with the ordered amount.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostLine {
    pub name: String,
    pub base_price: Decimal,
    pub unit_type: Option<String>,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostSummary {
    pub products: Vec<CostLine>,
    pub final_cost: Decimal,
}

/// `amount × price` with the amount lifted into decimal arithmetic.
pub fn weighted(price: Decimal, amount: f64) -> Result<Decimal, ApiError> {
    let qty = Decimal::try_from(amount)
        .map_err(|_| ApiError::Validation(format!("Invalid amount: {amount}")))?;
    Ok(price * qty)
}

/// The exact weighted sum over a cost breakdown.
pub fn final_cost(lines: &[CostLine]) -> Result<Decimal, ApiError> {
    let mut total = Decimal::ZERO;
    for line in lines {
        total += weighted(line.base_price, line.amount)?;
    }
    Ok(total)
}

impl Order {
    pub async fn find(pool: &PgPool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Inserts a batch of orders, all or none.
    pub async fn create_all(pool: &PgPool, new: &[NewOrder]) -> Result<Vec<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut created = Vec::with_capacity(new.len());
        for order in new {
            let row = sqlx::query_as::<_, Self>(
                "INSERT INTO orders (final_cost, is_paid) \
                 VALUES ($1, COALESCE($2, FALSE)) RETURNING *",
            )
            .bind(order.final_cost)
            .bind(order.is_paid)
            .fetch_one(&mut *tx)
            .await?;
            created.push(row);
        }
        tx.commit().await?;
        Ok(created)
    }

    /// The one-way Unpaid → Paid transition.
    pub async fn mark_paid(pool: &PgPool, id: i32) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "UPDATE orders SET is_paid = TRUE, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }

    /// Paid orders whose `updated_at` falls inside the (inclusive) window.
    pub async fn paid_between(
        pool: &PgPool,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM orders WHERE is_paid \
             AND ($1::timestamptz IS NULL OR updated_at >= $1) \
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
    fn test_final_cost_weighted_sum() {
        // 2 x 12.52 + 3 x 3.12 = 34.40
        let lines = vec![
            CostLine {
                name: "Gardening Kit".to_string(),
                base_price: Decimal::new(1252, 2),
                unit_type: Some("unit".to_string()),
                amount: 2.0,
            },
            CostLine {
                name: "Microwave Gyozas".to_string(),
                base_price: Decimal::new(312, 2),
                unit_type: Some("pack".to_string()),
                amount: 3.0,
            },
        ];
        assert_eq!(final_cost(&lines).unwrap(), Decimal::new(3440, 2));
    }

    #[test]
    fn test_fractional_amounts() {
        // Weight-based units allow fractional amounts: 0.5 kilo at 0.10.
        let lines = vec![CostLine {
            name: "white rice".to_string(),
            base_price: Decimal::new(10, 2),
            unit_type: Some("kilo".to_string()),
            amount: 0.5,
        }];
        assert_eq!(final_cost(&lines).unwrap(), Decimal::new(5, 2));
    }

    #[test]
    fn test_empty_breakdown_is_zero() {
        assert_eq!(final_cost(&[]).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_non_finite_amount_rejected() {
        let lines = vec![CostLine {
            name: "broken".to_string(),
            base_price: Decimal::ONE,
            unit_type: None,
            amount: f64::NAN,
        }];
        assert!(final_cost(&lines).is_err());
    }
}
