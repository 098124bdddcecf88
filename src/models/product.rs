//! Versioned catalog products.
//!
//! A product is never updated in place. Changing its price or pulling it
//! from circulation retires the current row and inserts a replacement that
//! shares the same `product_id`, so the full price history stays queryable.
//! At most one row per `product_id` is in circulation at any time.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use validator::{Validate, ValidationError};

use crate::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Row primary key, unique per version.
    pub id: i32,
    /// Stable external identifier shared by all versions.
    pub product_id: i32,
    pub name: String,
    pub unit_type: Option<String>,
    pub base_price: Decimal,
    pub in_circulation: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub product_id: i32,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(max = 10))]
    pub unit_type: Option<String>,
    #[validate(custom = "positive_price")]
    pub base_price: Decimal,
}

/// The fields that differ between a retired version and its replacement.
#[derive(Debug, Clone, Copy)]
pub struct NextVersion {
    pub base_price: Decimal,
    pub in_circulation: bool,
}

fn positive_price(price: &Decimal) -> Result<(), ValidationError> {
    if *price > Decimal::ZERO {
        Ok(())
    } else {
        Err(ValidationError::new("base_price must be positive"))
    }
}

impl Product {
    /// The newest version row for a `product_id`, in circulation or not.
    pub async fn find_current(pool: &PgPool, product_id: i32) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM products WHERE product_id = $1 ORDER BY id DESC LIMIT 1",
        )
        .bind(product_id)
        .fetch_optional(pool)
        .await
    }

    /// In-circulation rows among the given `product_id`s, used for the
    /// duplicate check on catalog creation.
    pub async fn in_circulation_among(
        pool: &PgPool,
        product_ids: &[i32],
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM products WHERE product_id = ANY($1) AND in_circulation ORDER BY id",
        )
        .bind(product_ids)
        .fetch_all(pool)
        .await
    }

    pub async fn insert(conn: &mut PgConnection, new: &NewProduct) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO products (product_id, name, unit_type, base_price, in_circulation) \
             VALUES ($1, $2, $3, $4, TRUE) RETURNING *",
        )
        .bind(new.product_id)
        .bind(&new.name)
        .bind(&new.unit_type)
        .bind(new.base_price)
        .fetch_one(conn)
        .await
    }

    /// Inserts a batch of products, all or none.
    pub async fn create_all(pool: &PgPool, new: &[NewProduct]) -> Result<Vec<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut created = Vec::with_capacity(new.len());
        for product in new {
            created.push(Self::insert(&mut *tx, product).await?);
        }
        tx.commit().await?;
        Ok(created)
    }

    /// The versioning operation: retire the current in-circulation row and
    /// insert the replacement in the same transaction. Fails when no row is
    /// left to retire, which keeps a retired product from forking versions.
    pub async fn modify(pool: &PgPool, current: &Self, next: NextVersion) -> Result<Self, ApiError> {
        let mut tx = pool.begin().await?;
        let retired = sqlx::query(
            "UPDATE products SET in_circulation = FALSE, updated_at = NOW() \
             WHERE id = $1 AND in_circulation",
        )
        .bind(current.id)
        .execute(&mut *tx)
        .await?;
        if retired.rows_affected() == 0 {
            return Err(ApiError::Forbidden(
                "No in-circulation version of this product exists.".to_string(),
            ));
        }
        let created = sqlx::query_as::<_, Self>(
            "INSERT INTO products (product_id, name, unit_type, base_price, in_circulation) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(current.product_id)
        .bind(&current.name)
        .bind(&current.unit_type)
        .bind(next.base_price)
        .bind(next.in_circulation)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(created)
    }

    /// In-circulation products matching an optional name substring
    /// (case-insensitive) and inclusive price bounds.
    pub async fn search(
        pool: &PgPool,
        name: Option<&str>,
        price_from: Option<Decimal>,
        price_to: Option<Decimal>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM products WHERE in_circulation \
             AND ($1::text IS NULL OR name ILIKE '%' || $1 || '%') \
             AND ($2::numeric IS NULL OR base_price >= $2) \
             AND ($3::numeric IS NULL OR base_price <= $3) \
             ORDER BY id",
        )
        .bind(name)
        .bind(price_from)
        .bind(price_to)
        .fetch_all(pool)
        .await
    }

    /// The newest version created at or before `cutoff`, i.e. the price that
    /// was current when an order placed at `cutoff` was created.
    pub async fn version_as_of(
        pool: &PgPool,
        product_id: i32,
        cutoff: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM products WHERE product_id = $1 AND created_at <= $2 \
             ORDER BY id DESC LIMIT 1",
        )
        .bind(product_id)
        .bind(cutoff)
        .fetch_optional(pool)
        .await
    }

    /// Every version row for a `product_id`, oldest first.
    pub async fn versions(pool: &PgPool, product_id: i32) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM products WHERE product_id = $1 ORDER BY id")
            .bind(product_id)
            .fetch_all(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NewProduct {
        NewProduct {
            product_id: 1,
            name: "2L Cola Soda".to_string(),
            unit_type: Some("bottle".to_string()),
            base_price: Decimal::new(152, 2),
        }
    }

    #[test]
    fn test_valid_product_passes() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut p = sample();
        p.name = String::new();
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_nonpositive_price_rejected() {
        let mut p = sample();
        p.base_price = Decimal::ZERO;
        assert!(p.validate().is_err());
        p.base_price = Decimal::new(-100, 2);
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_overlong_unit_type_rejected() {
        let mut p = sample();
        p.unit_type = Some("pack of sixteen".to_string());
        assert!(p.validate().is_err());
    }
}
