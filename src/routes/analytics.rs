//! Read-only sales analytics under `/analytics`.
//!
//! Every report is plain aggregation over query results: no precomputed
//! indexes, no incremental state. Revenue reports price each line item with
//! the product version that was current when its order was created.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::models::{order, Order, OrderProduct, Product};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products/bestSellers", get(best_sellers))
        .route("/products/revenue", get(products_revenue))
        .route("/products/product/:product_id/revenue", get(product_revenue))
        .route("/products/product/:product_id/priceHistory", get(price_history))
        .route("/orders/revenue", get(orders_revenue))
}

/// Optional day-granularity reporting window. Both bounds are normalized to
/// the start of their day and applied inclusively against `updatedAt`.
#[derive(Debug, Default, Deserialize)]
pub struct WindowParams {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl WindowParams {
    pub fn bounds(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        let start_of_day = |date: NaiveDate| date.and_time(NaiveTime::MIN).and_utc();
        (self.from.map(start_of_day), self.to.map(start_of_day))
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct BestSeller {
    pub product: i32,
    pub amount: f64,
}

/// Sums line-item amounts per product, ascending by product id.
fn tally_best_sellers(items: &[OrderProduct]) -> Vec<BestSeller> {
    let mut totals: BTreeMap<i32, f64> = BTreeMap::new();
    for item in items {
        *totals.entry(item.product_id).or_default() += item.amount;
    }
    totals
        .into_iter()
        .map(|(product, amount)| BestSeller { product, amount })
        .collect()
}

async fn best_sellers(
    State(state): State<AppState>,
    Query(window): Query<WindowParams>,
) -> ApiResult<Json<Vec<BestSeller>>> {
    let (from, to) = window.bounds();
    let items = OrderProduct::in_window(&state.db, from, to).await?;
    if items.is_empty() {
        return Err(no_data());
    }
    Ok(Json(tally_best_sellers(&items)))
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueReport {
    pub total_revenue: Decimal,
    pub products: BTreeMap<i32, Decimal>,
}

impl RevenueReport {
    fn add(&mut self, product_id: i32, revenue: Decimal) {
        *self.products.entry(product_id).or_default() += revenue;
        self.total_revenue += revenue;
    }
}

/// Revenue per product over the paid orders in the window, optionally
/// narrowed to a single product id.
async fn revenue_report(
    state: &AppState,
    window: &WindowParams,
    product_id: Option<i32>,
) -> ApiResult<RevenueReport> {
    let (from, to) = window.bounds();
    let orders = Order::paid_between(&state.db, from, to).await?;
    if orders.is_empty() {
        return Err(no_data());
    }

    let mut report = RevenueReport::default();
    for paid_order in &orders {
        let items = OrderProduct::for_order(&state.db, paid_order.id, product_id).await?;
        for item in &items {
            let version =
                Product::version_as_of(&state.db, item.product_id, paid_order.created_at).await?;
            if let Some(version) = version {
                report.add(item.product_id, order::weighted(version.base_price, item.amount)?);
            }
        }
    }
    Ok(report)
}

async fn products_revenue(
    State(state): State<AppState>,
    Query(window): Query<WindowParams>,
) -> ApiResult<Json<RevenueReport>> {
    Ok(Json(revenue_report(&state, &window, None).await?))
}

async fn product_revenue(
    State(state): State<AppState>,
    Path(product_id): Path<i32>,
    Query(window): Query<WindowParams>,
) -> ApiResult<Json<RevenueReport>> {
    Ok(Json(revenue_report(&state, &window, Some(product_id)).await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    pub date: DateTime<Utc>,
    pub base_price: Decimal,
    pub change_id: i32,
}

async fn price_history(
    State(state): State<AppState>,
    Path(product_id): Path<i32>,
) -> ApiResult<Json<Vec<PricePoint>>> {
    let versions = Product::versions(&state.db, product_id).await?;
    if versions.is_empty() {
        return Err(ApiError::NotFound(
            "No product with this ID exists.".to_string(),
        ));
    }
    let history = versions
        .into_iter()
        .map(|version| PricePoint {
            date: version.created_at,
            base_price: version.base_price,
            change_id: version.id,
        })
        .collect();
    Ok(Json(history))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdersRevenue {
    pub total_revenue: Decimal,
}

async fn orders_revenue(
    State(state): State<AppState>,
    Query(window): Query<WindowParams>,
) -> ApiResult<Json<OrdersRevenue>> {
    let (from, to) = window.bounds();
    let orders = Order::paid_between(&state.db, from, to).await?;
    if orders.is_empty() {
        return Err(no_data());
    }
    // Orders without a stored final cost contribute nothing.
    let total_revenue = orders.iter().filter_map(|o| o.final_cost).sum();
    Ok(Json(OrdersRevenue { total_revenue }))
}

fn no_data() -> ApiError {
    ApiError::NotFound("No data found for the selected arguments".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(product_id: i32, amount: f64) -> OrderProduct {
        OrderProduct {
            id: 0,
            order_id: 1,
            product_id,
            amount,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_best_sellers_sum_per_product() {
        let items = vec![item(8, 2.0), item(9, 1.0), item(8, 3.0)];
        let tally = tally_best_sellers(&items);
        assert_eq!(
            tally,
            vec![
                BestSeller { product: 8, amount: 5.0 },
                BestSeller { product: 9, amount: 1.0 },
            ]
        );
    }

    #[test]
    fn test_window_bounds_start_of_day() {
        let window = WindowParams {
            from: NaiveDate::from_ymd_opt(2020, 5, 13),
            to: None,
        };
        let (from, to) = window.bounds();
        assert_eq!(from.unwrap().to_rfc3339(), "2020-05-13T00:00:00+00:00");
        assert!(to.is_none());
    }

    #[test]
    fn test_missing_window_is_unbounded() {
        let (from, to) = WindowParams::default().bounds();
        assert!(from.is_none() && to.is_none());
    }

    #[test]
    fn test_revenue_report_accumulates() {
        let mut report = RevenueReport::default();
        report.add(6, Decimal::new(2504, 2));
        report.add(8, Decimal::new(936, 2));
        report.add(6, Decimal::new(1252, 2));
        assert_eq!(report.total_revenue, Decimal::new(4692, 2));
        assert_eq!(report.products[&6], Decimal::new(3756, 2));
        assert_eq!(report.products[&8], Decimal::new(936, 2));
    }
}
