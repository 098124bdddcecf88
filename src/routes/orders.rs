//! Order endpoints under `/orders`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::models::{order, CostLine, CostSummary, LineItemChange, NewOrder, Order, OrderProduct, Product};
use crate::payload::parse_one_or_many;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create))
        .route("/order/:order_id", get(get_one))
        .route("/order/:order_id/product/add", post(add_products))
        .route("/order/:order_id/product/remove", post(remove_products))
        .route("/order/:order_id/getCost", get(get_cost))
        .route("/order/:order_id/processPayment", post(process_payment))
}

async fn create(State(state): State<AppState>, Json(body): Json<Value>) -> ApiResult<Response> {
    // Orders start out empty, so a blank body is a valid single order.
    let orders = parse_one_or_many::<NewOrder>(body, true)?;
    let created = Order::create_all(&state.db, &orders).await?;
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

async fn get_one(State(state): State<AppState>, Path(order_id): Path<i32>) -> ApiResult<Json<Order>> {
    Order::find(&state.db, order_id)
        .await?
        .map(Json)
        .ok_or_else(no_such_order)
}

async fn add_products(
    State(state): State<AppState>,
    Path(order_id): Path<i32>,
    Json(body): Json<Value>,
) -> ApiResult<Response> {
    change_products(state, order_id, body, 1.0).await
}

async fn remove_products(
    State(state): State<AppState>,
    Path(order_id): Path<i32>,
    Json(body): Json<Value>,
) -> ApiResult<Response> {
    change_products(state, order_id, body, -1.0).await
}

/// Shared add/remove path: the only difference is the sign on the amounts.
async fn change_products(
    state: AppState,
    order_id: i32,
    body: Value,
    sign: f64,
) -> ApiResult<Response> {
    let order = Order::find(&state.db, order_id)
        .await?
        .ok_or_else(no_such_order)?;
    let changes = parse_one_or_many::<LineItemChange>(body, false)?;

    let mut tx = state.db.begin().await?;
    let mut line_items = Vec::with_capacity(changes.len());
    for change in &changes {
        let applied =
            OrderProduct::apply(&mut *tx, order.id, change.product_id, sign * change.amount).await?;
        if let Some(row) = applied {
            line_items.push(row);
        }
    }
    tx.commit().await?;
    Ok((StatusCode::CREATED, Json(line_items)).into_response())
}

async fn get_cost(
    State(state): State<AppState>,
    Path(order_id): Path<i32>,
) -> ApiResult<Json<CostSummary>> {
    let order = Order::find(&state.db, order_id)
        .await?
        .ok_or_else(no_such_order)?;
    let items = OrderProduct::for_order(&state.db, order.id, None).await?;
    if items.is_empty() {
        return Err(ApiError::NotFound(
            "No OrderProducts found for this order".to_string(),
        ));
    }

    let mut products = Vec::with_capacity(items.len());
    for item in &items {
        // Price each line with the version that was current when the order
        // was created, not today's price.
        let version = Product::version_as_of(&state.db, item.product_id, order.created_at)
            .await?
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "No product with ID {} existed when this order was created.",
                    item.product_id
                ))
            })?;
        products.push(CostLine {
            name: version.name,
            base_price: version.base_price,
            unit_type: version.unit_type,
            amount: item.amount,
        });
    }

    let final_cost = order::final_cost(&products)?;
    Ok(Json(CostSummary {
        products,
        final_cost,
    }))
}

async fn process_payment(
    State(state): State<AppState>,
    Path(order_id): Path<i32>,
) -> ApiResult<Json<Order>> {
    let order = Order::find(&state.db, order_id)
        .await?
        .ok_or_else(no_such_order)?;
    if order.is_paid {
        return Err(ApiError::Forbidden(
            "You cannot pay for an already paid for order.".to_string(),
        ));
    }
    Ok(Json(Order::mark_paid(&state.db, order.id).await?))
}

fn no_such_order() -> ApiError {
    ApiError::NotFound("No order with this ID exists.".to_string())
}
