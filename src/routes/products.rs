//! Catalog endpoints under `/products`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::models::{NewProduct, NextVersion, Product};
use crate::payload::parse_one_or_many;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create))
        .route("/search", get(search))
        .route("/product/:product_id", get(get_one))
        .route("/product/:product_id/updatePrice", post(update_price))
        .route("/product/:product_id/remove", post(remove))
}

async fn create(State(state): State<AppState>, Json(body): Json<Value>) -> ApiResult<Response> {
    let products = parse_one_or_many::<NewProduct>(body, false)?;
    let ids: Vec<i32> = products.iter().map(|p| p.product_id).collect();
    let duplicated = Product::in_circulation_among(&state.db, &ids).await?;
    if !duplicated.is_empty() {
        return Ok((
            StatusCode::FORBIDDEN,
            Json(json!({ "duplicatedProducts": duplicated })),
        )
            .into_response());
    }
    let created = Product::create_all(&state.db, &products).await?;
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub name: Option<String>,
    pub from: Option<Decimal>,
    pub to: Option<Decimal>,
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<Product>>> {
    let found = Product::search(&state.db, params.name.as_deref(), params.from, params.to).await?;
    if found.is_empty() {
        return Err(ApiError::NotFound(
            "No Product found with these parameters".to_string(),
        ));
    }
    Ok(Json(found))
}

async fn get_one(
    State(state): State<AppState>,
    Path(product_id): Path<i32>,
) -> ApiResult<Json<Product>> {
    Product::find_current(&state.db, product_id)
        .await?
        .map(Json)
        .ok_or_else(no_such_product)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePrice {
    pub new_price: Option<Decimal>,
}

async fn update_price(
    State(state): State<AppState>,
    Path(product_id): Path<i32>,
    Json(body): Json<UpdatePrice>,
) -> ApiResult<Json<Product>> {
    let new_price = body
        .new_price
        .filter(|price| *price > Decimal::ZERO)
        .ok_or_else(|| {
            ApiError::Forbidden("Invalid or missing newPrice on request body.".to_string())
        })?;
    let current = Product::find_current(&state.db, product_id)
        .await?
        .ok_or_else(no_such_product)?;
    let next = NextVersion {
        base_price: new_price,
        in_circulation: true,
    };
    Ok(Json(Product::modify(&state.db, &current, next).await?))
}

async fn remove(
    State(state): State<AppState>,
    Path(product_id): Path<i32>,
) -> ApiResult<Json<Product>> {
    let current = Product::find_current(&state.db, product_id)
        .await?
        .ok_or_else(no_such_product)?;
    let next = NextVersion {
        base_price: current.base_price,
        in_circulation: false,
    };
    Ok(Json(Product::modify(&state.db, &current, next).await?))
}

fn no_such_product() -> ApiError {
    ApiError::NotFound("No product with this ID exists.".to_string())
}
