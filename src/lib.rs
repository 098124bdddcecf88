//! Commerce Back-Office API
//!
//! Single-process HTTP/JSON service for managing a versioned product
//! catalog, orders built from product line items, and basic sales
//! analytics.
//!
//! ## Features
//! - Versioned catalog: price changes and removals create new product rows
//! - Orders with upsert-style line items and a one-way paid transition
//! - Historical cost computation from the price at order creation time
//! - Best-seller, revenue and price-history reports

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod error;
pub mod models;
pub mod payload;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .nest("/products", routes::products::router())
        .nest("/orders", routes::orders::router())
        .nest("/analytics", routes::analytics::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => (
            StatusCode::OK,
            Json(serde_json::json!({ "healthy": true, "database": "up" })),
        ),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "healthy": false, "database": "down" })),
        ),
    }
}
