use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

use crate::error::{AppError, Result};
use crate::models::{ContentStats, FilterValues};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/stats", get(public_stats))
        .route("/filters", get(public_filters))
        .route("/metrics", get(metrics))
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Catalog Content REST API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "auth": {
                "register": "POST /auth/register",
                "login": "POST /auth/login",
                "me": "GET /auth/me"
            },
            "content": {
                "list": "GET /content/",
                "get_by_id": "GET /content/{id}",
                "search": "GET /content/search/query",
                "by_rating": "GET /content/by-rating/{rating}",
                "by_category": "GET /content/by-category/{category}",
                "filters": {
                    "ratings": "GET /content/filters/ratings",
                    "categories": "GET /content/filters/categories",
                    "countries": "GET /content/filters/countries"
                },
                "stats": "GET /content/stats/overview"
            },
            "admin": {
                "load_data": "POST /load-data",
                "stats": "GET /stats",
                "filters": "GET /filters"
            }
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

async fn public_stats(State(state): State<AppState>) -> Result<Json<ContentStats>> {
    Ok(Json(state.catalog_service().stats().await?))
}

async fn public_filters(State(state): State<AppState>) -> Result<Json<FilterValues>> {
    Ok(Json(state.catalog_service().filter_values().await?))
}

async fn metrics() -> Result<impl IntoResponse> {
    let body = crate::metrics::render().map_err(AppError::Internal)?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}
