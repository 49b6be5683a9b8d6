use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Review, Service, Shop};
use crate::services::search::{self, ShopFilters};
use crate::state::AppState;

// GET /api/shops
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(filters): Query<ShopFilters>,
) -> Response {
    let shops = match state.db().and_then(|db| queries::list_shops(&db).map_err(AppError::from)) {
        Ok(shops) => shops,
        Err(e) => {
            tracing::error!(error = %e, "shop search failed");
            // Keep the result shape so clients can render an empty list
            let body = serde_json::json!({
                "error": "Failed to search shops. Please try again.",
                "shops": [],
                "total": 0,
                "page": filters.page.unwrap_or(1).max(1),
                "limit": filters.limit.unwrap_or(search::DEFAULT_PAGE_SIZE),
                "has_more": false,
            });
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
        }
    };

    let results = search::search_shops(shops, &filters);
    tracing::info!(
        location = filters.location.as_deref().unwrap_or(""),
        service = filters.service.as_deref().unwrap_or(""),
        total = results.total,
        "shop search"
    );
    Json(results).into_response()
}

// GET /api/shops/:id
pub async fn get_shop(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Shop>, AppError> {
    let shop = queries::get_shop(&*state.db()?, &id)?;
    shop.map(Json)
        .ok_or_else(|| AppError::NotFound(format!("shop {id}")))
}

// GET /api/shops/:id/services
pub async fn get_services(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Service>>, AppError> {
    let db = state.db()?;
    if queries::get_shop(&db, &id)?.is_none() {
        return Err(AppError::NotFound(format!("shop {id}")));
    }
    Ok(Json(queries::get_services_for_shop(&db, &id)?))
}

// GET /api/shops/:id/reviews
pub async fn get_reviews(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Review>>, AppError> {
    let reviews = queries::get_reviews_for_shop(&*state.db()?, &id)?;
    Ok(Json(reviews))
}
