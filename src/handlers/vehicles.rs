use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::Datelike;
use serde::Deserialize;

use crate::errors::AppError;
use crate::services::vehicle_data::VehicleLookup;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct MakesQuery {
    pub vehicle_type: Option<String>,
}

// GET /api/vehicles/makes
pub async fn makes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MakesQuery>,
) -> Json<VehicleLookup> {
    Json(state.vehicles.makes(query.vehicle_type.as_deref()).await)
}

#[derive(Deserialize)]
pub struct ModelsQuery {
    pub make: String,
    pub year: Option<i32>,
}

// GET /api/vehicles/models
pub async fn models(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ModelsQuery>,
) -> Result<Json<VehicleLookup>, AppError> {
    let current_year = state.today().year();
    let year = query.year.unwrap_or(current_year);
    if year < 1900 || year > current_year + 1 {
        return Err(AppError::Validation(format!("year {year} is out of range")));
    }
    Ok(Json(state.vehicles.models(&query.make, year).await))
}

#[derive(Deserialize)]
pub struct TrimsQuery {
    pub make: String,
    pub model: String,
}

// GET /api/vehicles/trims
pub async fn trims(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TrimsQuery>,
) -> Json<VehicleLookup> {
    Json(state.vehicles.trims(&query.make, &query.model))
}
