use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Datelike;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Car, NewCar};
use crate::state::AppState;

// GET /api/customers/:id/cars
pub async fn list_cars(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<String>,
) -> Result<Json<Vec<Car>>, AppError> {
    let cars = queries::get_cars_for_customer(&*state.db()?, &customer_id)?;
    Ok(Json(cars))
}

// POST /api/customers/:id/cars
pub async fn add_car(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<String>,
    Json(body): Json<NewCar>,
) -> Result<(StatusCode, Json<Car>), AppError> {
    body.validate(state.today().year())
        .map_err(AppError::Validation)?;

    let car = body.into_car(uuid::Uuid::new_v4().to_string(), customer_id);
    {
        let db = state.db()?;
        if queries::get_user(&db, &car.customer_id)?.is_none() {
            return Err(AppError::NotFound(format!("user {}", car.customer_id)));
        }
        queries::create_car(&db, &car)?;
    }

    tracing::info!(car_id = %car.id, customer_id = %car.customer_id, "car added");
    Ok((StatusCode::CREATED, Json(car)))
}

// DELETE /api/cars/:id
pub async fn delete_car(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if queries::delete_car(&*state.db()?, &id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("car {id}")))
    }
}
