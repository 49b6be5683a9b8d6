pub mod appointments;
pub mod cars;
pub mod health;
pub mod shops;
pub mod users;
pub mod vehicles;
pub mod wizard;

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::routing::{delete, get, post};
use axum::Router;

use crate::errors::AppError;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/shops", get(shops::search))
        .route("/api/shops/:id", get(shops::get_shop))
        .route("/api/shops/:id/services", get(shops::get_services))
        .route("/api/shops/:id/reviews", get(shops::get_reviews))
        .route(
            "/api/shops/:id/appointments",
            get(appointments::shop_appointments),
        )
        .route(
            "/api/shops/:shop_id/bookings/:id/status",
            post(appointments::update_status),
        )
        .route(
            "/api/customers/:id/appointments",
            get(appointments::customer_appointments),
        )
        .route(
            "/api/bookings/:id/reschedule",
            post(appointments::reschedule),
        )
        .route("/api/bookings/:id/review", post(appointments::leave_review))
        .route(
            "/api/customers/:id/cars",
            get(cars::list_cars).post(cars::add_car),
        )
        .route("/api/cars/:id", delete(cars::delete_car))
        .route("/api/users", post(users::save_user))
        .route("/api/users/:id", get(users::get_user))
        .route("/api/vehicles/makes", get(vehicles::makes))
        .route("/api/vehicles/models", get(vehicles::models))
        .route("/api/vehicles/trims", get(vehicles::trims))
        .route("/api/wizard", post(wizard::start))
        .route(
            "/api/wizard/:id",
            get(wizard::get_wizard).patch(wizard::update_draft),
        )
        .route("/api/wizard/:id/date", post(wizard::select_date))
        .route("/api/wizard/:id/next", post(wizard::next_step))
        .route("/api/wizard/:id/back", post(wizard::previous_step))
        .route("/api/wizard/:id/submit", post(wizard::submit))
        .with_state(state)
}

/// Bearer-token check for shop-side operations.
pub(crate) fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}
