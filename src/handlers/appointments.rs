use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus, Review};
use crate::services::appointments::{
    self, check_transition, require_action, AppointmentAction, AppointmentProjection,
};
use crate::services::availability::CANDIDATE_TIMES;
use crate::services::wizard::date_bounds;
use crate::state::AppState;

use super::check_auth;

fn load_booking(state: &AppState, id: &str) -> Result<Booking, AppError> {
    queries::get_booking_by_id(&*state.db()?, id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))
}

// GET /api/customers/:id/appointments
pub async fn customer_appointments(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<String>,
) -> Result<Json<AppointmentProjection>, AppError> {
    let bookings = queries::get_bookings_for_customer(&*state.db()?, &customer_id)?;
    Ok(Json(appointments::project(bookings)))
}

// GET /api/shops/:id/appointments
#[derive(Deserialize)]
pub struct ShopAppointmentsQuery {
    pub status: Option<String>,
}

pub async fn shop_appointments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(shop_id): Path<String>,
    Query(query): Query<ShopAppointmentsQuery>,
) -> Result<Json<AppointmentProjection>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let status = match query.status.as_deref().filter(|s| !s.is_empty()) {
        Some(s) => Some(
            BookingStatus::parse(s)
                .ok_or_else(|| AppError::Validation(format!("unknown status: {s}")))?,
        ),
        None => None,
    };

    let bookings = queries::get_bookings_for_shop(&*state.db()?, &shop_id, status)?;
    Ok(Json(appointments::project(bookings)))
}

// POST /api/shops/:shop_id/bookings/:id/status
#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: BookingStatus,
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((shop_id, id)): Path<(String, String)>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<Booking>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let booking = load_booking(&state, &id)?;
    if booking.shop_id != shop_id {
        return Err(AppError::NotFound(format!("booking {id}")));
    }
    check_transition(booking.status, body.status)?;

    if !queries::update_booking_status(&*state.db()?, &id, booking.status, body.status)? {
        return Err(AppError::Conflict(format!(
            "booking {id} changed status concurrently"
        )));
    }
    tracing::info!(
        booking_id = %id,
        from = booking.status.as_str(),
        to = body.status.as_str(),
        "booking status changed"
    );

    Ok(Json(load_booking(&state, &id)?))
}

// POST /api/bookings/:id/reschedule
#[derive(Deserialize)]
pub struct RescheduleRequest {
    pub appointment_date: NaiveDate,
    pub appointment_time: String,
}

pub async fn reschedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<RescheduleRequest>,
) -> Result<Json<Booking>, AppError> {
    let booking = load_booking(&state, &id)?;
    require_action(booking.status, AppointmentAction::Reschedule)?;

    let (earliest, latest) = date_bounds(state.today());
    if body.appointment_date < earliest || body.appointment_date > latest {
        return Err(AppError::Validation(format!(
            "appointment date must be between {earliest} and {latest}"
        )));
    }
    if !CANDIDATE_TIMES.contains(&body.appointment_time.as_str()) {
        return Err(AppError::Validation(format!(
            "{} is not a bookable time",
            body.appointment_time
        )));
    }
    if !state
        .availability
        .is_available(&booking.shop_id, body.appointment_date, &body.appointment_time)
    {
        return Err(AppError::Conflict(format!(
            "time slot {} is not available",
            body.appointment_time
        )));
    }

    let rescheduled = queries::reschedule_booking(
        &*state.db()?,
        &id,
        booking.status,
        body.appointment_date,
        &body.appointment_time,
    )?;
    if !rescheduled {
        return Err(AppError::Conflict(format!(
            "booking {id} changed status concurrently"
        )));
    }
    tracing::info!(booking_id = %id, date = %body.appointment_date, "booking rescheduled");

    Ok(Json(load_booking(&state, &id)?))
}

// POST /api/bookings/:id/review
#[derive(Deserialize)]
pub struct ReviewRequest {
    pub rating: i32,
    pub comment: Option<String>,
}

pub async fn leave_review(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<ReviewRequest>,
) -> Result<(StatusCode, Json<Review>), AppError> {
    if !(1..=5).contains(&body.rating) {
        return Err(AppError::Validation("rating must be between 1 and 5".to_string()));
    }

    let booking = load_booking(&state, &id)?;
    require_action(booking.status, AppointmentAction::LeaveReview)?;

    let review = Review {
        id: uuid::Uuid::new_v4().to_string(),
        booking_id: booking.id,
        shop_id: booking.shop_id,
        customer_id: booking.customer_id,
        rating: body.rating,
        comment: body
            .comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty()),
        created_at: state.clock.now().naive_utc(),
    };

    {
        let db = state.db()?;
        if queries::review_exists_for_booking(&db, &id)? {
            return Err(AppError::Conflict("booking already reviewed".to_string()));
        }
        queries::create_review(&db, &review)?;
    }

    tracing::info!(booking_id = %id, shop_id = %review.shop_id, rating = review.rating, "review left");
    Ok((StatusCode::CREATED, Json(review)))
}
