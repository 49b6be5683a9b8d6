use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, UserType};
use crate::services::wizard::{date_bounds, BookingWizard, DraftUpdate};
use crate::state::AppState;

/// Abandoned sessions are dropped after this long.
const SESSION_MAX_AGE_HOURS: i64 = 24;

#[derive(Serialize)]
pub struct WizardResponse {
    #[serde(flatten)]
    wizard: BookingWizard,
    step_number: u8,
    can_advance: bool,
    min_date: NaiveDate,
    max_date: NaiveDate,
}

impl WizardResponse {
    fn new(wizard: BookingWizard, today: NaiveDate) -> Self {
        let (min_date, max_date) = date_bounds(today);
        Self {
            step_number: wizard.step.number(),
            can_advance: wizard.can_advance(),
            wizard,
            min_date,
            max_date,
        }
    }
}

fn with_wizard<T>(
    state: &AppState,
    id: &str,
    f: impl FnOnce(&mut BookingWizard) -> Result<T, AppError>,
) -> Result<(T, BookingWizard), AppError> {
    let mut sessions = state.wizards()?;
    let wizard = sessions
        .get_mut(id)
        .ok_or_else(|| AppError::NotFound(format!("booking session {id}")))?;
    let out = f(wizard)?;
    Ok((out, wizard.clone()))
}

// POST /api/wizard
#[derive(Deserialize)]
pub struct StartRequest {
    pub shop_id: String,
    pub customer_id: String,
}

pub async fn start(
    State(state): State<Arc<AppState>>,
    Json(body): Json<StartRequest>,
) -> Result<(StatusCode, Json<WizardResponse>), AppError> {
    let (shop, customer) = {
        let db = state.db()?;
        (
            queries::get_shop(&db, &body.shop_id)?,
            queries::get_user(&db, &body.customer_id)?,
        )
    };

    if shop.is_none() {
        return Err(AppError::NotFound(format!("shop {}", body.shop_id)));
    }
    let customer =
        customer.ok_or_else(|| AppError::NotFound(format!("user {}", body.customer_id)))?;
    if customer.user_type != UserType::Customer {
        return Err(AppError::Validation(
            "only customer accounts can book appointments".to_string(),
        ));
    }

    let now = state.clock.now();
    let mut wizard = BookingWizard::new(
        uuid::Uuid::new_v4().to_string(),
        body.shop_id,
        body.customer_id,
        now,
    );
    wizard.prefill_contact(&customer);

    {
        let mut sessions = state.wizards()?;
        let max_age = chrono::Duration::hours(SESSION_MAX_AGE_HOURS);
        let before = sessions.len();
        sessions.retain(|_, w| !w.is_expired(now, max_age));
        if sessions.len() < before {
            tracing::info!(dropped = before - sessions.len(), "expired booking sessions");
        }
        sessions.insert(wizard.id.clone(), wizard.clone());
    }

    tracing::info!(wizard_id = %wizard.id, shop_id = %wizard.shop_id, "booking session started");
    Ok((
        StatusCode::CREATED,
        Json(WizardResponse::new(wizard, state.today())),
    ))
}

// GET /api/wizard/:id
pub async fn get_wizard(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<WizardResponse>, AppError> {
    let ((), wizard) = with_wizard(&state, &id, |_| Ok(()))?;
    Ok(Json(WizardResponse::new(wizard, state.today())))
}

// PATCH /api/wizard/:id
pub async fn update_draft(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<DraftUpdate>,
) -> Result<Json<WizardResponse>, AppError> {
    let shop_id = with_wizard(&state, &id, |w| Ok(w.shop_id.clone()))?.0;
    let services = queries::get_services_for_shop(&*state.db()?, &shop_id)?;

    let ((), wizard) = with_wizard(&state, &id, |w| {
        w.update(update, &services).map_err(AppError::from)
    })?;
    Ok(Json(WizardResponse::new(wizard, state.today())))
}

// POST /api/wizard/:id/date
#[derive(Deserialize)]
pub struct DateRequest {
    pub appointment_date: NaiveDate,
}

pub async fn select_date(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<DateRequest>,
) -> Result<Json<WizardResponse>, AppError> {
    let today = state.today();
    let ((), wizard) = with_wizard(&state, &id, |w| {
        w.select_date(body.appointment_date, today, state.availability.as_ref())?;
        Ok(())
    })?;
    Ok(Json(WizardResponse::new(wizard, today)))
}

// POST /api/wizard/:id/next
pub async fn next_step(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<WizardResponse>, AppError> {
    let (step, wizard) = with_wizard(&state, &id, |w| w.next().map_err(AppError::from))?;
    tracing::debug!(wizard_id = %id, step = step.number(), "booking step advanced");
    Ok(Json(WizardResponse::new(wizard, state.today())))
}

// POST /api/wizard/:id/back
pub async fn previous_step(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<WizardResponse>, AppError> {
    let (_, wizard) = with_wizard(&state, &id, |w| w.back().map_err(AppError::from))?;
    Ok(Json(WizardResponse::new(wizard, state.today())))
}

// POST /api/wizard/:id/submit
#[derive(Serialize)]
pub struct SubmitResponse {
    wizard: WizardResponse,
    booking: Booking,
}

pub async fn submit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let (draft, wizard) = with_wizard(&state, &id, |w| w.begin_submit().map_err(AppError::from))?;

    tokio::time::sleep(Duration::from_millis(state.config.submit_latency_ms)).await;

    let booking = draft.into_booking(
        uuid::Uuid::new_v4().to_string(),
        wizard.shop_id.clone(),
        wizard.customer_id.clone(),
        state.clock.now().naive_utc(),
    );

    let stored = booking.map_err(AppError::from).and_then(|booking| {
        queries::create_booking(&*state.db()?, &booking)?;
        Ok(booking)
    });

    let booking = match stored {
        Ok(booking) => booking,
        Err(e) => {
            tracing::error!(wizard_id = %id, error = %e, "booking submission failed");
            with_wizard(&state, &id, |w| {
                w.abort_submit();
                Ok(())
            })?;
            return Err(e);
        }
    };

    let wizard = {
        let mut sessions = state.wizards()?;
        let mut wizard = sessions.remove(&id).unwrap_or(wizard);
        wizard.complete_submit(booking.id.clone());
        wizard
    };

    tracing::info!(
        booking_id = %booking.id,
        shop_id = %booking.shop_id,
        date = %booking.appointment_date,
        time = %booking.appointment_time,
        "booking created"
    );

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            wizard: WizardResponse::new(wizard, state.today()),
            booking,
        }),
    ))
}
