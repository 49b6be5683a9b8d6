use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::User;
use crate::state::AppState;

// POST /api/users
pub async fn save_user(
    State(state): State<Arc<AppState>>,
    Json(user): Json<User>,
) -> Result<Json<User>, AppError> {
    if user.id.trim().is_empty() {
        return Err(AppError::Validation("id is required".to_string()));
    }
    if !user.email.contains('@') {
        return Err(AppError::Validation("a valid email is required".to_string()));
    }

    queries::save_user(&*state.db()?, &user)?;
    Ok(Json(user))
}

// GET /api/users/:id
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    queries::get_user(&*state.db()?, &id)?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("user {id}")))
}
