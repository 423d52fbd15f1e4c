use crate::domain::models::{Setting, UserRole};
use crate::error::AppError;
use crate::services::reminders::{self, ReminderReport};
use crate::services::settings::{self, Statistics};
use crate::state::SharedState;
use crate::web::session::CurrentUser;
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(all))
        .route("/statistics", get(statistics))
        .route("/reminders", get(reminders))
        .route("/:key", get(show).put(update))
        .with_state(state)
}

async fn all(
    State(state): State<SharedState>,
    CurrentUser(_): CurrentUser,
) -> Result<Json<BTreeMap<String, Value>>, AppError> {
    Ok(Json(settings::all(&state).await?))
}

async fn show(
    State(state): State<SharedState>,
    CurrentUser(_): CurrentUser,
    Path(key): Path<String>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(settings::get(&state, &key).await?))
}

async fn update(
    State(state): State<SharedState>,
    CurrentUser(actor): CurrentUser,
    Path(key): Path<String>,
    Json(value): Json<Value>,
) -> Result<Json<Setting>, AppError> {
    Ok(Json(settings::set(&state, &actor, &key, value, Utc::now()).await?))
}

async fn statistics(
    State(state): State<SharedState>,
    CurrentUser(actor): CurrentUser,
) -> Result<Json<Statistics>, AppError> {
    crate::auth::require_role(&actor, UserRole::Admin)?;
    Ok(Json(settings::statistics(&state).await?))
}

/// What the daily reminder job would log right now.
async fn reminders(
    State(state): State<SharedState>,
    CurrentUser(actor): CurrentUser,
) -> Result<Json<ReminderReport>, AppError> {
    crate::auth::require_role(&actor, UserRole::Evaluator)?;
    Ok(Json(reminders::run(&state, Utc::now()).await?))
}
