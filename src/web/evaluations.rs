use crate::domain::models::UserRole;
use crate::domain::workflow::EvaluationChanges;
use crate::error::AppError;
use crate::services::evaluations::{self, EvaluationSummary, EvaluationView, SubordinateOverview};
use crate::state::SharedState;
use crate::web::session::CurrentUser;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub user_id: Option<String>,
    pub period_id: Option<String>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list))
        .route("/:user_id/:period_id", get(open).put(save_draft))
        .route("/:user_id/:period_id/submit", post(submit))
        .route("/:user_id/:period_id/approve", post(approve))
        .route("/:user_id/:period_id/admin-approve", post(admin_approve))
        .with_state(state)
}

pub fn subordinates_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(subordinates))
        .with_state(state)
}

/// Admins without a `user_id` filter get every stored evaluation; everyone
/// else gets one user's history, their own by default.
async fn list(
    State(state): State<SharedState>,
    CurrentUser(actor): CurrentUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<EvaluationSummary>>, AppError> {
    let period = query.period_id.as_deref();
    let rows = match query.user_id.as_deref() {
        None if actor.role == UserRole::Admin => evaluations::list_all(&state, &actor, period).await?,
        None => evaluations::list_for_user(&state, &actor, &actor.id, period).await?,
        Some(user_id) => evaluations::list_for_user(&state, &actor, user_id, period).await?,
    };
    Ok(Json(rows))
}

async fn open(
    State(state): State<SharedState>,
    CurrentUser(actor): CurrentUser,
    Path((user_id, period_id)): Path<(String, String)>,
) -> Result<Json<EvaluationView>, AppError> {
    let view = evaluations::open_evaluation(&state, &actor, &user_id, &period_id, Utc::now()).await?;
    Ok(Json(view))
}

async fn save_draft(
    State(state): State<SharedState>,
    CurrentUser(actor): CurrentUser,
    Path((user_id, period_id)): Path<(String, String)>,
    Json(changes): Json<EvaluationChanges>,
) -> Result<Json<EvaluationView>, AppError> {
    let view = evaluations::save(&state, &actor, &user_id, &period_id, &changes, false, Utc::now()).await?;
    Ok(Json(view))
}

async fn submit(
    State(state): State<SharedState>,
    CurrentUser(actor): CurrentUser,
    Path((user_id, period_id)): Path<(String, String)>,
    Json(changes): Json<EvaluationChanges>,
) -> Result<Json<EvaluationView>, AppError> {
    let view = evaluations::save(&state, &actor, &user_id, &period_id, &changes, true, Utc::now()).await?;
    Ok(Json(view))
}

async fn approve(
    State(state): State<SharedState>,
    CurrentUser(actor): CurrentUser,
    Path((user_id, period_id)): Path<(String, String)>,
) -> Result<Json<EvaluationView>, AppError> {
    let view = evaluations::approve_by_evaluator(&state, &actor, &user_id, &period_id, Utc::now()).await?;
    Ok(Json(view))
}

async fn admin_approve(
    State(state): State<SharedState>,
    CurrentUser(actor): CurrentUser,
    Path((user_id, period_id)): Path<(String, String)>,
) -> Result<Json<EvaluationView>, AppError> {
    let view = evaluations::approve_by_admin(&state, &actor, &user_id, &period_id, Utc::now()).await?;
    Ok(Json(view))
}

async fn subordinates(
    State(state): State<SharedState>,
    CurrentUser(actor): CurrentUser,
) -> Result<Json<SubordinateOverview>, AppError> {
    Ok(Json(evaluations::subordinates(&state, &actor).await?))
}
