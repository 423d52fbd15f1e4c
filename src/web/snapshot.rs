use crate::auth::require_role;
use crate::db::snapshot::{self, ExportOptions, ImportSummary, Snapshot};
use crate::domain::models::UserRole;
use crate::error::AppError;
use crate::state::SharedState;
use crate::web::session::CurrentUser;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(export).post(import))
        .with_state(state)
}

async fn export(
    State(state): State<SharedState>,
    CurrentUser(actor): CurrentUser,
    Query(options): Query<ExportOptions>,
) -> Result<Json<Snapshot>, AppError> {
    require_role(&actor, UserRole::Admin)?;
    let snapshot = snapshot::export(state.store(), state.config(), options, Utc::now()).await?;
    tracing::info!(actor = %actor.id, "Exported snapshot");
    Ok(Json(snapshot))
}

async fn import(
    State(state): State<SharedState>,
    CurrentUser(actor): CurrentUser,
    Json(document): Json<Snapshot>,
) -> Result<Json<ImportSummary>, AppError> {
    require_role(&actor, UserRole::Admin)?;
    let summary = snapshot::import(state.store(), state.config(), &document).await?;
    tracing::info!(actor = %actor.id, "Imported snapshot");
    Ok(Json(summary))
}
