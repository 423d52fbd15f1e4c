use crate::domain::models::{Criterion, EvaluationCategory};
use crate::error::AppError;
use crate::state::SharedState;
use crate::tenant::QualitativeTemplate;
use crate::web::session::CurrentUser;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct PositionQuery {
    pub position: Option<String>,
}

#[derive(Serialize)]
pub struct CriteriaResponse {
    pub quantitative: Vec<Criterion>,
    pub qualitative: Vec<Criterion>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/categories", get(categories))
        .route("/categories/:id", get(category))
        .route("/criteria", get(criteria))
        .route("/templates", get(templates))
        .route("/weight-issues", get(weight_issues))
        .with_state(state)
}

async fn categories(
    State(state): State<SharedState>,
    CurrentUser(_): CurrentUser,
    Query(query): Query<PositionQuery>,
) -> Json<Vec<EvaluationCategory>> {
    Json(state.config().evaluation_categories(query.position.as_deref()))
}

async fn category(
    State(state): State<SharedState>,
    CurrentUser(_): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<EvaluationCategory>, AppError> {
    state
        .config()
        .category(&id)
        .map(Json)
        .ok_or_else(|| AppError::not_found("category", id))
}

async fn criteria(
    State(state): State<SharedState>,
    CurrentUser(actor): CurrentUser,
    Query(query): Query<PositionQuery>,
) -> Json<CriteriaResponse> {
    let position = query.position.unwrap_or(actor.position);
    Json(CriteriaResponse {
        quantitative: state.config().evaluation_criteria(&position).to_vec(),
        qualitative: state.config().qualitative_criteria().to_vec(),
    })
}

async fn templates(
    State(state): State<SharedState>,
    CurrentUser(_): CurrentUser,
    Query(query): Query<PositionQuery>,
) -> Json<Vec<QualitativeTemplate>> {
    Json(state.config().qualitative_templates(query.position.as_deref()))
}

async fn weight_issues(
    State(state): State<SharedState>,
    CurrentUser(_): CurrentUser,
) -> Json<Vec<String>> {
    Json(state.config().category_weight_issues())
}
