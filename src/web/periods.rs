use crate::domain::models::EvaluationPeriod;
use crate::error::AppError;
use crate::services::periods::{self, PeriodInput};
use crate::state::SharedState;
use crate::web::session::CurrentUser;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/active", get(active))
        .route("/:id", get(show).put(update).delete(remove))
        .route("/:id/activate", post(activate))
        .route("/:id/deactivate", post(deactivate))
        .with_state(state)
}

async fn list(
    State(state): State<SharedState>,
    CurrentUser(_): CurrentUser,
) -> Result<Json<Vec<EvaluationPeriod>>, AppError> {
    Ok(Json(periods::list(&state).await?))
}

async fn active(
    State(state): State<SharedState>,
    CurrentUser(_): CurrentUser,
) -> Result<Json<Option<EvaluationPeriod>>, AppError> {
    Ok(Json(periods::active(&state).await?))
}

async fn show(
    State(state): State<SharedState>,
    CurrentUser(_): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<EvaluationPeriod>, AppError> {
    Ok(Json(periods::get(&state, &id).await?))
}

async fn create(
    State(state): State<SharedState>,
    CurrentUser(actor): CurrentUser,
    Json(input): Json<PeriodInput>,
) -> Result<(StatusCode, Json<EvaluationPeriod>), AppError> {
    let period = periods::create(&state, &actor, input, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(period)))
}

async fn update(
    State(state): State<SharedState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<PeriodInput>,
) -> Result<Json<EvaluationPeriod>, AppError> {
    Ok(Json(periods::update(&state, &actor, &id, input, Utc::now()).await?))
}

async fn activate(
    State(state): State<SharedState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<EvaluationPeriod>, AppError> {
    Ok(Json(periods::activate(&state, &actor, &id, Utc::now()).await?))
}

async fn deactivate(
    State(state): State<SharedState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<EvaluationPeriod>, AppError> {
    Ok(Json(periods::deactivate(&state, &actor, &id, Utc::now()).await?))
}

async fn remove(
    State(state): State<SharedState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    periods::delete(&state, &actor, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::seeded_state;
    use crate::web::test_support::{authed, json_body};
    use axum::body::Body;
    use tower::ServiceExt;

    #[tokio::test]
    async fn second_active_period_is_a_validation_error() {
        let state = seeded_state().await;
        let response = router(state.clone())
            .oneshot(authed(&state, "admin", "POST", "/period-2025-h1/activate", Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        assert_eq!(
            body["details"][0],
            "duplicate active period: '2025 H2' is already active"
        );
    }

    #[tokio::test]
    async fn everyone_signed_in_can_read_the_active_period() {
        let state = seeded_state().await;
        let response = router(state.clone())
            .oneshot(authed(&state, "employee", "GET", "/active", Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["id"], "period-2025-h2");

        let response = router(state.clone())
            .oneshot(authed(&state, "employee", "GET", "/period-missing", Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
