use crate::domain::models::User;
use crate::error::AppError;
use crate::services::users::{self, UserFilter, UserInput};
use crate::state::SharedState;
use crate::web::session::CurrentUser;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Utc;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(show).put(update).delete(remove))
        .with_state(state)
}

async fn list(
    State(state): State<SharedState>,
    CurrentUser(actor): CurrentUser,
    Query(filter): Query<UserFilter>,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(users::list(&state, &actor, &filter).await?))
}

async fn show(
    State(state): State<SharedState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    Ok(Json(users::get(&state, &actor, &id).await?))
}

async fn create(
    State(state): State<SharedState>,
    CurrentUser(actor): CurrentUser,
    Json(input): Json<UserInput>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = users::create(&state, &actor, input, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn update(
    State(state): State<SharedState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<UserInput>,
) -> Result<Json<User>, AppError> {
    Ok(Json(users::update(&state, &actor, &id, input, Utc::now()).await?))
}

async fn remove(
    State(state): State<SharedState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    users::delete(&state, &actor, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
