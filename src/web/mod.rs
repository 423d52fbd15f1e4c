pub mod auth;
pub mod config;
pub mod evaluations;
pub mod periods;
pub mod session;
pub mod settings;
pub mod snapshot;
pub mod users;

use crate::db::Collection;
use crate::error::AppError;
use crate::state::SharedState;
use axum::{extract::State, routing::get, Router};

/// Liveness plus a read against the record store.
async fn health(State(state): State<SharedState>) -> Result<&'static str, AppError> {
    state.store().count(Collection::Settings).await?;
    Ok("OK")
}

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(state.clone())
        .nest("/auth", auth::router(state.clone()))
        .nest("/users", users::router(state.clone()))
        .nest("/periods", periods::router(state.clone()))
        .nest("/evaluations", evaluations::router(state.clone()))
        .nest("/subordinates", evaluations::subordinates_router(state.clone()))
        .nest("/config", config::router(state.clone()))
        .nest("/settings", settings::router(state.clone()))
        .nest("/snapshot", snapshot::router(state))
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::state::SharedState;
    use crate::web::session;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use axum::response::Response;
    use serde_json::Value;

    /// Request signed in as `user_id`, which must be a stored user.
    pub fn authed(state: &SharedState, user_id: &str, method: &str, uri: &str, body: Body) -> Request<Body> {
        let role = state
            .config()
            .current_tenant()
            .sample_users
            .iter()
            .find(|u| u.id == user_id)
            .map(|u| u.role)
            .expect("sample user");
        let token = session::sign_session(
            user_id,
            role,
            &state.config().current_tenant().id,
            60,
            &state.env.session_key,
        )
        .expect("token");

        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .expect("request")
    }

    pub async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }
}
