use crate::db;
use crate::domain::models::{User, UserRole};
use crate::error::AppError;
use crate::state::SharedState;
use crate::tenant::{Department, Features, Tenant};
use std::collections::BTreeMap;
use crate::web::session::{self, CurrentUser};
use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct LoginRequest {
    /// User id or email.
    pub login: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub user_id: String,
    pub role: UserRole,
    pub name: String,
    pub token: String,
}

#[derive(Serialize)]
pub struct TenantInfo {
    pub id: String,
    pub display_name: String,
    pub industry: String,
    pub timezone: String,
    pub positions: Vec<String>,
    pub roles: Vec<UserRole>,
    pub departments: Vec<Department>,
    pub features: Features,
    /// Suggested qualitative goals per position.
    pub default_goals: BTreeMap<String, Vec<String>>,
}

#[derive(Serialize)]
pub struct Me {
    #[serde(flatten)]
    pub user: User,
    pub permission_level: u8,
}

impl From<&Tenant> for TenantInfo {
    fn from(tenant: &Tenant) -> Self {
        Self {
            id: tenant.id.clone(),
            display_name: tenant.display_name.clone(),
            industry: tenant.industry.clone(),
            timezone: tenant.timezone.clone(),
            positions: tenant.positions.clone(),
            roles: tenant.roles.clone(),
            departments: tenant.departments.clone(),
            features: tenant.features.clone(),
            default_goals: tenant.default_goals.clone(),
        }
    }
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/auto-login", post(auto_login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/tenant", get(tenant))
        .with_state(state)
}

fn session_cookie(token: &str, max_age: i64, secure: bool) -> Result<HeaderMap, AppError> {
    let secure_flag = if secure { "; Secure" } else { "" };
    let value = format!("session={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age}{secure_flag}");

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&value).map_err(|_| AppError::Unauthorized)?,
    );
    Ok(headers)
}

async fn issue_session(state: &SharedState, user_id: &str) -> Result<impl IntoResponse, AppError> {
    let user = db::fetch::<User>(state.store(), user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;
    let tenant_id = &state.config().current_tenant().id;
    let token = session::sign_session(
        &user.id,
        user.role,
        tenant_id,
        state.env.session_ttl_secs,
        &state.env.session_key,
    )
    .map_err(|e| {
        tracing::error!("Failed to sign session for {}: {}", user.id, e);
        AppError::Unauthorized
    })?;

    tracing::info!(user = %user.id, role = %user.role, "Signed in");
    let headers = session_cookie(&token, state.env.session_ttl_secs, state.env.secure_cookies)?;
    Ok((
        headers,
        Json(LoginResponse {
            user_id: user.id,
            role: user.role,
            name: user.full_name,
            token,
        }),
    ))
}

async fn login(
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let identifier = payload.login.trim().to_lowercase();
    if !state.login_limiter.check(&identifier).await {
        tracing::warn!("Login rate limit exceeded for {}", identifier);
        return Err(AppError::RateLimited);
    }

    let user_id = state
        .auth
        .login(&payload.login, &payload.password)
        .map_err(|e| {
            tracing::warn!("Failed login for {}: {}", identifier, e);
            AppError::Unauthorized
        })?
        .to_string();
    state.login_limiter.reset(&identifier).await;

    issue_session(&state, &user_id).await
}

/// Demo convenience; disabled unless `AUTO_LOGIN` is set.
async fn auto_login(State(state): State<SharedState>) -> Result<impl IntoResponse, AppError> {
    if !state.env.auto_login {
        return Err(AppError::forbidden("auto login is disabled"));
    }
    let user_id = state
        .auth
        .auto_login()
        .ok_or(AppError::Unauthorized)?
        .to_string();
    issue_session(&state, &user_id).await
}

async fn logout(State(state): State<SharedState>) -> Result<impl IntoResponse, AppError> {
    Ok((session_cookie("", 0, state.env.secure_cookies)?, Json(serde_json::json!({ "ok": true }))))
}

async fn me(CurrentUser(user): CurrentUser) -> Json<Me> {
    let permission_level = user.role.permission_level();
    Json(Me { user, permission_level })
}

async fn tenant(State(state): State<SharedState>) -> Json<TenantInfo> {
    Json(TenantInfo::from(state.config().current_tenant()))
}
