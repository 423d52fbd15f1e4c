use crate::auth::require_role;
use crate::db;
use crate::domain::models::{User, UserRole};
use crate::domain::validation::validate_user;
use crate::error::AppError;
use crate::state::AppState;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct UserInput {
    pub full_name: String,
    pub email: String,
    pub role: UserRole,
    pub position: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub evaluator_id: Option<String>,
}

impl UserInput {
    fn apply(self, user: &mut User) {
        user.full_name = self.full_name.trim().to_string();
        user.email = self.email.trim().to_string();
        user.role = self.role;
        user.position = self.position.trim().to_string();
        user.department = self.department.filter(|d| !d.trim().is_empty());
        user.evaluator_id = self.evaluator_id.filter(|id| !id.trim().is_empty());
    }
}

fn check_position(state: &AppState, user: &User, errors: &mut Vec<String>) {
    let tenant = state.config().current_tenant();
    if !tenant.positions.iter().any(|p| p == &user.position) {
        errors.push(format!("unknown position '{}'", user.position));
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    /// Case-insensitive match on name, email or login id.
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub role: Option<UserRole>,
}

impl UserFilter {
    fn matches(&self, user: &User) -> bool {
        if self.role.is_some_and(|role| role != user.role) {
            return false;
        }
        let Some(term) = self.q.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
            return true;
        };
        let term = term.to_lowercase();
        [&user.full_name, &user.email, &user.id]
            .iter()
            .any(|field| field.to_lowercase().contains(&term))
    }
}

/// Admins see everyone; others see themselves and the people they review.
pub async fn list(state: &AppState, actor: &User, filter: &UserFilter) -> Result<Vec<User>, AppError> {
    let mut users = db::fetch_all::<User>(state.store()).await?;
    if actor.role != UserRole::Admin {
        users.retain(|u| u.id == actor.id || u.evaluator_id.as_deref() == Some(actor.id.as_str()));
    }
    users.retain(|u| filter.matches(u));
    users.sort_by(|a, b| a.full_name.cmp(&b.full_name));
    Ok(users)
}

pub async fn get(state: &AppState, actor: &User, id: &str) -> Result<User, AppError> {
    let user = db::fetch::<User>(state.store(), id)
        .await?
        .ok_or_else(|| AppError::not_found("user", id))?;
    let visible = actor.role == UserRole::Admin
        || user.id == actor.id
        || user.evaluator_id.as_deref() == Some(actor.id.as_str());
    if !visible {
        return Err(AppError::forbidden("not allowed to view this user"));
    }
    Ok(user)
}

pub async fn create(
    state: &AppState,
    actor: &User,
    input: UserInput,
    now: DateTime<Utc>,
) -> Result<User, AppError> {
    require_role(actor, UserRole::Admin)?;

    let mut user = User {
        id: format!("user-{}", Uuid::new_v4().simple()),
        full_name: String::new(),
        email: String::new(),
        role: UserRole::Employee,
        position: String::new(),
        department: None,
        evaluator_id: None,
        created_at: now,
        updated_at: now,
    };
    input.apply(&mut user);

    let existing = db::fetch_all::<User>(state.store()).await?;
    let mut errors = validate_user(&user, &existing);
    check_position(state, &user, &mut errors);
    AppError::check(errors)?;

    db::insert(state.store(), &user).await?;
    tracing::info!(user = %user.id, actor = %actor.id, "User created");
    Ok(user)
}

pub async fn update(
    state: &AppState,
    actor: &User,
    id: &str,
    input: UserInput,
    now: DateTime<Utc>,
) -> Result<User, AppError> {
    require_role(actor, UserRole::Admin)?;

    let existing = db::fetch_all::<User>(state.store()).await?;
    let mut user = existing
        .iter()
        .find(|u| u.id == id)
        .cloned()
        .ok_or_else(|| AppError::not_found("user", id))?;
    input.apply(&mut user);
    user.updated_at = now;

    let mut errors = validate_user(&user, &existing);
    check_position(state, &user, &mut errors);
    if user.role == UserRole::Employee {
        let reports = existing
            .iter()
            .filter(|u| u.evaluator_id.as_deref() == Some(id))
            .count();
        if reports > 0 {
            errors.push(format!(
                "'{}' still evaluates {reports} users and cannot become an employee",
                user.full_name
            ));
        }
    }
    AppError::check(errors)?;

    db::save(state.store(), &user).await?;
    tracing::info!(user = %user.id, actor = %actor.id, "User updated");
    Ok(user)
}

/// Refuses to remove the actor or anyone still assigned as an evaluator.
/// Stored evaluations of the removed user stay as history.
pub async fn delete(state: &AppState, actor: &User, id: &str) -> Result<(), AppError> {
    require_role(actor, UserRole::Admin)?;
    if actor.id == id {
        return Err(AppError::Validation(vec!["you cannot delete yourself".to_string()]));
    }

    let existing = db::fetch_all::<User>(state.store()).await?;
    let user = existing
        .iter()
        .find(|u| u.id == id)
        .ok_or_else(|| AppError::not_found("user", id))?;
    let reports = existing
        .iter()
        .filter(|u| u.evaluator_id.as_deref() == Some(id))
        .count();
    if reports > 0 {
        return Err(AppError::Validation(vec![format!(
            "cannot delete '{}': they are the evaluator of {reports} users",
            user.full_name
        )]));
    }

    db::remove::<User>(state.store(), id).await?;
    let kept = db::evaluations_for_user(state.store(), id).await?.len();
    tracing::info!(user = %id, actor = %actor.id, kept_evaluations = kept, "User deleted");
    Ok(())
}
