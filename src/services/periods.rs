use crate::auth::require_role;
use crate::db;
use crate::domain::models::{Evaluation, EvaluationPeriod, User, UserRole};
use crate::domain::validation::validate_period;
use crate::error::AppError;
use crate::state::AppState;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct PeriodInput {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub evaluation_deadline: Option<NaiveDate>,
    #[serde(default)]
    pub review_deadline: Option<NaiveDate>,
}

/// Newest first.
pub async fn list(state: &AppState) -> Result<Vec<EvaluationPeriod>, AppError> {
    let mut periods = db::fetch_all::<EvaluationPeriod>(state.store()).await?;
    periods.sort_by(|a, b| b.start_date.cmp(&a.start_date));
    Ok(periods)
}

pub async fn get(state: &AppState, id: &str) -> Result<EvaluationPeriod, AppError> {
    db::fetch::<EvaluationPeriod>(state.store(), id)
        .await?
        .ok_or_else(|| AppError::not_found("period", id))
}

pub async fn active(state: &AppState) -> Result<Option<EvaluationPeriod>, AppError> {
    Ok(db::active_period(state.store()).await?)
}

pub async fn create(
    state: &AppState,
    actor: &User,
    input: PeriodInput,
    now: DateTime<Utc>,
) -> Result<EvaluationPeriod, AppError> {
    require_role(actor, UserRole::Admin)?;

    let period = EvaluationPeriod {
        id: format!("period-{}", Uuid::new_v4().simple()),
        name: input.name.trim().to_string(),
        start_date: input.start_date,
        end_date: input.end_date,
        is_active: input.is_active,
        evaluation_deadline: input.evaluation_deadline,
        review_deadline: input.review_deadline,
        created_at: now,
        updated_at: now,
    };
    let existing = db::fetch_all::<EvaluationPeriod>(state.store()).await?;
    AppError::check(validate_period(&period, &existing))?;

    db::insert(state.store(), &period).await?;
    tracing::info!(period = %period.id, actor = %actor.id, "Period created");
    Ok(period)
}

pub async fn update(
    state: &AppState,
    actor: &User,
    id: &str,
    input: PeriodInput,
    now: DateTime<Utc>,
) -> Result<EvaluationPeriod, AppError> {
    require_role(actor, UserRole::Admin)?;

    let existing = db::fetch_all::<EvaluationPeriod>(state.store()).await?;
    let mut period = existing
        .iter()
        .find(|p| p.id == id)
        .cloned()
        .ok_or_else(|| AppError::not_found("period", id))?;
    period.name = input.name.trim().to_string();
    period.start_date = input.start_date;
    period.end_date = input.end_date;
    period.is_active = input.is_active;
    period.evaluation_deadline = input.evaluation_deadline;
    period.review_deadline = input.review_deadline;
    period.updated_at = now;
    AppError::check(validate_period(&period, &existing))?;

    db::save(state.store(), &period).await?;
    tracing::info!(period = %period.id, actor = %actor.id, "Period updated");
    Ok(period)
}

async fn set_active(
    state: &AppState,
    actor: &User,
    id: &str,
    active: bool,
    now: DateTime<Utc>,
) -> Result<EvaluationPeriod, AppError> {
    require_role(actor, UserRole::Admin)?;

    let existing = db::fetch_all::<EvaluationPeriod>(state.store()).await?;
    let mut period = existing
        .iter()
        .find(|p| p.id == id)
        .cloned()
        .ok_or_else(|| AppError::not_found("period", id))?;
    period.is_active = active;
    period.updated_at = now;
    AppError::check(validate_period(&period, &existing))?;

    db::save(state.store(), &period).await?;
    tracing::info!(period = %period.id, actor = %actor.id, active, "Period activation changed");
    Ok(period)
}

/// Never deactivates another period implicitly; a second active period is
/// a validation error.
pub async fn activate(
    state: &AppState,
    actor: &User,
    id: &str,
    now: DateTime<Utc>,
) -> Result<EvaluationPeriod, AppError> {
    set_active(state, actor, id, true, now).await
}

pub async fn deactivate(
    state: &AppState,
    actor: &User,
    id: &str,
    now: DateTime<Utc>,
) -> Result<EvaluationPeriod, AppError> {
    set_active(state, actor, id, false, now).await
}

/// Periods that already hold evaluations are kept.
pub async fn delete(state: &AppState, actor: &User, id: &str) -> Result<(), AppError> {
    require_role(actor, UserRole::Admin)?;

    let period = get(state, id).await?;
    let evaluations = db::fetch_all::<Evaluation>(state.store())
        .await?
        .into_iter()
        .filter(|e| e.period_id == id)
        .count();
    if evaluations > 0 {
        return Err(AppError::Validation(vec![format!(
            "period '{}' has {evaluations} evaluations and cannot be deleted",
            period.name
        )]));
    }

    db::remove::<EvaluationPeriod>(state.store(), id).await?;
    tracing::info!(period = %id, actor = %actor.id, "Period deleted");
    Ok(())
}
