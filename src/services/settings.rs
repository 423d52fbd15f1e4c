use crate::auth::require_role;
use crate::db;
use crate::domain::models::{Evaluation, EvaluationPeriod, EvaluationStatus, Setting, User, UserRole};
use crate::error::AppError;
use crate::state::AppState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Written by seeding and never through the API.
const READ_ONLY_KEYS: [&str; 2] = ["app_version", "last_seeded"];

pub fn defaults() -> BTreeMap<String, Value> {
    BTreeMap::from([
        ("theme".to_string(), json!("default")),
        ("language".to_string(), json!("ja")),
        ("items_per_page".to_string(), json!(10)),
        ("auto_save".to_string(), json!(true)),
        ("notifications".to_string(), json!(true)),
    ])
}

fn check_value(key: &str, value: &Value) -> Result<(), String> {
    let ok = match key {
        "theme" | "language" => value.as_str().is_some_and(|s| !s.trim().is_empty()),
        "items_per_page" => value.as_u64().is_some_and(|n| (1..=100).contains(&n)),
        "auto_save" | "notifications" => value.is_boolean(),
        _ => true,
    };
    if ok {
        Ok(())
    } else {
        Err(format!("invalid value for setting '{key}': {value}"))
    }
}

/// Defaults overlaid with every stored setting.
pub async fn all(state: &AppState) -> Result<BTreeMap<String, Value>, AppError> {
    let mut settings = defaults();
    for setting in db::fetch_all::<Setting>(state.store()).await? {
        settings.insert(setting.key, setting.value);
    }
    Ok(settings)
}

pub async fn get(state: &AppState, key: &str) -> Result<Value, AppError> {
    if let Some(setting) = db::fetch::<Setting>(state.store(), key).await? {
        return Ok(setting.value);
    }
    defaults()
        .remove(key)
        .ok_or_else(|| AppError::not_found("setting", key))
}

pub async fn set(
    state: &AppState,
    actor: &User,
    key: &str,
    value: Value,
    now: DateTime<Utc>,
) -> Result<Setting, AppError> {
    require_role(actor, UserRole::Admin)?;

    let key = key.trim();
    if key.is_empty() {
        return Err(AppError::Validation(vec!["setting key is required".to_string()]));
    }
    if READ_ONLY_KEYS.contains(&key) {
        return Err(AppError::Validation(vec![format!("setting '{key}' is read-only")]));
    }
    check_value(key, &value).map_err(|message| AppError::Validation(vec![message]))?;

    let setting = Setting {
        key: key.to_string(),
        value,
        updated_at: now,
    };
    db::save(state.store(), &setting).await?;
    tracing::info!(key = %setting.key, actor = %actor.id, "Setting updated");
    Ok(setting)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Statistics {
    pub periods: usize,
    pub active_period: Option<String>,
    pub categories: usize,
    pub users: usize,
    pub users_by_role: BTreeMap<&'static str, usize>,
    /// Users that have an assigned evaluator.
    pub users_with_evaluator: usize,
    pub evaluations: usize,
    pub by_status: BTreeMap<&'static str, usize>,
}

pub async fn statistics(state: &AppState) -> Result<Statistics, AppError> {
    let periods = db::fetch_all::<EvaluationPeriod>(state.store()).await?;
    let evaluations = db::fetch_all::<Evaluation>(state.store()).await?;
    let users = db::fetch_all::<User>(state.store()).await?;

    let mut users_by_role: BTreeMap<&'static str, usize> =
        [UserRole::Admin, UserRole::Evaluator, UserRole::Employee]
            .into_iter()
            .map(|role| (role.as_str(), 0))
            .collect();
    for user in &users {
        *users_by_role.entry(user.role.as_str()).or_default() += 1;
    }

    let mut by_status: BTreeMap<&'static str, usize> = [
        EvaluationStatus::NotStarted,
        EvaluationStatus::Draft,
        EvaluationStatus::Submitted,
        EvaluationStatus::ApprovedByEvaluator,
        EvaluationStatus::ApprovedByAdmin,
    ]
    .into_iter()
    .map(|status| (status.as_str(), 0))
    .collect();
    for evaluation in &evaluations {
        *by_status.entry(evaluation.status.as_str()).or_default() += 1;
    }

    Ok(Statistics {
        periods: periods.len(),
        active_period: periods.iter().find(|p| p.is_active).map(|p| p.name.clone()),
        categories: state.config().evaluation_categories(None).len(),
        users: users.len(),
        users_by_role,
        users_with_evaluator: users.iter().filter(|u| u.evaluator_id.is_some()).count(),
        evaluations: evaluations.len(),
        by_status,
    })
}
