//! Evaluation workflow: lazy open, save/submit, approvals and overviews.
//!
//! Every write follows the same order: build the next version of the
//! record from the stored one, validate it, store it, and only then hand
//! it back. A failed write leaves the stored record as it was.

use crate::db;
use crate::domain::models::{
    Evaluation, EvaluationPeriod, EvaluationStatus, User, UserRole,
};
use crate::domain::scoring::{score_summary, ScoreSummary};
use crate::domain::validation::validate_evaluation;
use crate::domain::workflow::{
    self, apply_changes, evaluator_fields_editable, relation, self_fields_editable,
    status_after_save, EvaluationChanges, Relation,
};
use crate::error::AppError;
use crate::state::AppState;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationView {
    pub evaluation: Evaluation,
    /// False for a lazily created evaluation that has never been saved.
    pub persisted: bool,
    pub scores: ScoreSummary,
    pub can_edit_self: bool,
    pub can_edit_evaluator: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationSummary {
    pub id: String,
    pub user_id: String,
    pub period_id: String,
    pub period_name: Option<String>,
    pub status: EvaluationStatus,
    pub updated_at: DateTime<Utc>,
    pub scores: ScoreSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubordinateRow {
    pub user: User,
    pub evaluation_id: Option<String>,
    pub status: EvaluationStatus,
    pub scores: Option<ScoreSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubordinateOverview {
    pub period: Option<EvaluationPeriod>,
    pub rows: Vec<SubordinateRow>,
}

async fn load_user(state: &AppState, user_id: &str) -> Result<User, AppError> {
    db::fetch::<User>(state.store(), user_id)
        .await?
        .ok_or_else(|| AppError::not_found("user", user_id))
}

async fn load_period(state: &AppState, period_id: &str) -> Result<EvaluationPeriod, AppError> {
    db::fetch::<EvaluationPeriod>(state.store(), period_id)
        .await?
        .ok_or_else(|| AppError::not_found("period", period_id))
}

fn view(state: &AppState, evaluation: Evaluation, persisted: bool, relation: Relation) -> EvaluationView {
    let categories = state
        .config()
        .evaluation_categories(Some(&evaluation.position));
    let scores = score_summary(&evaluation, &categories);
    let read_only = evaluation.is_read_only();
    EvaluationView {
        can_edit_self: !read_only
            && relation == Relation::Owner
            && self_fields_editable(evaluation.status),
        can_edit_evaluator: !read_only
            && matches!(relation, Relation::AssignedEvaluator | Relation::Admin)
            && evaluator_fields_editable(evaluation.status),
        evaluation,
        persisted,
        scores,
    }
}

fn visible_relation(actor: &User, owner: &User) -> Result<Relation, AppError> {
    let relation = relation(actor, owner);
    if relation.can_view() {
        Ok(relation)
    } else {
        Err(AppError::forbidden(format!(
            "not allowed to view evaluations of '{}'",
            owner.id
        )))
    }
}

/// Returns the stored evaluation, or a fresh unsaved one for the pair.
pub async fn open_evaluation(
    state: &AppState,
    actor: &User,
    user_id: &str,
    period_id: &str,
    now: DateTime<Utc>,
) -> Result<EvaluationView, AppError> {
    let owner = load_user(state, user_id).await?;
    let relation = visible_relation(actor, &owner)?;
    load_period(state, period_id).await?;

    let id = Evaluation::id_for(user_id, period_id);
    let view = match db::fetch::<Evaluation>(state.store(), &id).await? {
        Some(evaluation) => view(state, evaluation, true, relation),
        None => view(state, Evaluation::blank(&owner, period_id, now), false, relation),
    };
    Ok(view)
}

/// Saves the actor's side of the form; `submit` also hands it in.
pub async fn save(
    state: &AppState,
    actor: &User,
    user_id: &str,
    period_id: &str,
    changes: &EvaluationChanges,
    submit: bool,
    now: DateTime<Utc>,
) -> Result<EvaluationView, AppError> {
    let owner = load_user(state, user_id).await?;
    let relation = visible_relation(actor, &owner)?;
    load_period(state, period_id).await?;

    if submit && relation != Relation::Owner {
        return Err(AppError::forbidden("only the evaluated user can submit"));
    }

    let id = Evaluation::id_for(user_id, period_id);
    let current = db::fetch::<Evaluation>(state.store(), &id)
        .await?
        .unwrap_or_else(|| Evaluation::blank(&owner, period_id, now));

    let mut next = apply_changes(&current, changes, relation)?;
    let target = status_after_save(current.status, submit)?;
    if target == next.status {
        next.updated_at = now;
    } else {
        workflow::transition(&mut next, target, now)?;
    }

    let categories = state.config().evaluation_categories(Some(&next.position));
    AppError::check(validate_evaluation(&next, &categories))?;

    db::save(state.store(), &next).await?;
    tracing::info!(
        evaluation = %next.id,
        actor = %actor.id,
        status = %next.status,
        "Evaluation saved"
    );
    Ok(view(state, next, true, relation))
}

async fn approve(
    state: &AppState,
    actor: &User,
    user_id: &str,
    period_id: &str,
    target: EvaluationStatus,
    now: DateTime<Utc>,
) -> Result<EvaluationView, AppError> {
    let owner = load_user(state, user_id).await?;
    let relation = visible_relation(actor, &owner)?;

    let allowed = match target {
        EvaluationStatus::ApprovedByEvaluator => {
            matches!(relation, Relation::AssignedEvaluator | Relation::Admin)
        }
        _ => relation != Relation::Owner && actor.role == UserRole::Admin,
    };
    if !allowed {
        return Err(AppError::forbidden(format!("not allowed to set {target}")));
    }

    let id = Evaluation::id_for(user_id, period_id);
    let mut evaluation = db::fetch::<Evaluation>(state.store(), &id)
        .await?
        .ok_or_else(|| AppError::not_found("evaluation", id.as_str()))?;
    workflow::transition(&mut evaluation, target, now)?;

    db::save(state.store(), &evaluation).await?;
    tracing::info!(evaluation = %evaluation.id, actor = %actor.id, status = %target, "Evaluation approved");
    Ok(view(state, evaluation, true, relation))
}

/// `submitted → approved_by_evaluator`, by the assigned evaluator or an admin.
pub async fn approve_by_evaluator(
    state: &AppState,
    actor: &User,
    user_id: &str,
    period_id: &str,
    now: DateTime<Utc>,
) -> Result<EvaluationView, AppError> {
    approve(state, actor, user_id, period_id, EvaluationStatus::ApprovedByEvaluator, now).await
}

/// `approved_by_evaluator → approved_by_admin`. The record is read-only afterwards.
pub async fn approve_by_admin(
    state: &AppState,
    actor: &User,
    user_id: &str,
    period_id: &str,
    now: DateTime<Utc>,
) -> Result<EvaluationView, AppError> {
    approve(state, actor, user_id, period_id, EvaluationStatus::ApprovedByAdmin, now).await
}

fn summarize(
    state: &AppState,
    evaluation: &Evaluation,
    periods: &[EvaluationPeriod],
) -> EvaluationSummary {
    let categories = state.config().evaluation_categories(Some(&evaluation.position));
    EvaluationSummary {
        id: evaluation.id.clone(),
        user_id: evaluation.user_id.clone(),
        period_id: evaluation.period_id.clone(),
        period_name: periods
            .iter()
            .find(|p| p.id == evaluation.period_id)
            .map(|p| p.name.clone()),
        status: evaluation.status,
        updated_at: evaluation.updated_at,
        scores: score_summary(evaluation, &categories),
    }
}

/// Stored evaluations of one user, newest first.
pub async fn list_for_user(
    state: &AppState,
    actor: &User,
    user_id: &str,
    period_id: Option<&str>,
) -> Result<Vec<EvaluationSummary>, AppError> {
    let owner = load_user(state, user_id).await?;
    visible_relation(actor, &owner)?;

    let periods = db::fetch_all::<EvaluationPeriod>(state.store()).await?;
    let evaluations = db::evaluations_for_user(state.store(), user_id).await?;
    Ok(evaluations
        .iter()
        .filter(|e| period_id.map_or(true, |p| e.period_id == p))
        .map(|e| summarize(state, e, &periods))
        .collect())
}

/// Every stored evaluation, admin only.
pub async fn list_all(
    state: &AppState,
    actor: &User,
    period_id: Option<&str>,
) -> Result<Vec<EvaluationSummary>, AppError> {
    crate::auth::require_role(actor, UserRole::Admin)?;

    let periods = db::fetch_all::<EvaluationPeriod>(state.store()).await?;
    let mut evaluations = db::fetch_all::<Evaluation>(state.store()).await?;
    evaluations.retain(|e| period_id.map_or(true, |p| e.period_id == p));
    evaluations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    Ok(evaluations
        .iter()
        .map(|e| summarize(state, e, &periods))
        .collect())
}

/// Status of everyone the actor reviews in the active period. Admins see
/// every other user.
pub async fn subordinates(state: &AppState, actor: &User) -> Result<SubordinateOverview, AppError> {
    crate::auth::require_role(actor, UserRole::Evaluator)?;

    let users = db::fetch_all::<User>(state.store()).await?;
    let mut reports: Vec<User> = users
        .into_iter()
        .filter(|u| u.id != actor.id)
        .filter(|u| {
            actor.role == UserRole::Admin || u.evaluator_id.as_deref() == Some(actor.id.as_str())
        })
        .collect();
    reports.sort_by(|a, b| a.full_name.cmp(&b.full_name));

    let Some(period) = db::active_period(state.store()).await? else {
        return Ok(SubordinateOverview {
            period: None,
            rows: Vec::new(),
        });
    };

    let mut rows = Vec::with_capacity(reports.len());
    for user in reports {
        let id = Evaluation::id_for(&user.id, &period.id);
        let stored = db::fetch::<Evaluation>(state.store(), &id).await?;
        let row = match stored {
            Some(evaluation) => {
                let categories = state.config().evaluation_categories(Some(&evaluation.position));
                SubordinateRow {
                    status: evaluation.status,
                    scores: Some(score_summary(&evaluation, &categories)),
                    evaluation_id: Some(evaluation.id),
                    user,
                }
            }
            None => SubordinateRow {
                user,
                evaluation_id: None,
                status: EvaluationStatus::NotStarted,
                scores: None,
            },
        };
        rows.push(row);
    }

    Ok(SubordinateOverview {
        period: Some(period),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Collection, MemoryStore, RecordStore, StoreError};
    use crate::domain::workflow::{GoalEntry, RatingEntry};
    use crate::state::test_support::{seeded_state, state_with};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    const PERIOD: &str = "period-2025-h2";

    async fn user(state: &AppState, id: &str) -> User {
        db::fetch::<User>(state.store(), id).await.unwrap().unwrap()
    }

    fn full_changes() -> EvaluationChanges {
        let mut changes = EvaluationChanges::default();
        changes.quantitative.insert(
            "floor-tile".to_string(),
            RatingEntry { rating: Some(3), comment: "steady".to_string() },
        );
        changes.qualitative = Some(vec![
            GoalEntry { id: Some("g1".into()), content: "Zero accidents".into(), weight: 60, rating: Some(4), ..Default::default() },
            GoalEntry { id: Some("g2".into()), content: "Mentor juniors".into(), weight: 40, rating: Some(3), ..Default::default() },
        ]);
        changes
    }

    #[tokio::test]
    async fn opening_creates_lazily_without_persisting() {
        let state = seeded_state().await;
        let worker = user(&state, "worker1").await;

        let view = open_evaluation(&state, &worker, "worker1", PERIOD, Utc::now()).await.unwrap();
        assert!(!view.persisted);
        assert_eq!(view.evaluation.status, EvaluationStatus::NotStarted);
        assert!(view.can_edit_self);
        assert!(!view.can_edit_evaluator);

        let stored = db::fetch::<Evaluation>(state.store(), &view.evaluation.id).await.unwrap();
        assert!(stored.is_none());
    }

    #[tokio::test]
    async fn outsiders_cannot_open() {
        let state = seeded_state().await;
        let sales = user(&state, "sales1").await;
        let err = open_evaluation(&state, &sales, "worker1", PERIOD, Utc::now()).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = open_evaluation(&state, &sales, "sales1", "period-missing", Utc::now()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { kind: "period", .. }));
    }

    #[tokio::test]
    async fn full_workflow_to_read_only() {
        let state = seeded_state().await;
        let worker = user(&state, "worker1").await;
        let manager = user(&state, "manager").await;
        let admin = user(&state, "admin").await;

        let draft = save(&state, &worker, "worker1", PERIOD, &full_changes(), false, Utc::now()).await.unwrap();
        assert_eq!(draft.evaluation.status, EvaluationStatus::Draft);
        assert!(draft.persisted);

        let submitted = save(&state, &worker, "worker1", PERIOD, &full_changes(), true, Utc::now()).await.unwrap();
        assert_eq!(submitted.evaluation.status, EvaluationStatus::Submitted);
        assert!(submitted.evaluation.submitted_at.is_some());

        let mut review = EvaluationChanges::default();
        review.quantitative.insert("floor-tile".into(), RatingEntry { rating: Some(4), comment: String::new() });
        let reviewed = save(&state, &manager, "worker1", PERIOD, &review, false, Utc::now()).await.unwrap();
        assert_eq!(reviewed.evaluation.status, EvaluationStatus::Submitted);
        assert_eq!(reviewed.evaluation.quantitative["floor-tile"].self_rating, Some(3));
        assert_eq!(reviewed.evaluation.quantitative["floor-tile"].evaluator_rating, Some(4));

        let err = approve_by_admin(&state, &admin, "worker1", PERIOD, Utc::now()).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));

        approve_by_evaluator(&state, &manager, "worker1", PERIOD, Utc::now()).await.unwrap();
        let done = approve_by_admin(&state, &admin, "worker1", PERIOD, Utc::now()).await.unwrap();
        assert_eq!(done.evaluation.status, EvaluationStatus::ApprovedByAdmin);
        assert!(!done.can_edit_evaluator && !done.can_edit_self);

        let err = save(&state, &admin, "worker1", PERIOD, &review, false, Utc::now()).await.unwrap_err();
        assert!(matches!(err, AppError::ReadOnly));
    }

    #[tokio::test]
    async fn empty_submission_reports_both_sections() {
        let state = seeded_state().await;
        let worker = user(&state, "worker1").await;
        let err = save(&state, &worker, "worker1", PERIOD, &EvaluationChanges::default(), true, Utc::now())
            .await
            .unwrap_err();
        let AppError::Validation(errors) = err else {
            panic!("expected a validation error");
        };
        assert!(errors.contains(&"quantitative ratings are missing".to_string()));
        assert!(errors.contains(&"qualitative goals are missing".to_string()));

        let stored = db::fetch::<Evaluation>(state.store(), "eval-worker1-period-2025-h2").await.unwrap();
        assert!(stored.is_none());
    }

    #[tokio::test]
    async fn bad_weights_block_even_drafts() {
        let state = seeded_state().await;
        let worker = user(&state, "worker1").await;
        let mut changes = full_changes();
        if let Some(goals) = changes.qualitative.as_mut() {
            goals[1].weight = 20;
        }
        let err = save(&state, &worker, "worker1", PERIOD, &changes, false, Utc::now()).await.unwrap_err();
        assert!(err.to_string().contains("currently 80%"), "{err}");
    }

    #[tokio::test]
    async fn only_owners_submit_and_employees_cannot_approve() {
        let state = seeded_state().await;
        let manager = user(&state, "manager").await;
        let worker = user(&state, "worker1").await;
        let err = save(&state, &manager, "worker1", PERIOD, &full_changes(), true, Utc::now()).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        save(&state, &worker, "worker1", PERIOD, &full_changes(), true, Utc::now()).await.unwrap();
        let err = approve_by_evaluator(&state, &worker, "worker1", PERIOD, Utc::now()).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn listing_and_subordinates() {
        let state = seeded_state().await;
        let manager = user(&state, "manager").await;
        let employee = user(&state, "employee").await;

        let listed = list_for_user(&state, &employee, "employee", None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].period_name.as_deref(), Some("2025 H2"));

        let overview = subordinates(&state, &manager).await.unwrap();
        assert_eq!(overview.period.unwrap().id, PERIOD);
        let ids: Vec<_> = overview.rows.iter().map(|r| r.user.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"employee") && ids.contains(&"worker1"));
        let employee_row = overview.rows.iter().find(|r| r.user.id == "employee").unwrap();
        assert_eq!(employee_row.status, EvaluationStatus::Draft);

        assert!(matches!(subordinates(&state, &employee).await, Err(AppError::Forbidden(_))));
        assert!(matches!(list_all(&state, &manager, None).await, Err(AppError::Forbidden(_))));
    }

    /// Reads from memory, fails writes on demand.
    struct FlakyStore {
        inner: MemoryStore,
        fail_writes: AtomicBool,
    }

    #[async_trait]
    impl RecordStore for FlakyStore {
        async fn get(&self, c: Collection, k: &str) -> Result<Option<Value>, StoreError> {
            self.inner.get(c, k).await
        }
        async fn get_all(&self, c: Collection) -> Result<Vec<(String, Value)>, StoreError> {
            self.inner.get_all(c).await
        }
        async fn put(&self, c: Collection, k: &str, v: Value) -> Result<(), StoreError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Database(sqlx::Error::PoolClosed));
            }
            self.inner.put(c, k, v).await
        }
        async fn add(&self, c: Collection, k: &str, v: Value) -> Result<(), StoreError> {
            self.inner.add(c, k, v).await
        }
        async fn delete(&self, c: Collection, k: &str) -> Result<bool, StoreError> {
            self.inner.delete(c, k).await
        }
        async fn clear(&self, c: Collection) -> Result<(), StoreError> {
            self.inner.clear(c).await
        }
        async fn count(&self, c: Collection) -> Result<usize, StoreError> {
            self.inner.count(c).await
        }
    }

    #[tokio::test]
    async fn failed_writes_leave_the_stored_record_untouched() {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            fail_writes: AtomicBool::new(false),
        });
        let state = state_with(store.clone());
        db::seed::seed_all(state.store(), state.config(), Utc::now()).await.unwrap();
        let worker = user(&state, "worker1").await;

        let saved = save(&state, &worker, "worker1", PERIOD, &full_changes(), false, Utc::now()).await.unwrap();

        store.fail_writes.store(true, Ordering::SeqCst);
        let err = save(&state, &worker, "worker1", PERIOD, &full_changes(), true, Utc::now()).await.unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));

        let stored = db::fetch::<Evaluation>(state.store(), &saved.evaluation.id).await.unwrap().unwrap();
        assert_eq!(stored, saved.evaluation);
        assert_eq!(stored.status, EvaluationStatus::Draft);
    }
}
