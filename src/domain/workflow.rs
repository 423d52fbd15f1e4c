//! Evaluation status machine and field-level edit rules.

use crate::domain::models::{
    Evaluation, EvaluationStatus, QualitativeGoal, QuantitativeRating, User, UserRole,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("cannot move evaluation from {from} to {to}")]
    InvalidTransition {
        from: EvaluationStatus,
        to: EvaluationStatus,
    },
    #[error("evaluation has been approved by an admin and is read-only")]
    ReadOnly,
    #[error("not allowed to {0}")]
    Forbidden(&'static str),
    #[error("unknown qualitative goal '{0}'")]
    UnknownGoal(String),
}

/// How the acting user relates to the evaluated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Owner,
    AssignedEvaluator,
    Admin,
    Unrelated,
}

pub fn relation(actor: &User, owner: &User) -> Relation {
    if actor.id == owner.id {
        Relation::Owner
    } else if owner.evaluator_id.as_deref() == Some(actor.id.as_str()) {
        Relation::AssignedEvaluator
    } else if actor.role == UserRole::Admin {
        Relation::Admin
    } else {
        Relation::Unrelated
    }
}

impl Relation {
    pub fn can_view(&self) -> bool {
        !matches!(self, Relation::Unrelated)
    }

    fn reviews(&self) -> bool {
        matches!(self, Relation::AssignedEvaluator | Relation::Admin)
    }
}

pub fn can_transition(from: EvaluationStatus, to: EvaluationStatus) -> bool {
    use EvaluationStatus::*;
    matches!(
        (from, to),
        (NotStarted, Draft)
            | (Draft, Draft)
            | (NotStarted, Submitted)
            | (Draft, Submitted)
            | (Submitted, ApprovedByEvaluator)
            | (ApprovedByEvaluator, ApprovedByAdmin)
    )
}

/// Moves `evaluation` to `to`, stamping the matching timestamp.
pub fn transition(
    evaluation: &mut Evaluation,
    to: EvaluationStatus,
    now: DateTime<Utc>,
) -> Result<(), WorkflowError> {
    if evaluation.is_read_only() {
        return Err(WorkflowError::ReadOnly);
    }
    if !can_transition(evaluation.status, to) {
        return Err(WorkflowError::InvalidTransition {
            from: evaluation.status,
            to,
        });
    }
    match to {
        EvaluationStatus::Submitted => evaluation.submitted_at = Some(now),
        EvaluationStatus::ApprovedByEvaluator => evaluation.evaluator_approved_at = Some(now),
        EvaluationStatus::ApprovedByAdmin => evaluation.admin_approved_at = Some(now),
        EvaluationStatus::NotStarted | EvaluationStatus::Draft => {}
    }
    evaluation.status = to;
    evaluation.updated_at = now;
    Ok(())
}

pub fn self_fields_editable(status: EvaluationStatus) -> bool {
    matches!(status, EvaluationStatus::NotStarted | EvaluationStatus::Draft)
}

pub fn evaluator_fields_editable(status: EvaluationStatus) -> bool {
    matches!(
        status,
        EvaluationStatus::NotStarted | EvaluationStatus::Draft | EvaluationStatus::Submitted
    )
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RatingEntry {
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct GoalEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub comment: String,
}

/// What a user typed into the evaluation form. Whether the ratings land on
/// the self or the evaluator side depends on who sends them.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct EvaluationChanges {
    #[serde(default)]
    pub quantitative: BTreeMap<String, RatingEntry>,
    #[serde(default)]
    pub qualitative: Option<Vec<GoalEntry>>,
}

/// Produces the updated evaluation without touching `current`.
pub fn apply_changes(
    current: &Evaluation,
    changes: &EvaluationChanges,
    relation: Relation,
) -> Result<Evaluation, WorkflowError> {
    if current.is_read_only() {
        return Err(WorkflowError::ReadOnly);
    }

    let mut next = current.clone();
    match relation {
        Relation::Owner => {
            if !self_fields_editable(current.status) {
                return Err(WorkflowError::Forbidden("edit a submitted self-evaluation"));
            }
            for (item_id, entry) in &changes.quantitative {
                let slot = next.quantitative.entry(item_id.clone()).or_default();
                slot.self_rating = entry.rating;
                slot.self_comment = entry.comment.clone();
            }
            if let Some(goals) = &changes.qualitative {
                next.qualitative = goals
                    .iter()
                    .map(|entry| owner_goal(current, entry))
                    .collect();
            }
        }
        reviewer if reviewer.reviews() => {
            if !evaluator_fields_editable(current.status) {
                return Err(WorkflowError::Forbidden("change evaluator ratings after approval"));
            }
            for (item_id, entry) in &changes.quantitative {
                let slot: &mut QuantitativeRating = next.quantitative.entry(item_id.clone()).or_default();
                slot.evaluator_rating = entry.rating;
                slot.evaluator_comment = entry.comment.clone();
            }
            if let Some(goals) = &changes.qualitative {
                for entry in goals {
                    let id = entry.id.as_deref().unwrap_or_default();
                    let goal = next
                        .qualitative
                        .iter_mut()
                        .find(|goal| goal.id == id)
                        .ok_or_else(|| WorkflowError::UnknownGoal(id.to_string()))?;
                    goal.evaluator_rating = entry.rating;
                    goal.evaluator_comment = entry.comment.clone();
                }
            }
        }
        _ => return Err(WorkflowError::Forbidden("edit this evaluation")),
    }
    Ok(next)
}

fn owner_goal(current: &Evaluation, entry: &GoalEntry) -> QualitativeGoal {
    let existing = entry
        .id
        .as_deref()
        .and_then(|id| current.qualitative.iter().find(|goal| goal.id == id));

    QualitativeGoal {
        id: entry
            .id
            .clone()
            .unwrap_or_else(|| format!("qual-{}", Uuid::new_v4())),
        content: entry.content.clone(),
        weight: entry.weight,
        self_rating: entry.rating,
        self_comment: entry.comment.clone(),
        evaluator_rating: existing.and_then(|goal| goal.evaluator_rating),
        evaluator_comment: existing
            .map(|goal| goal.evaluator_comment.clone())
            .unwrap_or_default(),
    }
}

/// Status a save should land on. Saving without submitting never moves an
/// evaluation backward, so a reviewer saving a submitted evaluation keeps
/// it submitted.
pub fn status_after_save(
    current: EvaluationStatus,
    submit: bool,
) -> Result<EvaluationStatus, WorkflowError> {
    let target = if submit {
        EvaluationStatus::Submitted
    } else if self_fields_editable(current) {
        EvaluationStatus::Draft
    } else {
        current
    };

    if target == current && current == EvaluationStatus::Submitted {
        return Ok(current);
    }
    if can_transition(current, target) {
        Ok(target)
    } else {
        Err(WorkflowError::InvalidTransition { from: current, to: target })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use EvaluationStatus::*;

    fn user(id: &str, role: UserRole, evaluator: Option<&str>) -> User {
        User {
            id: id.to_string(),
            full_name: id.to_string(),
            email: format!("{id}@demo.com"),
            role,
            position: "Site Worker".to_string(),
            department: None,
            evaluator_id: evaluator.map(str::to_string),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn fixture() -> (User, User, User, Evaluation) {
        let admin = user("admin", UserRole::Admin, None);
        let manager = user("manager", UserRole::Evaluator, Some("admin"));
        let worker = user("worker", UserRole::Employee, Some("manager"));
        let evaluation = Evaluation::blank(&worker, "period-b", Utc::now());
        (admin, manager, worker, evaluation)
    }

    #[test]
    fn forward_transitions_only() {
        assert!(can_transition(NotStarted, Draft));
        assert!(can_transition(Draft, Draft));
        assert!(can_transition(Draft, Submitted));
        assert!(can_transition(Submitted, ApprovedByEvaluator));
        assert!(can_transition(ApprovedByEvaluator, ApprovedByAdmin));

        assert!(!can_transition(Submitted, Draft));
        assert!(!can_transition(Draft, ApprovedByEvaluator));
        assert!(!can_transition(ApprovedByAdmin, ApprovedByAdmin));
        assert!(!can_transition(ApprovedByEvaluator, Submitted));
    }

    #[test]
    fn transition_stamps_timestamps_and_locks_after_admin() {
        let (_, _, _, mut evaluation) = fixture();
        let now = Utc::now();
        transition(&mut evaluation, Draft, now).unwrap();
        transition(&mut evaluation, Submitted, now).unwrap();
        assert_eq!(evaluation.submitted_at, Some(now));
        transition(&mut evaluation, ApprovedByEvaluator, now).unwrap();
        transition(&mut evaluation, ApprovedByAdmin, now).unwrap();
        assert!(evaluation.is_read_only());
        assert_eq!(transition(&mut evaluation, Draft, now), Err(WorkflowError::ReadOnly));
    }

    #[test]
    fn invalid_transition_reports_both_ends() {
        let (_, _, _, mut evaluation) = fixture();
        let err = transition(&mut evaluation, ApprovedByAdmin, Utc::now()).unwrap_err();
        assert_eq!(err, WorkflowError::InvalidTransition { from: NotStarted, to: ApprovedByAdmin });
    }

    #[test]
    fn relations() {
        let (admin, manager, worker, _) = fixture();
        let outsider = user("sales1", UserRole::Employee, Some("admin"));
        assert_eq!(relation(&worker, &worker), Relation::Owner);
        assert_eq!(relation(&manager, &worker), Relation::AssignedEvaluator);
        assert_eq!(relation(&admin, &worker), Relation::Admin);
        assert_eq!(relation(&outsider, &worker), Relation::Unrelated);
    }

    #[test]
    fn owner_edits_self_side_and_keeps_evaluator_side() {
        let (_, _, _, mut evaluation) = fixture();
        evaluation.quantitative.insert(
            "floor-tile".to_string(),
            QuantitativeRating {
                evaluator_rating: Some(4),
                ..Default::default()
            },
        );
        evaluation.qualitative.push(QualitativeGoal {
            id: "goal-1".to_string(),
            content: "old".to_string(),
            weight: 100,
            evaluator_rating: Some(3),
            ..Default::default()
        });

        let mut changes = EvaluationChanges::default();
        changes.quantitative.insert(
            "floor-tile".to_string(),
            RatingEntry { rating: Some(2), comment: "ok".to_string() },
        );
        changes.qualitative = Some(vec![
            GoalEntry {
                id: Some("goal-1".to_string()),
                content: "zero accidents".to_string(),
                weight: 60,
                rating: Some(4),
                comment: String::new(),
            },
            GoalEntry { content: "new goal".to_string(), weight: 40, ..Default::default() },
        ]);

        let next = apply_changes(&evaluation, &changes, Relation::Owner).unwrap();
        let rating = &next.quantitative["floor-tile"];
        assert_eq!(rating.self_rating, Some(2));
        assert_eq!(rating.evaluator_rating, Some(4));
        assert_eq!(next.qualitative.len(), 2);
        assert_eq!(next.qualitative[0].evaluator_rating, Some(3));
        assert_eq!(next.qualitative[0].self_rating, Some(4));
        assert!(next.qualitative[1].id.starts_with("qual-"));
        // the input evaluation is left as it was
        assert_eq!(evaluation.qualitative[0].content, "old");
    }

    #[test]
    fn reviewer_edits_evaluator_side_only() {
        let (_, _, _, mut evaluation) = fixture();
        evaluation.status = Submitted;
        evaluation.qualitative.push(QualitativeGoal {
            id: "goal-1".to_string(),
            weight: 100,
            self_rating: Some(5),
            ..Default::default()
        });

        let mut changes = EvaluationChanges::default();
        changes.quantitative.insert("floor-tile".to_string(), RatingEntry { rating: Some(3), comment: String::new() });
        changes.qualitative = Some(vec![GoalEntry {
            id: Some("goal-1".to_string()),
            rating: Some(2),
            ..Default::default()
        }]);

        let next = apply_changes(&evaluation, &changes, Relation::AssignedEvaluator).unwrap();
        assert_eq!(next.quantitative["floor-tile"].evaluator_rating, Some(3));
        assert_eq!(next.quantitative["floor-tile"].self_rating, None);
        assert_eq!(next.qualitative[0].self_rating, Some(5));
        assert_eq!(next.qualitative[0].evaluator_rating, Some(2));

        changes.qualitative = Some(vec![GoalEntry { id: Some("nope".to_string()), ..Default::default() }]);
        assert_eq!(
            apply_changes(&evaluation, &changes, Relation::Admin).unwrap_err(),
            WorkflowError::UnknownGoal("nope".to_string())
        );
    }

    #[test]
    fn owner_cannot_edit_after_submitting_and_outsiders_never() {
        let (_, _, _, mut evaluation) = fixture();
        let changes = EvaluationChanges::default();
        assert!(matches!(
            apply_changes(&evaluation, &changes, Relation::Unrelated),
            Err(WorkflowError::Forbidden(_))
        ));
        evaluation.status = Submitted;
        assert!(matches!(
            apply_changes(&evaluation, &changes, Relation::Owner),
            Err(WorkflowError::Forbidden(_))
        ));
        evaluation.status = ApprovedByAdmin;
        assert_eq!(
            apply_changes(&evaluation, &changes, Relation::Admin).unwrap_err(),
            WorkflowError::ReadOnly
        );
    }

    #[test]
    fn save_targets() {
        assert_eq!(status_after_save(NotStarted, false), Ok(Draft));
        assert_eq!(status_after_save(Draft, false), Ok(Draft));
        assert_eq!(status_after_save(Draft, true), Ok(Submitted));
        assert_eq!(status_after_save(Submitted, false), Ok(Submitted));
        assert!(status_after_save(Submitted, true).is_err());
        assert!(status_after_save(ApprovedByEvaluator, false).is_err());
    }
}
