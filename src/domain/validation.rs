//! Input rules for evaluations, users and evaluation periods.
//!
//! Every check returns a list of human-readable messages; an empty list
//! means the input is acceptable. Callers decide whether a non-empty list
//! blocks the operation.

use crate::domain::models::{
    Evaluation, EvaluationCategory, EvaluationPeriod, EvaluationStatus, QualitativeGoal,
    RatingScale, User, UserRole,
};

pub const REQUIRED_GOAL_WEIGHT: u64 = 100;
const MAX_NAME_LEN: usize = 100;
const MAX_EMAIL_LEN: usize = 255;

pub fn total_weight(goals: &[QualitativeGoal]) -> u64 {
    goals.iter().map(|goal| u64::from(goal.weight)).sum()
}

pub fn validate_qualitative_weights(goals: &[QualitativeGoal]) -> Vec<String> {
    let total = total_weight(goals);
    if total == REQUIRED_GOAL_WEIGHT {
        return Vec::new();
    }
    vec![format!(
        "qualitative goal weights must total 100% (currently {total}%)"
    )]
}

/// Completeness rules that only apply once an evaluation is submitted.
pub fn validate_submission(evaluation: &Evaluation) -> Vec<String> {
    if evaluation.status != EvaluationStatus::Submitted {
        return Vec::new();
    }

    let mut errors = Vec::new();
    let has_quantitative = evaluation
        .quantitative
        .values()
        .any(|rating| rating.self_rating.is_some() || rating.evaluator_rating.is_some());
    if !has_quantitative {
        errors.push("quantitative ratings are missing".to_string());
    }
    if evaluation.qualitative.is_empty() {
        errors.push("qualitative goals are missing".to_string());
    }
    errors
}

/// Range checks for every rating against the scale of the category that
/// owns the item.
pub fn validate_ratings(evaluation: &Evaluation, categories: &[EvaluationCategory]) -> Vec<String> {
    let mut errors = Vec::new();

    for (item_id, rating) in &evaluation.quantitative {
        let Some(category) = categories.iter().find(|c| c.has_item(item_id)) else {
            errors.push(format!("unknown evaluation item '{item_id}'"));
            continue;
        };
        for (label, value) in [("self", rating.self_rating), ("evaluator", rating.evaluator_rating)] {
            if let Some(value) = value {
                if !category.scale.contains(value) {
                    errors.push(format!(
                        "{label} rating for '{item_id}' must be between {} and {} (got {value})",
                        category.scale.min, category.scale.max
                    ));
                }
            }
        }
    }

    let scale = RatingScale::QUALITATIVE;
    for (index, goal) in evaluation.qualitative.iter().enumerate() {
        let number = index + 1;
        if goal.weight > 100 {
            errors.push(format!(
                "qualitative goal {number} weight must be between 0 and 100"
            ));
        }
        for (label, value) in [("self", goal.self_rating), ("evaluator", goal.evaluator_rating)] {
            if let Some(value) = value {
                if !scale.contains(value) {
                    errors.push(format!(
                        "qualitative goal {number} {label} rating must be between {} and {} (got {value})",
                        scale.min, scale.max
                    ));
                }
            }
        }
    }

    errors
}

/// Save-time check combining the weight, completeness and range rules.
///
/// The weight rule is skipped while no goal exists so that a draft can be
/// saved before any goal is written.
pub fn validate_evaluation(evaluation: &Evaluation, categories: &[EvaluationCategory]) -> Vec<String> {
    let mut errors = Vec::new();
    if !evaluation.qualitative.is_empty() {
        errors.extend(validate_qualitative_weights(&evaluation.qualitative));
    }
    errors.extend(validate_submission(evaluation));
    errors.extend(validate_ratings(evaluation, categories));
    if evaluation.status == EvaluationStatus::Submitted {
        for (index, goal) in evaluation.qualitative.iter().enumerate() {
            if goal.content.trim().is_empty() {
                errors.push(format!("qualitative goal {} has no content", index + 1));
            }
        }
    }
    errors
}

pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// `existing` is the full user list; the candidate itself may be part of
/// it when it is an update.
pub fn validate_user(user: &User, existing: &[User]) -> Vec<String> {
    let mut errors = Vec::new();

    let name = user.full_name.trim();
    if name.is_empty() {
        errors.push("full name is required".to_string());
    } else if name.chars().count() > MAX_NAME_LEN {
        errors.push(format!("full name must be at most {MAX_NAME_LEN} characters"));
    }

    let email = user.email.trim();
    if email.is_empty() {
        errors.push("email is required".to_string());
    } else {
        if !is_valid_email(email) {
            errors.push("email address is malformed".to_string());
        }
        if email.len() > MAX_EMAIL_LEN {
            errors.push(format!("email must be at most {MAX_EMAIL_LEN} characters"));
        }
        let taken = existing
            .iter()
            .any(|other| other.id != user.id && other.email.eq_ignore_ascii_case(email));
        if taken {
            errors.push("email address is already in use".to_string());
        }
    }

    match user.evaluator_id.as_deref() {
        None if user.role == UserRole::Employee => {
            errors.push("evaluator required for employee".to_string());
        }
        None => {}
        Some(evaluator_id) if evaluator_id == user.id => {
            errors.push("a user cannot be their own evaluator".to_string());
        }
        Some(evaluator_id) => match existing.iter().find(|u| u.id == evaluator_id) {
            None => errors.push(format!("evaluator '{evaluator_id}' does not exist")),
            Some(evaluator) if evaluator.role == UserRole::Employee => {
                errors.push(format!("'{}' cannot act as an evaluator", evaluator.full_name));
            }
            Some(_) => {}
        },
    }

    errors
}

/// `existing` holds the stored periods; an update may appear in it.
pub fn validate_period(period: &EvaluationPeriod, existing: &[EvaluationPeriod]) -> Vec<String> {
    let mut errors = Vec::new();

    if period.name.trim().is_empty() {
        errors.push("period name is required".to_string());
    }
    if period.start_date >= period.end_date {
        errors.push("end date must be after start date".to_string());
    }
    if let Some(deadline) = period.evaluation_deadline {
        if deadline < period.end_date {
            errors.push("evaluation deadline must not precede the end date".to_string());
        }
    }
    if let (Some(evaluation), Some(review)) = (period.evaluation_deadline, period.review_deadline) {
        if review < evaluation {
            errors.push("review deadline must not precede the evaluation deadline".to_string());
        }
    }
    if period.is_active {
        if let Some(active) = existing.iter().find(|p| p.is_active && p.id != period.id) {
            errors.push(format!(
                "duplicate active period: '{}' is already active",
                active.name
            ));
        }
    }

    errors
}
