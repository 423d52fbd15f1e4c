//! Deadline and approval reminders. There is no delivery channel; the
//! daily job only logs what it finds.

use crate::db;
use crate::domain::models::{Evaluation, EvaluationPeriod, EvaluationStatus};
use crate::error::AppError;
use crate::state::AppState;
use crate::time_utils;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineKind {
    Evaluation,
    Review,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct DeadlineNotice {
    pub period_id: String,
    pub period_name: String,
    pub kind: DeadlineKind,
    pub deadline: NaiveDate,
    pub days_left: i64,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct PendingApproval {
    pub evaluation_id: String,
    pub user_id: String,
    pub status: EvaluationStatus,
    pub waiting_days: i64,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ReminderReport {
    pub today: Option<NaiveDate>,
    pub notices: Vec<DeadlineNotice>,
    pub pending: Vec<PendingApproval>,
}

/// Deadlines of `period` that are exactly one of `notice_days` away.
pub fn deadline_notices(
    period: &EvaluationPeriod,
    today: NaiveDate,
    notice_days: &[i64],
) -> Vec<DeadlineNotice> {
    [
        (DeadlineKind::Evaluation, period.evaluation_deadline),
        (DeadlineKind::Review, period.review_deadline),
    ]
    .into_iter()
    .filter_map(|(kind, deadline)| {
        let deadline = deadline?;
        let days_left = time_utils::days_until(today, deadline);
        notice_days.contains(&days_left).then(|| DeadlineNotice {
            period_id: period.id.clone(),
            period_name: period.name.clone(),
            kind,
            deadline,
            days_left,
        })
    })
    .collect()
}

/// Evaluations of `period_id` stuck in an approval step for at least
/// `min_days`.
pub fn pending_approvals(
    evaluations: &[Evaluation],
    period_id: &str,
    now: DateTime<Utc>,
    min_days: i64,
) -> Vec<PendingApproval> {
    let mut pending: Vec<PendingApproval> = evaluations
        .iter()
        .filter(|e| e.period_id == period_id)
        .filter_map(|e| {
            let since = match e.status {
                EvaluationStatus::Submitted => e.submitted_at,
                EvaluationStatus::ApprovedByEvaluator => e.evaluator_approved_at,
                _ => None,
            }?;
            let waiting_days = (now - since).num_days();
            (waiting_days >= min_days).then(|| PendingApproval {
                evaluation_id: e.id.clone(),
                user_id: e.user_id.clone(),
                status: e.status,
                waiting_days,
            })
        })
        .collect();
    pending.sort_by(|a, b| b.waiting_days.cmp(&a.waiting_days));
    pending
}

/// One pass of the daily reminder job against the active period.
pub async fn run(state: &AppState, now: DateTime<Utc>) -> Result<ReminderReport, AppError> {
    let tenant = state.config().current_tenant();
    if !tenant.features.deadline_reminder {
        return Ok(ReminderReport::default());
    }
    let Some(period) = db::active_period(state.store()).await? else {
        tracing::debug!("No active period, skipping reminders");
        return Ok(ReminderReport::default());
    };

    let today = time_utils::local_date(&tenant.timezone, now);
    let notices = deadline_notices(&period, today, &tenant.deadline_notice_days);
    let evaluations = db::fetch_all::<Evaluation>(state.store()).await?;
    let pending = pending_approvals(&evaluations, &period.id, now, tenant.approval_reminder_days);

    for notice in &notices {
        tracing::info!(
            period = %notice.period_id,
            kind = ?notice.kind,
            "Deadline for '{}' is in {} days ({})",
            notice.period_name,
            notice.days_left,
            notice.deadline
        );
    }
    if !pending.is_empty() {
        tracing::info!(
            period = %period.id,
            "{} evaluations have been waiting for approval for {}+ days",
            pending.len(),
            tenant.approval_reminder_days
        );
    }

    Ok(ReminderReport {
        today: Some(today),
        notices,
        pending,
    })
}
