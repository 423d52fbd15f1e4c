//! Full-state JSON export and import.
//!
//! Import overwrites every collection present in the document and leaves
//! the others alone. Categories travel with the export for reference only;
//! they come from static configuration and are never written back.

use crate::db::{self, Record, RecordStore, StoreError};
use crate::domain::models::{Evaluation, EvaluationCategory, EvaluationPeriod, Setting, User, UserRole};
use crate::domain::validation;
use crate::tenant::ConfigProvider;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub periods: Option<Vec<EvaluationPeriod>>,
    #[serde(default)]
    pub categories: Vec<EvaluationCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Vec<Setting>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<User>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluations: Option<Vec<Evaluation>>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ExportOptions {
    #[serde(default)]
    pub include_users: bool,
    #[serde(default)]
    pub include_evaluations: bool,
}

/// Records written per collection; `None` for collections left untouched.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ImportSummary {
    pub periods: Option<usize>,
    pub settings: Option<usize>,
    pub users: Option<usize>,
    pub evaluations: Option<usize>,
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot version {found} is newer than the supported version {}", SNAPSHOT_VERSION)]
    UnsupportedVersion { found: u32 },
    #[error("invalid snapshot: {}", .0.join("; "))]
    Invalid(Vec<String>),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub async fn export(
    store: &dyn RecordStore,
    config: &dyn ConfigProvider,
    options: ExportOptions,
    now: DateTime<Utc>,
) -> Result<Snapshot, StoreError> {
    let users = if options.include_users {
        Some(db::fetch_all::<User>(store).await?)
    } else {
        None
    };
    let evaluations = if options.include_evaluations {
        Some(db::fetch_all::<Evaluation>(store).await?)
    } else {
        None
    };

    Ok(Snapshot {
        version: SNAPSHOT_VERSION,
        exported_at: now,
        periods: Some(db::fetch_all(store).await?),
        categories: config.all_categories(),
        settings: Some(db::fetch_all(store).await?),
        users,
        evaluations,
    })
}

/// Ids an imported evaluation may point at: the document's own users and
/// periods, or the stored ones for collections the document leaves out.
pub struct KnownIds {
    pub users: HashSet<String>,
    pub periods: HashSet<String>,
}

impl KnownIds {
    async fn resolve(store: &dyn RecordStore, snapshot: &Snapshot) -> Result<Self, StoreError> {
        let users = match &snapshot.users {
            Some(users) => users.iter().map(|u| u.id.clone()).collect(),
            None => db::fetch_all::<User>(store).await?.into_iter().map(|u| u.id).collect(),
        };
        let periods = match &snapshot.periods {
            Some(periods) => periods.iter().map(|p| p.id.clone()).collect(),
            None => db::fetch_all::<EvaluationPeriod>(store)
                .await?
                .into_iter()
                .map(|p| p.id)
                .collect(),
        };
        Ok(Self { users, periods })
    }
}

/// Checks run before anything is overwritten.
pub fn check(
    snapshot: &Snapshot,
    config: &dyn ConfigProvider,
    known: &KnownIds,
) -> Result<(), SnapshotError> {
    if snapshot.version > SNAPSHOT_VERSION {
        return Err(SnapshotError::UnsupportedVersion {
            found: snapshot.version,
        });
    }

    let mut errors = Vec::new();
    if let Some(periods) = &snapshot.periods {
        let active = periods.iter().filter(|p| p.is_active).count();
        if active > 1 {
            errors.push(format!("duplicate active period: {active} periods are marked active"));
        }
        for period in periods {
            let mut inactive = period.clone();
            inactive.is_active = false;
            for message in validation::validate_period(&inactive, &[]) {
                errors.push(format!("period '{}': {message}", period.id));
            }
        }
        duplicate_keys(periods, &mut errors);
    }
    if let Some(settings) = &snapshot.settings {
        duplicate_keys(settings, &mut errors);
    }

    if let Some(users) = &snapshot.users {
        if !users.iter().any(|u| u.role == UserRole::Admin) {
            errors.push("users must include at least one admin".to_string());
        }
        duplicate_keys(users, &mut errors);
        for user in users {
            for message in validation::validate_user(user, users) {
                errors.push(format!("user '{}': {message}", user.id));
            }
        }
    }

    if let Some(evaluations) = &snapshot.evaluations {
        duplicate_keys(evaluations, &mut errors);
        for evaluation in evaluations {
            if !known.users.contains(&evaluation.user_id) {
                errors.push(format!(
                    "evaluation '{}': unknown user '{}'",
                    evaluation.id, evaluation.user_id
                ));
            }
            if !known.periods.contains(&evaluation.period_id) {
                errors.push(format!(
                    "evaluation '{}': unknown period '{}'",
                    evaluation.id, evaluation.period_id
                ));
            }
            let categories = config.evaluation_categories(Some(&evaluation.position));
            for message in validation::validate_evaluation(evaluation, &categories) {
                errors.push(format!("evaluation '{}': {message}", evaluation.id));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(SnapshotError::Invalid(errors))
    }
}

fn duplicate_keys<T: Record>(records: &[T], errors: &mut Vec<String>) {
    let mut seen = HashSet::new();
    for record in records {
        if !seen.insert(record.key()) {
            errors.push(format!(
                "duplicate key '{}' in {}",
                record.key(),
                T::COLLECTION
            ));
        }
    }
}

async fn replace_all<T: Record>(
    store: &dyn RecordStore,
    records: Option<&Vec<T>>,
) -> Result<Option<usize>, StoreError> {
    let Some(records) = records else {
        return Ok(None);
    };
    store.clear(T::COLLECTION).await?;
    for record in records {
        db::insert(store, record).await?;
    }
    Ok(Some(records.len()))
}

pub async fn import(
    store: &dyn RecordStore,
    config: &dyn ConfigProvider,
    snapshot: &Snapshot,
) -> Result<ImportSummary, SnapshotError> {
    let known = KnownIds::resolve(store, snapshot).await?;
    check(snapshot, config, &known)?;

    let summary = ImportSummary {
        periods: replace_all(store, snapshot.periods.as_ref()).await?,
        settings: replace_all(store, snapshot.settings.as_ref()).await?,
        users: replace_all(store, snapshot.users.as_ref()).await?,
        evaluations: replace_all(store, snapshot.evaluations.as_ref()).await?,
    };

    tracing::info!(
        periods = ?summary.periods,
        settings = ?summary.settings,
        users = ?summary.users,
        evaluations = ?summary.evaluations,
        "Imported snapshot exported at {}",
        snapshot.exported_at
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{seed, Collection, MemoryStore};
    use crate::tenant::{data::DEFAULT_TENANT_ID, StaticConfig};
    use serde_json::json;

    async fn seeded() -> (MemoryStore, StaticConfig) {
        let store = MemoryStore::new();
        let config = StaticConfig::for_tenant(DEFAULT_TENANT_ID).unwrap();
        seed::seed_all(&store, &config, Utc::now()).await.unwrap();
        (store, config)
    }

    async fn full_export(store: &MemoryStore, config: &StaticConfig) -> Snapshot {
        let options = ExportOptions { include_users: true, include_evaluations: true };
        export(store, config, options, Utc::now()).await.unwrap()
    }

    #[tokio::test]
    async fn export_then_import_reproduces_periods_and_settings() {
        let (store, config) = seeded().await;
        let snapshot = export(&store, &config, ExportOptions::default(), Utc::now())
            .await
            .unwrap();
        assert!(snapshot.users.is_none());
        assert_eq!(snapshot.categories.len(), 8);

        let raw = serde_json::to_string(&snapshot).unwrap();
        let parsed: Snapshot = serde_json::from_str(&raw).unwrap();

        let target = MemoryStore::new();
        let summary = import(&target, &config, &parsed).await.unwrap();
        assert_eq!(summary.periods, Some(3));
        assert_eq!(summary.users, None);

        let periods: Vec<EvaluationPeriod> = db::fetch_all(&target).await.unwrap();
        let settings: Vec<Setting> = db::fetch_all(&target).await.unwrap();
        assert_eq!(Some(periods), snapshot.periods);
        assert_eq!(Some(settings), snapshot.settings);
    }

    #[tokio::test]
    async fn full_exports_import_cleanly() {
        let (store, config) = seeded().await;
        let snapshot = full_export(&store, &config).await;

        let target = MemoryStore::new();
        let summary = import(&target, &config, &snapshot).await.unwrap();
        assert_eq!(summary.users, Some(5));
        assert_eq!(summary.evaluations, Some(1));
    }

    #[tokio::test]
    async fn import_overwrites_present_collections_only() {
        let (store, config) = seeded().await;
        let options = ExportOptions { include_users: true, include_evaluations: false };
        let mut snapshot = export(&store, &config, options, Utc::now()).await.unwrap();
        snapshot.periods.as_mut().unwrap().retain(|p| p.id == "period-2025-h2");
        snapshot.users.as_mut().unwrap().retain(|u| u.id == "admin");

        import(&store, &config, &snapshot).await.unwrap();
        assert_eq!(store.count(Collection::Periods).await.unwrap(), 1);
        assert_eq!(store.count(Collection::Users).await.unwrap(), 1);
        assert_eq!(store.count(Collection::Evaluations).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn omitted_collections_survive_an_import() {
        let (store, config) = seeded().await;
        let settings_before = store.count(Collection::Settings).await.unwrap();
        let snapshot: Snapshot = serde_json::from_value(json!({
            "version": 1,
            "exported_at": "2025-10-01T00:00:00Z"
        }))
        .unwrap();

        let summary = import(&store, &config, &snapshot).await.unwrap();
        assert_eq!(summary, ImportSummary::default());
        assert_eq!(store.count(Collection::Periods).await.unwrap(), 3);
        assert_eq!(store.count(Collection::Settings).await.unwrap(), settings_before);
        assert_eq!(store.count(Collection::Users).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn user_lists_without_an_admin_are_rejected() {
        let (store, config) = seeded().await;
        let snapshot: Snapshot = serde_json::from_value(json!({
            "version": 1,
            "exported_at": "2025-10-01T00:00:00Z",
            "users": []
        }))
        .unwrap();

        let err = import(&store, &config, &snapshot).await.unwrap_err();
        assert!(err.to_string().contains("at least one admin"), "{err}");
        assert_eq!(store.count(Collection::Users).await.unwrap(), 5);
        assert_eq!(store.count(Collection::Periods).await.unwrap(), 3);

        let mut snapshot = full_export(&store, &config).await;
        snapshot.users.as_mut().unwrap().retain(|u| u.role != UserRole::Admin);
        snapshot.evaluations = None;
        assert!(import(&store, &config, &snapshot).await.is_err());
        assert!(db::fetch::<User>(&store, "admin").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn out_of_range_ratings_are_rejected() {
        let (store, config) = seeded().await;
        let mut snapshot = full_export(&store, &config).await;
        let evaluation = &mut snapshot.evaluations.as_mut().unwrap()[0];
        evaluation.quantitative.get_mut("cross-prep-1").unwrap().self_rating = Some(9);

        let err = import(&store, &config, &snapshot).await.unwrap_err();
        assert!(err.to_string().contains("must be between"), "{err}");
        let stored = db::fetch::<Evaluation>(&store, "eval-employee-period-2025-h2")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.quantitative["cross-prep-1"].self_rating, Some(3));
    }

    #[tokio::test]
    async fn evaluations_must_reference_known_users_and_periods() {
        let (store, config) = seeded().await;
        let mut snapshot = full_export(&store, &config).await;
        snapshot.users = None;
        snapshot.periods = None;
        let evaluation = &mut snapshot.evaluations.as_mut().unwrap()[0];
        evaluation.user_id = "ghost".to_string();
        evaluation.period_id = "period-1999".to_string();

        let err = import(&store, &config, &snapshot).await.unwrap_err().to_string();
        assert!(err.contains("unknown user 'ghost'"), "{err}");
        assert!(err.contains("unknown period 'period-1999'"), "{err}");
    }

    #[tokio::test]
    async fn newer_versions_are_rejected_untouched() {
        let (store, config) = seeded().await;
        let mut snapshot = export(&store, &config, ExportOptions::default(), Utc::now())
            .await
            .unwrap();
        snapshot.version = SNAPSHOT_VERSION + 1;
        snapshot.periods = Some(Vec::new());

        let err = import(&store, &config, &snapshot).await.unwrap_err();
        assert!(matches!(err, SnapshotError::UnsupportedVersion { found: 2 }));
        assert_eq!(store.count(Collection::Periods).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn two_active_periods_are_rejected() {
        let (store, config) = seeded().await;
        let mut snapshot = export(&store, &config, ExportOptions::default(), Utc::now())
            .await
            .unwrap();
        for period in snapshot.periods.iter_mut().flatten() {
            period.is_active = true;
        }
        let err = import(&store, &config, &snapshot).await.unwrap_err();
        assert!(err.to_string().contains("duplicate active period"), "{err}");
    }
}
