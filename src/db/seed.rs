use crate::db::{self, Collection, RecordStore};
use crate::domain::models::{
    Evaluation, EvaluationPeriod, EvaluationStatus, QualitativeGoal, QuantitativeRating, Setting,
    User,
};
use crate::tenant::ConfigProvider;
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::json;

struct SeedPeriod<'a> {
    id: &'a str,
    name: &'a str,
    start: (i32, u32, u32),
    end: (i32, u32, u32),
    active: bool,
    evaluation_deadline: (i32, u32, u32),
    review_deadline: (i32, u32, u32),
}

const SAMPLE_PERIODS: [SeedPeriod<'static>; 3] = [
    SeedPeriod {
        id: "period-2024-h2",
        name: "2024 H2",
        start: (2024, 10, 1),
        end: (2025, 3, 31),
        active: false,
        evaluation_deadline: (2025, 4, 15),
        review_deadline: (2025, 4, 30),
    },
    SeedPeriod {
        id: "period-2025-h1",
        name: "2025 H1",
        start: (2025, 4, 1),
        end: (2025, 9, 30),
        active: false,
        evaluation_deadline: (2025, 10, 15),
        review_deadline: (2025, 10, 31),
    },
    SeedPeriod {
        id: "period-2025-h2",
        name: "2025 H2",
        start: (2025, 10, 1),
        end: (2026, 3, 31),
        active: true,
        evaluation_deadline: (2026, 4, 15),
        review_deadline: (2026, 4, 30),
    },
];

pub async fn seed_all(
    store: &dyn RecordStore,
    config: &dyn ConfigProvider,
    now: DateTime<Utc>,
) -> Result<()> {
    seed_settings(store, now).await?;
    seed_users(store, config, now).await?;
    seed_periods(store, now).await?;
    seed_evaluations(store, now).await?;
    Ok(())
}

async fn seed_settings(store: &dyn RecordStore, now: DateTime<Utc>) -> Result<()> {
    if store.count(Collection::Settings).await? > 0 {
        return Ok(());
    }
    for (key, value) in [
        ("app_version", json!(env!("CARGO_PKG_VERSION"))),
        ("last_seeded", json!(now.to_rfc3339())),
    ] {
        db::save(
            store,
            &Setting {
                key: key.to_string(),
                value,
                updated_at: now,
            },
        )
        .await?;
    }
    tracing::info!("Seeded initial settings");
    Ok(())
}

async fn seed_users(
    store: &dyn RecordStore,
    config: &dyn ConfigProvider,
    now: DateTime<Utc>,
) -> Result<()> {
    let mut created = 0;
    for sample in &config.current_tenant().sample_users {
        if db::fetch::<User>(store, &sample.id).await?.is_some() {
            continue;
        }
        let user = User {
            id: sample.id.clone(),
            full_name: sample.name.clone(),
            email: sample.email.clone(),
            role: sample.role,
            position: sample.position.clone(),
            department: Some(sample.department.clone()),
            evaluator_id: sample.evaluator_id.clone(),
            created_at: now,
            updated_at: now,
        };
        db::insert(store, &user).await?;
        created += 1;
    }
    if created > 0 {
        tracing::info!("Seeded {} sample users", created);
    }
    Ok(())
}

fn date((year, month, day): (i32, u32, u32)) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| anyhow::anyhow!("invalid seed date {year}-{month}-{day}"))
}

/// Only seeds an empty collection so an admin's activation choice is
/// never undone on restart.
async fn seed_periods(store: &dyn RecordStore, now: DateTime<Utc>) -> Result<()> {
    if store.count(Collection::Periods).await? > 0 {
        return Ok(());
    }
    for sample in &SAMPLE_PERIODS {
        let period = EvaluationPeriod {
            id: sample.id.to_string(),
            name: sample.name.to_string(),
            start_date: date(sample.start)?,
            end_date: date(sample.end)?,
            is_active: sample.active,
            evaluation_deadline: Some(date(sample.evaluation_deadline)?),
            review_deadline: Some(date(sample.review_deadline)?),
            created_at: now,
            updated_at: now,
        };
        db::insert(store, &period).await?;
    }
    tracing::info!("Seeded {} sample periods", SAMPLE_PERIODS.len());
    Ok(())
}

/// A draft for the sample site worker in the active period.
async fn seed_evaluations(store: &dyn RecordStore, now: DateTime<Utc>) -> Result<()> {
    if store.count(Collection::Evaluations).await? > 0 {
        return Ok(());
    }
    let Some(period) = db::active_period(store).await? else {
        return Ok(());
    };
    let Some(owner) = db::fetch::<User>(store, "employee").await? else {
        return Ok(());
    };

    let mut evaluation = Evaluation::blank(&owner, &period.id, now);
    evaluation.status = EvaluationStatus::Draft;
    for (item, rating) in [("cross-prep-1", 3), ("cross-install-1", 4), ("floor-tile", 2)] {
        evaluation.quantitative.insert(
            item.to_string(),
            QuantitativeRating {
                self_rating: Some(rating),
                ..Default::default()
            },
        );
    }
    evaluation.qualitative = [
        ("qual-safety", "Raise on-site safety awareness and prevent accidents", 25, Some(4)),
        ("qual-quality", "Improve workmanship and technical skill", 25, None),
        ("qual-efficiency", "Work more efficiently and shorten schedules", 20, Some(3)),
        ("qual-teamwork", "Strengthen teamwork and information sharing", 15, Some(4)),
        ("qual-improvement", "Propose and carry out process improvements", 15, Some(3)),
    ]
    .into_iter()
    .map(|(id, content, weight, self_rating)| QualitativeGoal {
        id: id.to_string(),
        content: content.to_string(),
        weight,
        self_rating,
        ..Default::default()
    })
    .collect();

    db::insert(store, &evaluation).await?;
    tracing::info!("Seeded sample evaluation {}", evaluation.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::domain::validation;
    use crate::tenant::{data::DEFAULT_TENANT_ID, StaticConfig};

    #[tokio::test]
    async fn seeds_once_and_keeps_invariants() {
        let store = MemoryStore::new();
        let config = StaticConfig::for_tenant(DEFAULT_TENANT_ID).unwrap();

        seed_all(&store, &config, Utc::now()).await.unwrap();
        seed_all(&store, &config, Utc::now()).await.unwrap();

        assert_eq!(store.count(Collection::Users).await.unwrap(), 5);
        assert_eq!(store.count(Collection::Periods).await.unwrap(), 3);
        assert_eq!(store.count(Collection::Settings).await.unwrap(), 2);
        assert_eq!(store.count(Collection::Evaluations).await.unwrap(), 1);

        let users = db::fetch_all::<User>(&store).await.unwrap();
        for user in &users {
            assert!(validation::validate_user(user, &users).is_empty(), "{}", user.id);
        }
        let periods = db::fetch_all::<EvaluationPeriod>(&store).await.unwrap();
        assert_eq!(periods.iter().filter(|p| p.is_active).count(), 1);
        for period in &periods {
            assert!(validation::validate_period(period, &periods).is_empty(), "{}", period.id);
        }

        let evaluation = db::fetch::<Evaluation>(&store, "eval-employee-period-2025-h2")
            .await
            .unwrap()
            .unwrap();
        let categories = config.evaluation_categories(Some(&evaluation.position));
        assert!(validation::validate_evaluation(&evaluation, &categories).is_empty());
    }

    #[tokio::test]
    async fn restores_deleted_sample_users_only() {
        let store = MemoryStore::new();
        let config = StaticConfig::for_tenant(DEFAULT_TENANT_ID).unwrap();
        seed_all(&store, &config, Utc::now()).await.unwrap();

        db::remove::<User>(&store, "worker1").await.unwrap();
        db::remove::<EvaluationPeriod>(&store, "period-2024-h2").await.unwrap();
        seed_all(&store, &config, Utc::now()).await.unwrap();

        assert!(db::fetch::<User>(&store, "worker1").await.unwrap().is_some());
        assert!(db::fetch::<EvaluationPeriod>(&store, "period-2024-h2").await.unwrap().is_none());
    }
}
