pub mod postgres;
pub mod seed;
pub mod snapshot;
pub mod store;

pub use postgres::PgStore;
pub use store::{Collection, MemoryStore, RecordStore, StoreError};

use crate::domain::models::{Evaluation, EvaluationPeriod, Setting, User};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

/// An entity that lives in one collection under its own key.
pub trait Record: Serialize + DeserializeOwned {
    const COLLECTION: Collection;

    fn key(&self) -> &str;
}

impl Record for User {
    const COLLECTION: Collection = Collection::Users;

    fn key(&self) -> &str {
        &self.id
    }
}

impl Record for EvaluationPeriod {
    const COLLECTION: Collection = Collection::Periods;

    fn key(&self) -> &str {
        &self.id
    }
}

impl Record for Evaluation {
    const COLLECTION: Collection = Collection::Evaluations;

    fn key(&self) -> &str {
        &self.id
    }
}

impl Record for Setting {
    const COLLECTION: Collection = Collection::Settings;

    fn key(&self) -> &str {
        &self.key
    }
}

fn decode<T: Record>(key: &str, value: Value) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|source| StoreError::Corrupt {
        collection: T::COLLECTION.as_str(),
        key: key.to_string(),
        source,
    })
}

pub async fn fetch<T: Record>(store: &dyn RecordStore, key: &str) -> Result<Option<T>, StoreError> {
    match store.get(T::COLLECTION, key).await? {
        Some(value) => decode(key, value).map(Some),
        None => Ok(None),
    }
}

pub async fn fetch_all<T: Record>(store: &dyn RecordStore) -> Result<Vec<T>, StoreError> {
    store
        .get_all(T::COLLECTION)
        .await?
        .into_iter()
        .map(|(key, value)| decode(&key, value))
        .collect()
}

pub async fn save<T: Record>(store: &dyn RecordStore, record: &T) -> Result<(), StoreError> {
    let value = serde_json::to_value(record)?;
    store.put(T::COLLECTION, record.key(), value).await
}

pub async fn insert<T: Record>(store: &dyn RecordStore, record: &T) -> Result<(), StoreError> {
    let value = serde_json::to_value(record)?;
    store.add(T::COLLECTION, record.key(), value).await
}

pub async fn remove<T: Record>(store: &dyn RecordStore, key: &str) -> Result<bool, StoreError> {
    store.delete(T::COLLECTION, key).await
}

pub async fn active_period(store: &dyn RecordStore) -> Result<Option<EvaluationPeriod>, StoreError> {
    let periods = fetch_all::<EvaluationPeriod>(store).await?;
    Ok(periods.into_iter().find(|period| period.is_active))
}

pub async fn evaluations_for_user(
    store: &dyn RecordStore,
    user_id: &str,
) -> Result<Vec<Evaluation>, StoreError> {
    let mut evaluations: Vec<Evaluation> = fetch_all::<Evaluation>(store)
        .await?
        .into_iter()
        .filter(|evaluation| evaluation.user_id == user_id)
        .collect();
    evaluations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    Ok(evaluations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::UserRole;
    use chrono::{NaiveDate, Utc};
    use serde_json::json;

    fn period(id: &str, active: bool) -> EvaluationPeriod {
        EvaluationPeriod {
            id: id.to_string(),
            name: id.to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 9, 30).unwrap(),
            is_active: active,
            evaluation_deadline: None,
            review_deadline: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn typed_round_trip_through_the_store() {
        let store = MemoryStore::new();
        let user = User {
            id: "manager".to_string(),
            full_name: "Hanako Genba".to_string(),
            email: "manager@demo.com".to_string(),
            role: UserRole::Evaluator,
            position: "Site Manager".to_string(),
            department: None,
            evaluator_id: Some("admin".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        insert(&store, &user).await.unwrap();
        assert!(matches!(insert(&store, &user).await, Err(StoreError::Duplicate { .. })));

        let loaded: User = fetch(&store, "manager").await.unwrap().unwrap();
        assert_eq!(loaded, user);
        assert!(remove::<User>(&store, "manager").await.unwrap());
        assert!(fetch::<User>(&store, "manager").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_documents_name_collection_and_key() {
        let store = MemoryStore::new();
        store
            .put(Collection::Periods, "broken", json!({ "id": "broken", "name": 7 }))
            .await
            .unwrap();

        let err = fetch::<EvaluationPeriod>(&store, "broken").await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("periods") && message.contains("broken"), "{message}");
        assert!(fetch_all::<EvaluationPeriod>(&store).await.is_err());
    }

    #[tokio::test]
    async fn finds_the_active_period() {
        let store = MemoryStore::new();
        save(&store, &period("a", false)).await.unwrap();
        assert!(active_period(&store).await.unwrap().is_none());
        save(&store, &period("b", true)).await.unwrap();
        assert_eq!(active_period(&store).await.unwrap().unwrap().id, "b");
    }
}
