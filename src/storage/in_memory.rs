//! In-memory implementation of EntityStore for testing and development

use crate::core::entity::Entity;
use crate::core::error::{ServiceError, ServiceResult};
use crate::core::service::EntityStore;
use crate::core::store::{QueryDescriptor, ScanParams};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::{Arc, RwLock};

/// In-memory entity store
///
/// Useful for testing and development. Uses RwLock for thread-safe access.
/// Records keep their insertion order, which is the "store order" the
/// unique-key lookup relies on.
#[derive(Clone)]
pub struct InMemoryStore<T: Entity> {
    records: Arc<RwLock<IndexMap<String, T>>>,
}

impl<T: Entity> InMemoryStore<T> {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(IndexMap::new())),
        }
    }

    /// Create a store pre-populated with `records`, later duplicates replacing earlier ones
    pub fn with_records(records: impl IntoIterator<Item = T>) -> Self {
        let map = records
            .into_iter()
            .map(|record| (record.storage_key(), record))
            .collect();
        Self {
            records: Arc::new(RwLock::new(map)),
        }
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Entity> Default for InMemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Entity> EntityStore<T> for InMemoryStore<T> {
    async fn query(&self, descriptor: &QueryDescriptor) -> ServiceResult<Vec<T>> {
        let records = self.records.read().map_err(|e| {
            ServiceError::store_read(T::collection(), format!("failed to acquire read lock: {}", e))
        })?;

        let matches = records.values().filter(|record| descriptor.matches(*record));
        Ok(match descriptor.limit {
            Some(limit) => matches.take(limit).cloned().collect(),
            None => matches.cloned().collect(),
        })
    }

    async fn scan(&self, params: &ScanParams) -> ServiceResult<Vec<T>> {
        let records = self.records.read().map_err(|e| {
            ServiceError::store_read(T::collection(), format!("failed to acquire read lock: {}", e))
        })?;

        let matches = records
            .values()
            .filter(|record| params.conditions.iter().all(|c| c.matches(*record)));
        Ok(match params.limit {
            Some(limit) => matches.take(limit).cloned().collect(),
            None => matches.cloned().collect(),
        })
    }

    async fn insert(&self, entity: &T) -> ServiceResult<()> {
        let mut records = self.records.write().map_err(|e| {
            ServiceError::store_write(T::collection(), format!("failed to acquire write lock: {}", e))
        })?;

        let key = entity.storage_key();
        if records.contains_key(&key) {
            return Err(ServiceError::store_write(
                T::collection(),
                format!("record with key '{}' already exists", key),
            ));
        }

        records.insert(key, entity.clone());
        Ok(())
    }

    async fn save(&self, entity: &T) -> ServiceResult<()> {
        let mut records = self.records.write().map_err(|e| {
            ServiceError::store_write(T::collection(), format!("failed to acquire write lock: {}", e))
        })?;

        // IndexMap::insert keeps the position of an existing key
        records.insert(entity.storage_key(), entity.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field::FieldValue;
    use crate::core::store::Condition;
    use crate::entities::Member;
    use serde_json::{Map, Value, json};

    fn data(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn seeded() -> InMemoryStore<Member> {
        InMemoryStore::with_records([
            Member::new(1, "TonyJ").with_email("tony@example.com"),
            Member::new(2, "alice").with_email("alice@example.com"),
            Member::new(3, "bob"),
        ])
    }

    #[tokio::test]
    async fn test_get_by_unique_key() {
        let store = seeded();
        let member = store
            .get_by_unique_key("handleLower", &FieldValue::from("tonyj"))
            .await
            .unwrap();
        assert_eq!(member.user_id, 1);
    }

    #[tokio::test]
    async fn test_get_by_unique_key_not_found() {
        let store = seeded();
        let err = store
            .get_by_unique_key("handleLower", &FieldValue::from("nobody"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_get_by_unique_key_first_of_several() {
        let mut twin = Member::new(9, "Twin");
        twin.email = Some("shared@example.com".into());
        let mut other = Member::new(10, "Other");
        other.email = Some("shared@example.com".into());
        let store = InMemoryStore::with_records([twin, other]);

        let found = store
            .get_by_unique_key("email", &FieldValue::from("shared@example.com"))
            .await
            .unwrap();
        assert_eq!(found.user_id, 9);
    }

    #[tokio::test]
    async fn test_create_then_duplicate_fails() {
        let store = InMemoryStore::<Member>::new();
        let payload = data(json!({
            "userId": 5,
            "handle": "Neo",
            "handleLower": "neo",
            "status": "ACTIVE",
            "createdAt": "2024-01-01T00:00:00Z"
        }));

        let created = store.create(payload.clone()).await.unwrap();
        assert_eq!(created.handle, "Neo");
        assert_eq!(store.len(), 1);

        let err = store.create(payload).await.unwrap_err();
        assert!(matches!(err, ServiceError::StoreWrite { .. }));
    }

    #[tokio::test]
    async fn test_create_rejects_nonconforming_data() {
        let store = InMemoryStore::<Member>::new();
        let err = store
            .create(data(json!({"handle": "missing-everything"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::StoreWrite { .. }));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_update_merges_and_persists() {
        let store = seeded();
        let member = store
            .get_by_unique_key("handleLower", &FieldValue::from("bob"))
            .await
            .unwrap();

        let updated = store
            .update(member, &data(json!({"firstName": "Bob", "status": "INACTIVE"})))
            .await
            .unwrap();
        assert_eq!(updated.first_name.as_deref(), Some("Bob"));

        let reloaded = store
            .get_by_unique_key("userId", &FieldValue::from(3_i64))
            .await
            .unwrap();
        assert_eq!(reloaded.status, "INACTIVE");
        assert_eq!(reloaded.handle, "bob");
    }

    #[tokio::test]
    async fn test_update_with_empty_data_keeps_record() {
        let store = seeded();
        let member = store
            .get_by_unique_key("handleLower", &FieldValue::from("alice"))
            .await
            .unwrap();
        let updated = store.update(member.clone(), &Map::new()).await.unwrap();
        assert_eq!(updated, member);
    }

    #[tokio::test]
    async fn test_scan_filters_and_limits() {
        let store = seeded();
        assert_eq!(store.scan(&ScanParams::new()).await.unwrap().len(), 3);

        let found = store
            .scan(&ScanParams::new().filter(Condition::one_of("handleLower", ["alice", "bob"])))
            .await
            .unwrap();
        assert_eq!(found.len(), 2);

        let limited = store.scan(&ScanParams::new().limit(1)).await.unwrap();
        assert_eq!(limited[0].user_id, 1);
    }

    #[tokio::test]
    async fn test_query_empty_result() {
        let store = seeded();
        let found = store
            .query(&QueryDescriptor::new("handleLower", "ghost"))
            .await
            .unwrap();
        assert!(found.is_empty());
    }
}
