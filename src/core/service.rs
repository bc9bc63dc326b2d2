//! Generic data-access trait shared by every collection

use crate::core::entity::{Entity, merge_fields};
use crate::core::error::{ServiceError, ServiceResult};
use crate::core::field::FieldValue;
use crate::core::store::{QueryDescriptor, ScanParams};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Data-access adapter for one collection of `T`
///
/// Backends implement the four storage primitives. The trait supplies the
/// shared semantics on top of them: unique-key lookup with `NotFound`
/// mapping, construction from raw data and shallow-merge updates. The
/// framework is agnostic to the underlying storage mechanism.
#[async_trait]
pub trait EntityStore<T: Entity>: Send + Sync {
    /// Indexed retrieval; zero matches yield an empty `Vec`
    async fn query(&self, descriptor: &QueryDescriptor) -> ServiceResult<Vec<T>>;

    /// Unindexed bulk retrieval; zero matches yield an empty `Vec`
    async fn scan(&self, params: &ScanParams) -> ServiceResult<Vec<T>>;

    /// Persist a new record, failing if its key is already taken
    async fn insert(&self, entity: &T) -> ServiceResult<()>;

    /// Persist a record, replacing any previous version (last write wins)
    async fn save(&self, entity: &T) -> ServiceResult<()>;

    /// Look up the single record where `key_name == value`
    ///
    /// Fails with `NotFound` when nothing matches. When the store holds
    /// several matches, the first one in store order is returned.
    async fn get_by_unique_key(&self, key_name: &str, value: &FieldValue) -> ServiceResult<T> {
        let descriptor = QueryDescriptor::for_entity::<T>(key_name, value.clone());
        let mut matches = self.query(&descriptor).await?;

        if matches.is_empty() {
            return Err(ServiceError::not_found(T::collection(), key_name, value));
        }
        if matches.len() > 1 {
            tracing::warn!(
                collection = T::collection(),
                key = key_name,
                value = %value,
                count = matches.len(),
                "unique key matched several records, using the first"
            );
        }

        Ok(matches.swap_remove(0))
    }

    /// Construct a new record from `data` and persist it
    async fn create(&self, data: Map<String, Value>) -> ServiceResult<T> {
        let entity = T::from_data(data)?;
        self.insert(&entity).await?;
        tracing::debug!(
            collection = T::collection(),
            key = %entity.storage_key(),
            "record created"
        );
        Ok(entity)
    }

    /// Shallow-merge `data` onto `entity` and persist the result
    async fn update(&self, entity: T, data: &Map<String, Value>) -> ServiceResult<T> {
        let updated = merge_fields(&entity, data)?;
        self.save(&updated).await?;
        tracing::debug!(
            collection = T::collection(),
            key = %updated.storage_key(),
            fields = data.len(),
            "record updated"
        );
        Ok(updated)
    }
}
