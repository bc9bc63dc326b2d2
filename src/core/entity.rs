//! Entity trait defining the schema contract of every stored collection

use crate::core::error::{ServiceError, ServiceResult};
use crate::core::field::FieldValue;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Base trait for all records kept in the document store.
///
/// An entity declares:
/// - the collection (table) it lives in
/// - its hash key and optional range key attribute names
/// - the secondary attributes it treats as unique, and the index serving them
/// - the identifiable (sensitive) attributes hidden from unauthorized callers
///
/// Attribute names are the serialized (camelCase) names, the same names the
/// store and the HTTP payloads use.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Name of the collection (e.g., "Member")
    fn collection() -> &'static str;

    /// Name of the hash key attribute
    fn hash_key() -> &'static str;

    /// Name of the range key attribute, if the collection has a composite key
    fn range_key() -> Option<&'static str> {
        None
    }

    /// Secondary attributes that identify a single record
    fn unique_keys() -> &'static [&'static str] {
        &[]
    }

    /// The store index serving lookups on `key`
    ///
    /// Returns `None` for the hash key itself and for attributes without an
    /// index.
    fn index_for(_key: &str) -> Option<&'static str> {
        None
    }

    /// Attributes visible only to callers allowed to manage the record
    fn identifiable_fields() -> &'static [&'static str] {
        &[]
    }

    /// Get the scalar value of an attribute by its serialized name
    fn field_value(&self, field: &str) -> Option<FieldValue> {
        serde_json::to_value(self)
            .ok()
            .and_then(|json| json.get(field).and_then(FieldValue::from_json))
    }

    /// Storage identity of this record: hash key, plus range key when present
    fn storage_key(&self) -> String {
        let hash = self
            .field_value(Self::hash_key())
            .unwrap_or(FieldValue::Null);
        match Self::range_key() {
            Some(range) => {
                let range = self.field_value(range).unwrap_or(FieldValue::Null);
                format!("{}#{}", hash, range)
            }
            None => hash.to_string(),
        }
    }

    /// Re-derive attributes computed from others (e.g. a lower-cased key)
    ///
    /// Runs after every construction from raw data and every merge.
    fn normalize(&mut self) {}

    /// Deserialize and normalize a record, leaving error mapping to the caller
    fn parse_data(data: Map<String, Value>) -> Result<Self, serde_json::Error> {
        let mut entity: Self = serde_json::from_value(Value::Object(data))?;
        entity.normalize();
        Ok(entity)
    }

    /// Build a record from a JSON object conforming to the schema
    fn from_data(data: Map<String, Value>) -> ServiceResult<Self> {
        Self::parse_data(data).map_err(|e| {
            ServiceError::store_write(Self::collection(), format!("invalid record: {}", e))
        })
    }
}

/// Records that belong to a member, identified by the lower-cased handle
pub trait MemberOwned {
    /// Lower-cased handle of the owning member
    fn owner_handle_lower(&self) -> Option<&str>;
}

/// Shallow merge of `data` onto `entity`
///
/// Every key of `data` overwrites the attribute with the same name; attributes
/// absent from `data` are left untouched. The result must still conform to the
/// schema.
pub fn merge_fields<T: Entity>(entity: &T, data: &Map<String, Value>) -> ServiceResult<T> {
    let mut json = serde_json::to_value(entity)
        .map_err(|e| ServiceError::store_write(T::collection(), e))?;

    let Some(object) = json.as_object_mut() else {
        return Err(ServiceError::Internal(format!(
            "{} does not serialize to an object",
            T::collection()
        )));
    };

    for (key, value) in data {
        object.insert(key.clone(), value.clone());
    }

    let mut merged: T = serde_json::from_value(json).map_err(|e| {
        ServiceError::store_write(T::collection(), format!("invalid update: {}", e))
    })?;
    merged.normalize();
    Ok(merged)
}
