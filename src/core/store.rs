//! Scan and query descriptors handed to store backends
//!
//! The descriptors are opaque to the generic adapter: it builds them and
//! passes them through, each backend translates them into its own filter
//! language (in-memory predicates, DynamoDB expressions).

use crate::core::entity::Entity;
use crate::core::field::FieldValue;

/// A single filter condition on an attribute
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Attribute equals the value
    Eq(String, FieldValue),
    /// Attribute equals one of the values
    In(String, Vec<FieldValue>),
    /// String attribute contains the value as a substring
    Contains(String, String),
}

impl Condition {
    pub fn eq(field: &str, value: impl Into<FieldValue>) -> Self {
        Condition::Eq(field.to_string(), value.into())
    }

    pub fn one_of<V: Into<FieldValue>>(field: &str, values: impl IntoIterator<Item = V>) -> Self {
        Condition::In(field.to_string(), values.into_iter().map(Into::into).collect())
    }

    pub fn contains(field: &str, needle: &str) -> Self {
        Condition::Contains(field.to_string(), needle.to_string())
    }

    /// Attribute this condition applies to
    pub fn field(&self) -> &str {
        match self {
            Condition::Eq(field, _) | Condition::In(field, _) | Condition::Contains(field, _) => {
                field
            }
        }
    }

    /// Evaluate the condition against an entity
    pub fn matches<T: Entity>(&self, entity: &T) -> bool {
        let Some(actual) = entity.field_value(self.field()) else {
            return false;
        };

        match self {
            Condition::Eq(_, expected) => actual.loosely_eq(expected),
            Condition::In(_, candidates) => candidates.iter().any(|c| actual.loosely_eq(c)),
            Condition::Contains(_, needle) => actual
                .as_string()
                .is_some_and(|s| s.contains(needle.as_str())),
        }
    }
}

/// Parameters of an unindexed bulk retrieval
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanParams {
    /// All conditions must hold (AND)
    pub conditions: Vec<Condition>,
    /// Maximum number of records to return
    pub limit: Option<usize>,
}

impl ScanParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Parameters of an indexed retrieval: a key condition plus optional filters
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    /// Attribute of the key condition
    pub key: String,
    /// Value the key must equal
    pub value: FieldValue,
    /// Index to query; `None` queries the primary key
    pub index: Option<String>,
    /// Additional conditions applied after the key condition
    pub conditions: Vec<Condition>,
    /// Maximum number of records to return
    pub limit: Option<usize>,
}

impl QueryDescriptor {
    pub fn new(key: &str, value: impl Into<FieldValue>) -> Self {
        Self {
            key: key.to_string(),
            value: value.into(),
            index: None,
            conditions: Vec::new(),
            limit: None,
        }
    }

    /// Build a descriptor using the index the entity declares for `key`
    pub fn for_entity<T: Entity>(key: &str, value: impl Into<FieldValue>) -> Self {
        let mut descriptor = Self::new(key, value);
        descriptor.index = T::index_for(key).map(str::to_string);
        descriptor
    }

    pub fn index(mut self, index: &str) -> Self {
        self.index = Some(index.to_string());
        self
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether the entity satisfies the key condition and every filter
    pub fn matches<T: Entity>(&self, entity: &T) -> bool {
        let key_matches = entity
            .field_value(&self.key)
            .is_some_and(|v| v.loosely_eq(&self.value));
        key_matches && self.conditions.iter().all(|c| c.matches(entity))
    }
}
