//! Shared test harness for entity store backends
//!
//! Provides `TestProfile`, a member-owned entity with a unique indexed
//! attribute and fields covering every `FieldValue` variant, plus helpers for
//! building raw record data.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//! use storage_harness::*;
//! ```

#![allow(dead_code)]

#[macro_use]
pub mod entity_store_tests;

use member::core::entity::MemberOwned;
use member::impl_entity;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// A test entity spanning the `FieldValue` variants
///
/// - `profileId`: Integer hash key
/// - `handleLower`: String unique key served by `handleLower-index`
/// - `score`: Float
/// - `active`: Boolean
/// - `email`: identifiable String
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestProfile {
    pub profile_id: i64,
    pub handle_lower: String,
    pub email: String,
    pub status: String,
    pub score: f64,
    pub active: bool,
    #[serde(default)]
    pub description: Option<String>,
}

impl_entity!(TestProfile {
    collection: "TestProfile",
    hash_key: "profileId",
    indexes: { "handleLower" => "handleLower-index" },
    identifiable: ["email"],
});

impl MemberOwned for TestProfile {
    fn owner_handle_lower(&self) -> Option<&str> {
        Some(&self.handle_lower)
    }
}

/// Raw data for a conforming `TestProfile`
pub fn profile_data(id: i64, handle: &str) -> Map<String, Value> {
    json!({
        "profileId": id,
        "handleLower": handle.to_lowercase(),
        "email": format!("{}@test.com", handle.to_lowercase()),
        "status": "ACTIVE",
        "score": 4.5,
        "active": true,
    })
    .as_object()
    .cloned()
    .unwrap_or_default()
}

/// A `TestProfile` value without going through a store
pub fn test_profile(id: i64, handle: &str) -> TestProfile {
    TestProfile {
        profile_id: id,
        handle_lower: handle.to_lowercase(),
        email: format!("{}@test.com", handle.to_lowercase()),
        status: "ACTIVE".to_string(),
        score: 4.5,
        active: true,
        description: None,
    }
}

/// Turn a `json!` object into record data
pub fn data(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}
