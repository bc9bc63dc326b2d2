//! Integration tests for InMemoryStore using the storage test harness.
//!
//! This file invokes `entity_store_tests!` to validate that InMemoryStore
//! fully conforms to the EntityStore<T> contract.

#[macro_use]
mod storage_harness;

use member::core::field::FieldValue;
use member::core::service::EntityStore;
use member::storage::InMemoryStore;
use storage_harness::*;

entity_store_tests!(InMemoryStore::<TestProfile>::new());

#[tokio::test]
async fn test_duplicate_unique_key_returns_first_in_insertion_order() {
    let mut second = test_profile(2, "twin");
    second.email = "second@test.com".to_string();
    let store = InMemoryStore::with_records([test_profile(1, "twin"), second]);

    let found = store
        .get_by_unique_key("handleLower", &FieldValue::from("twin"))
        .await
        .unwrap();
    assert_eq!(found.profile_id, 1);
}
