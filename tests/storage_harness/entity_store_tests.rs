//! Macro-generated test suite for `EntityStore<TestProfile>` contract validation.
//!
//! # Usage
//!
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//!
//! use storage_harness::*;
//! use member::storage::InMemoryStore;
//!
//! entity_store_tests!(InMemoryStore::<TestProfile>::new());
//! ```
//!
//! # Generated Tests
//!
//! ## Lookup
//! - `test_get_by_unique_key`: one row, returned as is
//! - `test_get_by_unique_key_not_found`: zero rows, `NotFound`
//! - `test_get_by_hash_key`: lookup on the hash key itself
//!
//! ## Create / Update
//! - `test_create_persists`: created record is readable
//! - `test_create_duplicate_key`: second create with the same key fails
//! - `test_create_invalid_data`: schema violation, `StoreWrite`
//! - `test_update_shallow_merge`: untouched fields survive
//! - `test_update_idempotent`: same data twice, same result
//!
//! ## Scan / Query
//! - `test_scan_empty_store` / `test_query_no_match`: empty `Vec`
//! - `test_scan_by_variant`: filters over String, Integer, Float, Boolean
//! - `test_query_with_filter_and_limit`
//!
//! ## Concurrency
//! - `test_concurrent_creates`: parallel creates from spawned tasks

/// Generate a full `EntityStore<TestProfile>` conformance test suite.
///
/// `$factory` is re-evaluated for each test. For the concurrency test the
/// store must also be `Clone + 'static`.
#[macro_export]
macro_rules! entity_store_tests {
    ($factory:expr) => {
        mod entity_store_contract_tests {
            use super::*;
            use member::core::error::ServiceError;
            use member::core::field::FieldValue;
            use member::core::service::EntityStore;
            use member::core::store::{Condition, QueryDescriptor, ScanParams};
            use serde_json::json;

            // ==================================================================
            // Lookup
            // ==================================================================

            #[tokio::test]
            async fn test_get_by_unique_key() {
                let store = $factory;
                store.create(profile_data(1, "Alice")).await.unwrap();
                store.create(profile_data(2, "Bob")).await.unwrap();

                let found = store
                    .get_by_unique_key("handleLower", &FieldValue::from("bob"))
                    .await
                    .unwrap();
                assert_eq!(found.profile_id, 2);
                assert_eq!(found.email, "bob@test.com");
            }

            #[tokio::test]
            async fn test_get_by_unique_key_not_found() {
                let store = $factory;
                store.create(profile_data(1, "Alice")).await.unwrap();

                let err = store
                    .get_by_unique_key("handleLower", &FieldValue::from("nobody"))
                    .await
                    .unwrap_err();
                match err {
                    ServiceError::NotFound {
                        collection,
                        key,
                        value,
                    } => {
                        assert_eq!(collection, "TestProfile");
                        assert_eq!(key, "handleLower");
                        assert_eq!(value, "nobody");
                    }
                    other => panic!("expected NotFound, got {:?}", other),
                }
            }

            #[tokio::test]
            async fn test_get_by_hash_key() {
                let store = $factory;
                store.create(profile_data(7, "Carol")).await.unwrap();

                let found = store
                    .get_by_unique_key("profileId", &FieldValue::from(7_i64))
                    .await
                    .unwrap();
                assert_eq!(found.handle_lower, "carol");
            }

            // ==================================================================
            // Create / Update
            // ==================================================================

            #[tokio::test]
            async fn test_create_persists() {
                let store = $factory;
                let created = store.create(profile_data(3, "Dave")).await.unwrap();
                assert_eq!(created, test_profile(3, "Dave"));

                let all = store.scan(&ScanParams::new()).await.unwrap();
                assert_eq!(all, vec![created]);
            }

            #[tokio::test]
            async fn test_create_duplicate_key() {
                let store = $factory;
                store.create(profile_data(4, "Eve")).await.unwrap();

                let err = store.create(profile_data(4, "Mallory")).await.unwrap_err();
                assert!(matches!(err, ServiceError::StoreWrite { .. }));

                let kept = store
                    .get_by_unique_key("profileId", &FieldValue::from(4_i64))
                    .await
                    .unwrap();
                assert_eq!(kept.handle_lower, "eve");
            }

            #[tokio::test]
            async fn test_create_invalid_data() {
                let store = $factory;
                let err = store
                    .create(data(json!({"profileId": "not-a-number"})))
                    .await
                    .unwrap_err();
                assert!(matches!(err, ServiceError::StoreWrite { .. }));
                assert!(store.scan(&ScanParams::new()).await.unwrap().is_empty());
            }

            #[tokio::test]
            async fn test_update_shallow_merge() {
                let store = $factory;
                let created = store.create(profile_data(5, "Frank")).await.unwrap();

                let updated = store
                    .update(created, &data(json!({"description": "hi", "score": 1.5})))
                    .await
                    .unwrap();
                assert_eq!(updated.description.as_deref(), Some("hi"));
                assert!((updated.score - 1.5).abs() < f64::EPSILON);
                assert_eq!(updated.email, "frank@test.com");

                let reloaded = store
                    .get_by_unique_key("handleLower", &FieldValue::from("frank"))
                    .await
                    .unwrap();
                assert_eq!(reloaded, updated);
            }

            #[tokio::test]
            async fn test_update_idempotent() {
                let store = $factory;
                let created = store.create(profile_data(6, "Grace")).await.unwrap();
                let change = data(json!({"status": "INACTIVE"}));

                let once = store.update(created, &change).await.unwrap();
                let twice = store.update(once.clone(), &change).await.unwrap();
                assert_eq!(once, twice);
                assert_eq!(store.scan(&ScanParams::new()).await.unwrap().len(), 1);
            }

            // ==================================================================
            // Scan / Query
            // ==================================================================

            #[tokio::test]
            async fn test_scan_empty_store() {
                let store = $factory;
                let all = store.scan(&ScanParams::new()).await.unwrap();
                assert!(all.is_empty());
            }

            #[tokio::test]
            async fn test_query_no_match() {
                let store = $factory;
                store.create(profile_data(1, "Alice")).await.unwrap();
                let found = store
                    .query(&QueryDescriptor::for_entity::<TestProfile>("handleLower", "zed"))
                    .await
                    .unwrap();
                assert!(found.is_empty());
            }

            #[tokio::test]
            async fn test_scan_by_variant() {
                let store = $factory;
                store.create(profile_data(1, "Alice")).await.unwrap();
                let mut bob = profile_data(2, "Bob");
                bob.insert("active".into(), json!(false));
                bob.insert("score".into(), json!(2.0));
                store.create(bob).await.unwrap();

                let inactive = store
                    .scan(&ScanParams::new().filter(Condition::eq("active", false)))
                    .await
                    .unwrap();
                assert_eq!(inactive.len(), 1);
                assert_eq!(inactive[0].handle_lower, "bob");

                let by_score = store
                    .scan(&ScanParams::new().filter(Condition::eq("score", 4.5)))
                    .await
                    .unwrap();
                assert_eq!(by_score[0].handle_lower, "alice");

                let by_id = store
                    .scan(&ScanParams::new().filter(Condition::one_of("profileId", [2_i64, 9])))
                    .await
                    .unwrap();
                assert_eq!(by_id.len(), 1);

                let by_email = store
                    .scan(&ScanParams::new().filter(Condition::contains("email", "alice@")))
                    .await
                    .unwrap();
                assert_eq!(by_email.len(), 1);
            }

            #[tokio::test]
            async fn test_query_with_filter_and_limit() {
                let store = $factory;
                for (id, handle) in [(1, "a"), (2, "b"), (3, "c")] {
                    store.create(profile_data(id, handle)).await.unwrap();
                }

                let active = store
                    .query(
                        &QueryDescriptor::new("status", "ACTIVE")
                            .filter(Condition::one_of("handleLower", ["a", "c"])),
                    )
                    .await
                    .unwrap();
                assert_eq!(active.len(), 2);

                let limited = store
                    .query(&QueryDescriptor::new("status", "ACTIVE").limit(1))
                    .await
                    .unwrap();
                assert_eq!(limited.len(), 1);
            }

            // ==================================================================
            // Concurrency
            // ==================================================================

            #[tokio::test]
            async fn test_concurrent_creates() {
                let store = $factory;
                let mut handles = Vec::new();
                for id in 0..10_i64 {
                    let store = store.clone();
                    handles.push(tokio::spawn(async move {
                        store.create(profile_data(id, &format!("user{}", id))).await
                    }));
                }
                for handle in handles {
                    handle.await.unwrap().unwrap();
                }
                assert_eq!(store.scan(&ScanParams::new()).await.unwrap().len(), 10);
            }
        }
    };
}
