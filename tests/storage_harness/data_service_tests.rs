//! Macro-generated test suite for `DataService<Widget>` contract validation.
//!
//! The `data_service_tests!` macro generates a test module that validates any
//! `DataService<Widget>` implementation against the contract the handlers
//! rely on: CRUD, filters, ordering, pagination, bulk operations and
//! concurrent access.
//!
//! # Usage
//!
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//!
//! use storage_harness::*;
//! use backoffice::storage::InMemoryDataService;
//!
//! data_service_tests!(InMemoryDataService::<Widget>::new());
//! ```

/// Generate a full `DataService<Widget>` conformance test suite.
///
/// `$factory` is re-evaluated for each test to ensure isolation. For the
/// concurrent access test the service must also be `Clone + 'static`.
#[macro_export]
macro_rules! data_service_tests {
    ($factory:expr) => {
        mod data_service_contract_tests {
            use super::*;
            use backoffice::core::money::Money;
            use backoffice::core::query::{FilterOp, Query, SortDirection};
            use backoffice::core::service::DataService;
            use uuid::Uuid;

            fn names(widgets: &[Widget]) -> Vec<String> {
                widgets.iter().map(|w| w.name.clone()).collect()
            }

            // ==================================================================
            // CRUD
            // ==================================================================

            #[tokio::test]
            async fn test_insert_and_get() {
                let service = $factory;
                let original = widget("Alice", 3);

                let inserted = service.insert(original.clone()).await.unwrap();
                assert_eq!(inserted, original);

                let fetched = service.get(&original.id).await.unwrap();
                assert_eq!(fetched, Some(original));
            }

            #[tokio::test]
            async fn test_get_missing_is_none() {
                let service = $factory;
                assert!(service.get(&Uuid::new_v4()).await.unwrap().is_none());
            }

            #[tokio::test]
            async fn test_list_empty() {
                let service = $factory;
                assert!(service.list(&Query::new()).await.unwrap().is_empty());
                assert_eq!(service.count(&Query::new()).await.unwrap(), 0);
            }

            #[tokio::test]
            async fn test_insert_many() {
                let service = $factory;
                let inserted = service.insert_many(sample_batch(5)).await.unwrap();
                assert_eq!(inserted.len(), 5);
                assert_eq!(service.count(&Query::new()).await.unwrap(), 5);
            }

            #[tokio::test]
            async fn test_update_existing() {
                let service = $factory;
                let mut record = service.insert(widget("Bob", 1)).await.unwrap();
                record.name = "Robert".to_string();
                record.note = Some("renamed".to_string());

                service.update(&record.id, record.clone()).await.unwrap();
                let fetched = service.get(&record.id).await.unwrap().unwrap();
                assert_eq!(fetched.name, "Robert");
                assert_eq!(fetched.note.as_deref(), Some("renamed"));
            }

            #[tokio::test]
            async fn test_update_missing_fails() {
                let service = $factory;
                let record = widget("Ghost", 1);
                assert!(service.update(&record.id, record.clone()).await.is_err());
            }

            #[tokio::test]
            async fn test_delete() {
                let service = $factory;
                let record = service.insert(widget("Carol", 2)).await.unwrap();
                service.delete(&record.id).await.unwrap();
                assert!(service.get(&record.id).await.unwrap().is_none());
            }

            #[tokio::test]
            async fn test_delete_where_returns_count() {
                let service = $factory;
                service.insert_many(sample_batch(6)).await.unwrap();

                let removed = service
                    .delete_where(&Query::new().eq("active", true))
                    .await
                    .unwrap();
                assert_eq!(removed, 3);
                let left = service.list(&Query::new()).await.unwrap();
                assert!(left.iter().all(|w| !w.active));
            }

            // ==================================================================
            // Filters
            // ==================================================================

            #[tokio::test]
            async fn test_filter_eq_on_strings_and_numbers() {
                let service = $factory;
                service.insert_many(sample_batch(5)).await.unwrap();

                let by_name = service.list(&Query::new().eq("name", "W2")).await.unwrap();
                assert_eq!(names(&by_name), vec!["W2"]);

                let by_quantity = service.list(&Query::new().eq("quantity", 4)).await.unwrap();
                assert_eq!(names(&by_quantity), vec!["W4"]);

                let by_price = service
                    .list(&Query::new().eq("price", Money::from_cents(3_000)))
                    .await
                    .unwrap();
                assert_eq!(names(&by_price), vec!["W3"]);
            }

            #[tokio::test]
            async fn test_filter_ranges_on_dates() {
                let service = $factory;
                service.insert_many(sample_batch(5)).await.unwrap();

                let before = service
                    .list(&Query::new().lt("due_date", date(1, 3)))
                    .await
                    .unwrap();
                assert_eq!(before.len(), 2);

                let window = service
                    .count(&Query::new().gte("due_date", date(1, 2)).lte("due_date", date(1, 4)))
                    .await
                    .unwrap();
                assert_eq!(window, 3);
            }

            #[tokio::test]
            async fn test_filter_contains_is_case_insensitive() {
                let service = $factory;
                service.insert(widget("Hydraulic Press", 1)).await.unwrap();
                service.insert(widget("Conveyor", 2)).await.unwrap();

                let found = service
                    .list(&Query::new().contains("name", "PRESS"))
                    .await
                    .unwrap();
                assert_eq!(names(&found), vec!["Hydraulic Press"]);

                let prefixed = service
                    .list(&Query::new().filter("name", FilterOp::ILike, "conv*"))
                    .await
                    .unwrap();
                assert_eq!(names(&prefixed), vec!["Conveyor"]);
            }

            #[tokio::test]
            async fn test_filter_in_and_null() {
                let service = $factory;
                let mut noted = widget("Noted", 7);
                noted.note = Some("x".to_string());
                service.insert(noted).await.unwrap();
                service.insert_many(sample_batch(3)).await.unwrap();

                let picked = service
                    .count(&Query::new().is_in("name", &["W0", "W2", "missing"]))
                    .await
                    .unwrap();
                assert_eq!(picked, 2);

                let without_note = service
                    .count(&Query::new().filter("note", FilterOp::IsNull, true))
                    .await
                    .unwrap();
                assert_eq!(without_note, 3);
            }

            #[tokio::test]
            async fn test_filter_no_results() {
                let service = $factory;
                service.insert_many(sample_batch(3)).await.unwrap();
                let none = service.list(&Query::new().eq("name", "nope")).await.unwrap();
                assert!(none.is_empty());
            }

            // ==================================================================
            // Ordering & pagination
            // ==================================================================

            #[tokio::test]
            async fn test_order_by_desc() {
                let service = $factory;
                service.insert_many(sample_batch(4)).await.unwrap();
                let ordered = service
                    .list(&Query::new().order_by("quantity", SortDirection::Desc))
                    .await
                    .unwrap();
                assert_eq!(names(&ordered), vec!["W3", "W2", "W1", "W0"]);
            }

            #[tokio::test]
            async fn test_limit_offset_and_count() {
                let service = $factory;
                service.insert_many(sample_batch(10)).await.unwrap();

                let query = Query::new()
                    .eq("active", true)
                    .order_by("quantity", SortDirection::Asc)
                    .limit(2)
                    .offset(1);
                let page = service.list(&query).await.unwrap();
                assert_eq!(names(&page), vec!["W2", "W4"]);

                // Counting ignores the window
                assert_eq!(service.count(&query).await.unwrap(), 5);
            }

            // ==================================================================
            // Concurrency
            // ==================================================================

            #[tokio::test]
            async fn test_concurrent_inserts() {
                let service = $factory;
                let mut handles = Vec::new();
                for i in 0..10 {
                    let svc = service.clone();
                    handles.push(tokio::spawn(async move {
                        svc.insert(widget(&format!("C{}", i), i)).await.unwrap();
                    }));
                }
                for handle in handles {
                    handle.await.unwrap();
                }
                assert_eq!(service.count(&Query::new()).await.unwrap(), 10);
            }
        }
    };
}
