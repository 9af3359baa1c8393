//! End-to-end tests of the HTTP API over the in-memory backend

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{HeaderValue, header};
use axum_test::TestServer;
use axum_test::multipart::{MultipartForm, Part};
use backoffice::core::error::StorageError;
use backoffice::entities::notification::Notification;
use backoffice::entities::quotation::QuoteRequest;
use backoffice::entities::seo::SeoSetting;
use backoffice::notify::RecordingNotifier;
use backoffice::prelude::*;
use chrono::{Datelike, Utc};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const ADMIN: &str = "admin-token";
const STAFF: &str = "staff-token";
const SERVICE_KEY: &str = "service-key";

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
const PDF: &[u8] = b"%PDF-1.7\n%receipt\n";

/// Concrete handles behind the server, kept for inspection and fault injection
struct Harness {
    server: TestServer,
    config: AppConfig,
    clients: InMemoryDataService<Client>,
    bills: InMemoryDataService<Bill>,
    installments: InMemoryDataService<Installment>,
    quotations: InMemoryDataService<Quotation>,
    objects: InMemoryObjectStore,
    notifier: RecordingNotifier,
}

fn test_config() -> AppConfig {
    let mut config = AppConfig::for_tests();
    config.auth.admin_role = Some("admin".to_string());
    config.supabase.service_role_key = Some(SERVICE_KEY.to_string());
    config
}

fn auth_provider() -> StaticAuthProvider {
    StaticAuthProvider::new()
        .with_token(
            ADMIN,
            AuthContext::User {
                user_id: Uuid::new_v4(),
                email: Some("admin@example.com".to_string()),
                roles: vec!["admin".to_string()],
            },
        )
        .with_token(
            STAFF,
            AuthContext::User {
                user_id: Uuid::new_v4(),
                email: Some("staff@example.com".to_string()),
                roles: vec![],
            },
        )
}

/// A table whose `list` answers at most `max_rows` rows, like a capped PostgREST
fn table<T: Record>(max_rows: Option<usize>) -> InMemoryDataService<T> {
    let table = InMemoryDataService::new();
    match max_rows {
        Some(max_rows) => table.with_max_rows(max_rows),
        None => table,
    }
}

fn build_harness(
    config: AppConfig,
    max_rows: Option<usize>,
    seo: Arc<dyn DataService<SeoSetting>>,
) -> Harness {
    let clients = table::<Client>(max_rows);
    let bills = table::<Bill>(max_rows);
    let installments = table::<Installment>(max_rows);
    let quotations = table::<Quotation>(max_rows);
    let objects = InMemoryObjectStore::new("http://storage.test");
    let notifier = RecordingNotifier::new();

    let tables = Tables {
        clients: Arc::new(clients.clone()),
        bills: Arc::new(bills.clone()),
        installments: Arc::new(installments.clone()),
        quotations: Arc::new(quotations.clone()),
        seo,
        notifications: Arc::new(InMemoryDataService::<Notification>::new()),
    };

    let router = ServerBuilder::new()
        .with_config(config.clone())
        .with_tables(tables)
        .with_object_store(objects.clone())
        .with_auth_provider(auth_provider())
        .with_notifier(notifier.clone())
        .build()
        .unwrap();

    Harness {
        server: TestServer::new(router),
        config,
        clients,
        bills,
        installments,
        quotations,
        objects,
        notifier,
    }
}

fn harness_with_seo(seo: Arc<dyn DataService<SeoSetting>>) -> Harness {
    build_harness(test_config(), None, seo)
}

fn harness_with_config(config: AppConfig) -> Harness {
    build_harness(config, None, Arc::new(InMemoryDataService::<SeoSetting>::new()))
}

fn capped_harness(max_rows: usize) -> Harness {
    build_harness(
        test_config(),
        Some(max_rows),
        Arc::new(InMemoryDataService::<SeoSetting>::new()),
    )
}

fn harness() -> Harness {
    harness_with_seo(Arc::new(InMemoryDataService::<SeoSetting>::new()))
}

fn cents(value: &Value) -> i64 {
    (value.as_f64().unwrap() * 100.0).round() as i64
}

async fn create_client(h: &Harness, name: &str) -> Uuid {
    let response = h
        .server
        .post("/clients")
        .authorization_bearer(ADMIN)
        .json(&json!({ "name": name, "email": "contact@acme.example" }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    let body: Value = response.json();
    body["id"].as_str().unwrap().parse().unwrap()
}

async fn create_bill(h: &Harness, client_id: Uuid, first_due: &str, count: u32) -> Value {
    let response = h
        .server
        .post("/bills")
        .authorization_bearer(ADMIN)
        .json(&json!({
            "company_id": client_id,
            "total_amount": 1000.00,
            "bill_type": "receivable",
            "description": "Retrofit of the press line",
            "installment_count": count,
            "first_due_date": first_due,
            "interval_days": 30,
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json()
}

fn receipt_form(bytes: &[u8], file_name: &str, mime: &str) -> MultipartForm {
    MultipartForm::new().add_part(
        "file",
        Part::bytes(bytes.to_vec()).file_name(file_name).mime_type(mime),
    )
}

fn installment_url(bill: &Value, index: usize) -> String {
    format!(
        "/bills/{}/installments/{}",
        bill["id"].as_str().unwrap(),
        bill["installments"][index]["id"].as_str().unwrap()
    )
}

// =============================================================================
// Health and authentication
// =============================================================================

mod auth_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_is_public() {
        let h = harness();
        let response = h.server.get("/health").await;
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.json::<Value>()["status"], "ok");
    }

    #[tokio::test]
    async fn test_missing_token_is_401() {
        let h = harness();
        let response = h.server.get("/bills").await;
        assert_eq!(response.status_code(), 401);
        assert_eq!(response.json::<Value>()["code"], "MISSING_TOKEN");
    }

    #[tokio::test]
    async fn test_unknown_token_is_401() {
        let h = harness();
        let response = h.server.get("/bills").authorization_bearer("nope").await;
        assert_eq!(response.status_code(), 401);
        assert_eq!(response.json::<Value>()["code"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn test_user_without_admin_role_is_403() {
        let h = harness();
        let response = h.server.get("/clients").authorization_bearer(STAFF).await;
        assert_eq!(response.status_code(), 403);
    }

    #[tokio::test]
    async fn test_session_cookie_is_accepted() {
        let h = harness();
        let response = h
            .server
            .get("/clients")
            .add_header(
                header::COOKIE,
                HeaderValue::from_str(&format!("theme=dark; sb-access-token={}", ADMIN)).unwrap(),
            )
            .await;
        assert_eq!(response.status_code(), 200);
    }

    #[tokio::test]
    async fn test_me_returns_caller() {
        let h = harness();
        let response = h.server.get("/auth/me").authorization_bearer(ADMIN).await;
        assert_eq!(response.status_code(), 200);
        let body: Value = response.json();
        assert_eq!(body["kind"], "user");
        assert_eq!(body["email"], "admin@example.com");

        let response = h
            .server
            .get("/auth/me")
            .authorization_bearer(SERVICE_KEY)
            .await;
        assert_eq!(response.json::<Value>()["kind"], "service");
    }

    #[tokio::test]
    async fn test_refresh_with_unknown_token_is_401() {
        let h = harness();
        let response = h
            .server
            .post("/auth/refresh")
            .json(&json!({ "refresh_token": "stale" }))
            .await;
        assert_eq!(response.status_code(), 401);
        assert_eq!(response.json::<Value>()["code"], "REFRESH_FAILED");
    }
}

// =============================================================================
// Clients
// =============================================================================

mod client_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_list_and_search() {
        let h = harness();
        create_client(&h, "Acme Metalúrgica").await;
        create_client(&h, "Borges Plásticos").await;

        let response = h
            .server
            .get("/clients")
            .add_query_param("q", "acme")
            .authorization_bearer(ADMIN)
            .await;
        let body: Value = response.json();
        assert_eq!(body["pagination"]["total"], 1);
        assert_eq!(body["data"][0]["name"], "Acme Metalúrgica");
    }

    #[tokio::test]
    async fn test_blank_name_is_422() {
        let h = harness();
        let response = h
            .server
            .post("/clients")
            .authorization_bearer(ADMIN)
            .json(&json!({ "name": "" }))
            .await;
        assert_eq!(response.status_code(), 422);
        assert_eq!(response.json::<Value>()["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_malformed_json_is_400() {
        let h = harness();
        let response = h
            .server
            .post("/clients")
            .authorization_bearer(ADMIN)
            .bytes(Bytes::from_static(b"{\"name\": "))
            .content_type("application/json")
            .await;
        assert_eq!(response.status_code(), 400);
        assert_eq!(response.json::<Value>()["code"], "MALFORMED_BODY");
    }

    #[tokio::test]
    async fn test_client_with_bills_cannot_be_deleted() {
        let h = harness();
        let client_id = create_client(&h, "Acme").await;
        let bill = create_bill(&h, client_id, "2099-01-10", 1).await;

        let response = h
            .server
            .delete(&format!("/clients/{}", client_id))
            .authorization_bearer(ADMIN)
            .await;
        assert_eq!(response.status_code(), 409);

        let response = h
            .server
            .delete(&format!("/bills/{}", bill["id"].as_str().unwrap()))
            .authorization_bearer(ADMIN)
            .await;
        assert_eq!(response.status_code(), 204);

        let response = h
            .server
            .delete(&format!("/clients/{}", client_id))
            .authorization_bearer(ADMIN)
            .await;
        assert_eq!(response.status_code(), 204);
        assert!(h.clients.is_empty());
    }
}

// =============================================================================
// Bills and installments
// =============================================================================

mod bill_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_bill_with_schedule() {
        let h = harness();
        let client_id = create_client(&h, "Acme").await;
        let bill = create_bill(&h, client_id, "2026-01-31", 3).await;

        let installments = bill["installments"].as_array().unwrap();
        assert_eq!(installments.len(), 3);
        let dates: Vec<&str> = installments
            .iter()
            .map(|i| i["due_date"].as_str().unwrap())
            .collect();
        assert_eq!(dates, vec!["2026-01-31", "2026-03-02", "2026-04-01"]);

        let amounts: Vec<i64> = installments.iter().map(|i| cents(&i["amount"])).collect();
        assert_eq!(amounts, vec![33_334, 33_333, 33_333]);
        assert_eq!(amounts.iter().sum::<i64>(), cents(&bill["total_amount"]));
        assert!(installments.iter().all(|i| i["status"] == "pending"));
        assert_eq!(h.installments.len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_client_is_422() {
        let h = harness();
        let response = h
            .server
            .post("/bills")
            .authorization_bearer(ADMIN)
            .json(&json!({
                "company_id": Uuid::new_v4(),
                "total_amount": 50,
                "bill_type": "payable",
                "installment_count": 1,
                "first_due_date": "2099-05-01",
            }))
            .await;
        assert_eq!(response.status_code(), 422);
        assert!(h.bills.is_empty());
    }

    #[tokio::test]
    async fn test_zero_installments_is_422() {
        let h = harness();
        let client_id = create_client(&h, "Acme").await;
        let response = h
            .server
            .post("/bills")
            .authorization_bearer(ADMIN)
            .json(&json!({
                "company_id": client_id,
                "total_amount": 50,
                "bill_type": "payable",
                "installment_count": 0,
                "first_due_date": "2099-05-01",
            }))
            .await;
        assert_eq!(response.status_code(), 422);
    }

    #[tokio::test]
    async fn test_failed_installment_insert_removes_bill() {
        let h = harness();
        let client_id = create_client(&h, "Acme").await;
        h.installments.fail_writes(true);

        let response = h
            .server
            .post("/bills")
            .authorization_bearer(ADMIN)
            .json(&json!({
                "company_id": client_id,
                "total_amount": 300,
                "bill_type": "receivable",
                "installment_count": 3,
                "first_due_date": "2099-05-01",
            }))
            .await;
        assert_eq!(response.status_code(), 502);
        assert!(h.bills.is_empty());
        assert!(h.installments.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_installment_cannot_be_paid() {
        let h = harness();
        let client_id = create_client(&h, "Acme").await;
        let bill = create_bill(&h, client_id, "2099-01-10", 2).await;
        let url = installment_url(&bill, 0);

        let response = h
            .server
            .put(&url)
            .authorization_bearer(ADMIN)
            .json(&json!({ "status": "cancelled" }))
            .await;
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.json::<Value>()["status"], "cancelled");

        let response = h
            .server
            .put(&url)
            .authorization_bearer(ADMIN)
            .json(&json!({ "status": "paid" }))
            .await;
        assert_eq!(response.status_code(), 409);
        assert_eq!(response.json::<Value>()["code"], "INVALID_STATUS_TRANSITION");
    }

    #[tokio::test]
    async fn test_paying_sets_paid_date() {
        let h = harness();
        let client_id = create_client(&h, "Acme").await;
        let bill = create_bill(&h, client_id, "2099-01-10", 1).await;

        let response = h
            .server
            .put(&installment_url(&bill, 0))
            .authorization_bearer(ADMIN)
            .json(&json!({ "status": "paid", "paid_date": "2099-01-08" }))
            .await;
        let body: Value = response.json();
        assert_eq!(body["status"], "paid");
        assert_eq!(body["paid_date"], "2099-01-08");
    }

    #[tokio::test]
    async fn test_installment_of_other_bill_is_404() {
        let h = harness();
        let client_id = create_client(&h, "Acme").await;
        let first = create_bill(&h, client_id, "2099-01-10", 1).await;
        let second = create_bill(&h, client_id, "2099-01-10", 1).await;

        let url = format!(
            "/bills/{}/installments/{}",
            first["id"].as_str().unwrap(),
            second["installments"][0]["id"].as_str().unwrap()
        );
        let response = h
            .server
            .put(&url)
            .authorization_bearer(ADMIN)
            .json(&json!({ "status": "paid" }))
            .await;
        assert_eq!(response.status_code(), 404);
    }

    #[tokio::test]
    async fn test_overdue_sweep_with_service_key() {
        let h = harness();
        let client_id = create_client(&h, "Acme").await;
        create_bill(&h, client_id, "2020-01-01", 2).await;
        create_bill(&h, client_id, "2099-01-01", 1).await;

        let response = h
            .server
            .post("/bills/overdue-sweep")
            .authorization_bearer(SERVICE_KEY)
            .await;
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.json::<Value>()["updated"], 2);

        let response = h
            .server
            .get("/bills")
            .add_query_param("status", "pending")
            .authorization_bearer(ADMIN)
            .await;
        assert_eq!(response.json::<Value>()["pagination"]["total"], 2);

        let response = h.server.get("/dashboard").authorization_bearer(ADMIN).await;
        assert_eq!(response.status_code(), 200);
        let dashboard: Value = response.json();
        assert_eq!(dashboard["clients"], 1);
        assert_eq!(dashboard["bills"], 2);
        assert_eq!(dashboard["overdue_installments"], 2);
        assert_eq!(cents(&dashboard["overdue_amount"]), 100_000);

        // Running it again finds nothing new
        let response = h
            .server
            .post("/bills/overdue-sweep")
            .authorization_bearer(SERVICE_KEY)
            .await;
        assert_eq!(response.json::<Value>()["updated"], 0);
    }

    #[tokio::test]
    async fn test_malformed_bill_id_is_400() {
        let h = harness();
        let response = h
            .server
            .get("/bills/not-a-uuid")
            .authorization_bearer(ADMIN)
            .await;
        assert_eq!(response.status_code(), 400);
        assert_eq!(response.json::<Value>()["code"], "INVALID_PATH");
    }

    #[tokio::test]
    async fn test_malformed_page_is_400() {
        let h = harness();
        let response = h
            .server
            .get("/bills")
            .add_query_param("page", "abc")
            .authorization_bearer(ADMIN)
            .await;
        assert_eq!(response.status_code(), 400);
        assert_eq!(response.json::<Value>()["code"], "INVALID_QUERY");
    }

    #[tokio::test]
    async fn test_list_filters() {
        let h = harness();
        let acme = create_client(&h, "Acme").await;
        let globex = create_client(&h, "Globex").await;
        let first = create_bill(&h, acme, "2099-01-10", 1).await;
        create_bill(&h, acme, "2099-02-10", 1).await;
        h.server
            .post("/bills")
            .authorization_bearer(ADMIN)
            .json(&json!({
                "company_id": globex,
                "total_amount": 80,
                "bill_type": "payable",
                "installment_count": 1,
                "first_due_date": "2099-03-01",
            }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);
        h.server
            .put(&format!("/bills/{}", first["id"].as_str().unwrap()))
            .authorization_bearer(ADMIN)
            .json(&json!({ "status": "cancelled" }))
            .await
            .assert_status_ok();

        let total = |response: axum_test::TestResponse| {
            response.json::<Value>()["pagination"]["total"].clone()
        };
        let response = h
            .server
            .get("/bills")
            .add_query_param("bill_type", "payable")
            .authorization_bearer(ADMIN)
            .await;
        assert_eq!(total(response), 1);

        let response = h
            .server
            .get("/bills")
            .add_query_param("company_id", acme)
            .authorization_bearer(ADMIN)
            .await;
        assert_eq!(total(response), 2);

        let response = h
            .server
            .get("/bills")
            .add_query_param("status", "cancelled")
            .authorization_bearer(ADMIN)
            .await;
        let body: Value = response.json();
        assert_eq!(body["pagination"]["total"], 1);
        assert_eq!(body["data"][0]["id"], first["id"]);
    }

    #[tokio::test]
    async fn test_update_bill_status_and_client() {
        let h = harness();
        let acme = create_client(&h, "Acme").await;
        let globex = create_client(&h, "Globex").await;
        let bill = create_bill(&h, acme, "2099-01-10", 2).await;
        let url = format!("/bills/{}", bill["id"].as_str().unwrap());

        for status in ["paid", "pending", "cancelled"] {
            let response = h
                .server
                .put(&url)
                .authorization_bearer(ADMIN)
                .json(&json!({ "status": status }))
                .await;
            assert_eq!(response.status_code(), 200);
            let body: Value = response.json();
            assert_eq!(body["status"], status);
            assert_eq!(body["installments"].as_array().unwrap().len(), 2);
        }

        let response = h
            .server
            .put(&url)
            .authorization_bearer(ADMIN)
            .json(&json!({ "status": "paid" }))
            .await;
        assert_eq!(response.status_code(), 409);
        assert_eq!(response.json::<Value>()["code"], "INVALID_STATUS_TRANSITION");

        let response = h
            .server
            .put(&url)
            .authorization_bearer(ADMIN)
            .json(&json!({ "company_id": globex }))
            .await;
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.json::<Value>()["company_id"], globex.to_string());

        let response = h
            .server
            .put(&url)
            .authorization_bearer(ADMIN)
            .json(&json!({ "company_id": Uuid::new_v4() }))
            .await;
        assert_eq!(response.status_code(), 422);
        assert_eq!(response.json::<Value>()["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_delete_bill_removes_installments_and_receipts() {
        let h = harness();
        let client_id = create_client(&h, "Acme").await;
        let bill = create_bill(&h, client_id, "2099-01-10", 2).await;
        let other = create_bill(&h, client_id, "2099-01-10", 1).await;
        let bucket = h.config.storage.receipts_bucket.clone();

        h.server
            .post(&format!("{}/receipt", installment_url(&bill, 1)))
            .authorization_bearer(ADMIN)
            .multipart(receipt_form(PDF, "receipt.pdf", "application/pdf"))
            .await
            .assert_status_ok();
        assert_eq!(h.objects.paths(&bucket).len(), 1);

        let url = format!("/bills/{}", bill["id"].as_str().unwrap());
        let response = h.server.delete(&url).authorization_bearer(ADMIN).await;
        assert_eq!(response.status_code(), 204);

        assert_eq!(h.bills.len(), 1);
        assert_eq!(h.installments.len(), 1);
        assert!(h.objects.paths(&bucket).is_empty());

        let response = h.server.get(&url).authorization_bearer(ADMIN).await;
        assert_eq!(response.status_code(), 404);
        let response = h
            .server
            .get(&format!("/bills/{}", other["id"].as_str().unwrap()))
            .authorization_bearer(ADMIN)
            .await;
        assert_eq!(response.status_code(), 200);
    }

    #[tokio::test]
    async fn test_overdue_sweep_reads_past_row_cap() {
        let h = capped_harness(2);
        let client_id = create_client(&h, "Acme").await;
        let bill = create_bill(&h, client_id, "2020-01-01", 5).await;

        let response = h
            .server
            .post("/bills/overdue-sweep")
            .authorization_bearer(SERVICE_KEY)
            .await;
        assert_eq!(response.json::<Value>()["updated"], 5);

        let response = h
            .server
            .get(&format!("/bills/{}", bill["id"].as_str().unwrap()))
            .authorization_bearer(ADMIN)
            .await;
        let body: Value = response.json();
        let installments = body["installments"].as_array().unwrap();
        assert_eq!(installments.len(), 5);
        assert!(installments.iter().all(|i| i["status"] == "overdue"));

        let response = h.server.get("/dashboard").authorization_bearer(ADMIN).await;
        let dashboard: Value = response.json();
        assert_eq!(dashboard["overdue_installments"], 5);
        assert_eq!(cents(&dashboard["overdue_amount"]), 100_000);
    }
}

// =============================================================================
// Receipts
// =============================================================================

mod receipt_tests {
    use super::*;

    #[tokio::test]
    async fn test_attach_and_detach_receipt() {
        let h = harness();
        let client_id = create_client(&h, "Acme").await;
        let bill = create_bill(&h, client_id, "2099-01-10", 2).await;
        let url = format!("{}/receipt", installment_url(&bill, 0));
        let bucket = h.config.storage.receipts_bucket.clone();

        let response = h
            .server
            .post(&url)
            .authorization_bearer(ADMIN)
            .multipart(receipt_form(PDF, "comprovante março.pdf", "application/pdf"))
            .await;
        assert_eq!(response.status_code(), 200);
        let installment: Value = response.json();
        assert_eq!(installment["status"], "paid");
        let path = installment["receipt_path"].as_str().unwrap().to_string();
        assert!(installment["receipt_url"].as_str().unwrap().ends_with(&path));
        assert!(h.objects.contains(&bucket, &path));

        let response = h.server.delete(&url).authorization_bearer(ADMIN).await;
        assert_eq!(response.status_code(), 200);
        let installment: Value = response.json();
        assert!(installment["receipt_path"].is_null());
        assert_eq!(installment["status"], "paid");
        assert!(h.objects.paths(&bucket).is_empty());

        let response = h.server.delete(&url).authorization_bearer(ADMIN).await;
        assert_eq!(response.status_code(), 404);
    }

    #[tokio::test]
    async fn test_non_pdf_is_415() {
        let h = harness();
        let client_id = create_client(&h, "Acme").await;
        let bill = create_bill(&h, client_id, "2099-01-10", 1).await;

        let response = h
            .server
            .post(&format!("{}/receipt", installment_url(&bill, 0)))
            .authorization_bearer(ADMIN)
            .multipart(receipt_form(PNG, "receipt.png", "image/png"))
            .await;
        assert_eq!(response.status_code(), 415);
        assert!(
            h.objects
                .paths(&h.config.storage.receipts_bucket)
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_failed_update_removes_uploaded_receipt() {
        let h = harness();
        let client_id = create_client(&h, "Acme").await;
        let bill = create_bill(&h, client_id, "2099-01-10", 1).await;
        h.installments.fail_writes(true);

        let response = h
            .server
            .post(&format!("{}/receipt", installment_url(&bill, 0)))
            .authorization_bearer(ADMIN)
            .multipart(receipt_form(PDF, "receipt.pdf", "application/pdf"))
            .await;
        assert_eq!(response.status_code(), 502);
        assert!(
            h.objects
                .paths(&h.config.storage.receipts_bucket)
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_detach_succeeds_when_file_removal_fails() {
        let h = harness();
        let client_id = create_client(&h, "Acme").await;
        let bill = create_bill(&h, client_id, "2099-01-10", 1).await;
        let url = format!("{}/receipt", installment_url(&bill, 0));

        h.server
            .post(&url)
            .authorization_bearer(ADMIN)
            .multipart(receipt_form(PDF, "receipt.pdf", "application/pdf"))
            .await
            .assert_status_ok();

        h.objects.fail_removals(true);
        let response = h.server.delete(&url).authorization_bearer(ADMIN).await;
        assert_eq!(response.status_code(), 200);
        assert!(response.json::<Value>()["receipt_path"].is_null());
    }

    #[tokio::test]
    async fn test_cancelled_installment_rejects_receipt_before_upload() {
        let h = harness();
        let client_id = create_client(&h, "Acme").await;
        let bill = create_bill(&h, client_id, "2099-01-10", 1).await;
        let url = installment_url(&bill, 0);

        h.server
            .put(&url)
            .authorization_bearer(ADMIN)
            .json(&json!({ "status": "cancelled" }))
            .await
            .assert_status_ok();

        let response = h
            .server
            .post(&format!("{}/receipt", url))
            .authorization_bearer(ADMIN)
            .multipart(receipt_form(PDF, "receipt.pdf", "application/pdf"))
            .await;
        assert_eq!(response.status_code(), 409);
        assert!(
            h.objects
                .paths(&h.config.storage.receipts_bucket)
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_oversized_receipt_is_413() {
        let mut config = test_config();
        config.uploads.max_receipt_bytes = 16;
        let h = harness_with_config(config);
        let client_id = create_client(&h, "Acme").await;
        let bill = create_bill(&h, client_id, "2099-01-10", 1).await;

        let mut pdf = PDF.to_vec();
        pdf.extend_from_slice(&[b'0'; 64]);
        let response = h
            .server
            .post(&format!("{}/receipt", installment_url(&bill, 0)))
            .authorization_bearer(ADMIN)
            .multipart(receipt_form(&pdf, "receipt.pdf", "application/pdf"))
            .await;
        assert_eq!(response.status_code(), 413);
        assert_eq!(response.json::<Value>()["code"], "UPLOAD_TOO_LARGE");
    }
}

// =============================================================================
// Quotations
// =============================================================================

mod quotation_tests {
    use super::*;

    async fn wait_for_push(notifier: &RecordingNotifier) -> Vec<PushMessage> {
        for _ in 0..50 {
            let sent = notifier.sent();
            if !sent.is_empty() {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        notifier.sent()
    }

    #[tokio::test]
    async fn test_public_quote_requests_are_numbered() {
        let h = harness();
        let year = Utc::now().year();
        let request = json!({
            "name": "Ana Souza",
            "email": "ana@example.com",
            "company": "Metalúrgica Sul",
            "message": "Retrofit of a press line",
        });

        let response = h.server.post("/quotations/request").json(&request).await;
        assert_eq!(response.status_code(), 201);
        assert_eq!(
            response.json::<Value>()["number"],
            format!("Q-{}-0001", year)
        );

        let response = h.server.post("/quotations/request").json(&request).await;
        assert_eq!(
            response.json::<Value>()["number"],
            format!("Q-{}-0002", year)
        );
        assert_eq!(h.quotations.len(), 2);

        let sent = wait_for_push(&h.notifier).await;
        assert!(!sent.is_empty());
        assert_eq!(sent[0].title, "New quote request");
        assert!(sent[0].body.contains("Ana Souza (Metalúrgica Sul)"));
    }

    #[tokio::test]
    async fn test_invalid_quote_request_is_422() {
        let h = harness();
        let response = h
            .server
            .post("/quotations/request")
            .json(&json!({ "name": "Ana", "email": "not-an-email", "message": "hi" }))
            .await;
        assert_eq!(response.status_code(), 422);
        assert!(h.quotations.is_empty());
    }

    #[tokio::test]
    async fn test_quotation_lifecycle() {
        let h = harness();
        let response = h
            .server
            .post("/quotations")
            .authorization_bearer(ADMIN)
            .json(&json!({
                "client_name": "Acme",
                "items": [
                    { "description": "CLP panel", "quantity": 2, "unit_price": 125.50 },
                    { "description": "Commissioning", "quantity": 1, "unit_price": 99.00 },
                ],
            }))
            .await;
        assert_eq!(response.status_code(), 201);
        let quotation: Value = response.json();
        assert_eq!(quotation["status"], "draft");
        assert_eq!(cents(&quotation["total"]), 35_000);
        let url = format!("/quotations/{}", quotation["id"].as_str().unwrap());

        for status in ["sent", "approved"] {
            let response = h
                .server
                .put(&url)
                .authorization_bearer(ADMIN)
                .json(&json!({ "status": status }))
                .await;
            assert_eq!(response.status_code(), 200);
            assert_eq!(response.json::<Value>()["status"], status);
        }

        let response = h
            .server
            .put(&url)
            .authorization_bearer(ADMIN)
            .json(&json!({ "status": "draft" }))
            .await;
        assert_eq!(response.status_code(), 409);

        let response = h.server.delete(&url).authorization_bearer(ADMIN).await;
        assert_eq!(response.status_code(), 204);
        assert!(h.quotations.is_empty());
    }

    #[tokio::test]
    async fn test_quotation_needs_a_client() {
        let h = harness();
        let response = h
            .server
            .post("/quotations")
            .authorization_bearer(ADMIN)
            .json(&json!({ "items": [] }))
            .await;
        assert_eq!(response.status_code(), 422);
    }

    #[tokio::test]
    async fn test_numbers_continue_past_four_digits() {
        let h = harness();
        let year = Utc::now().year();
        for sequence in ["9999", "10000"] {
            let seeded = Quotation::from_request(
                QuoteRequest {
                    name: "Ana Souza".to_string(),
                    email: "ana@example.com".to_string(),
                    phone: None,
                    company: None,
                    message: "Spare parts".to_string(),
                },
                format!("Q-{}-{}", year, sequence),
            );
            h.quotations.insert(seeded).await.unwrap();
        }

        let response = h
            .server
            .post("/quotations")
            .authorization_bearer(ADMIN)
            .json(&json!({ "client_name": "Acme" }))
            .await;
        assert_eq!(response.status_code(), 201);
        assert_eq!(
            response.json::<Value>()["number"],
            format!("Q-{}-10001", year)
        );
    }

    #[tokio::test]
    async fn test_negative_unit_price_is_422() {
        let h = harness();
        let response = h
            .server
            .post("/quotations")
            .authorization_bearer(ADMIN)
            .json(&json!({
                "client_name": "Acme",
                "items": [{ "description": "Discount", "quantity": 1, "unit_price": -50.00 }],
            }))
            .await;
        assert_eq!(response.status_code(), 422);
        assert!(h.quotations.is_empty());
    }
}

// =============================================================================
// SEO, sitemap and Open Graph image
// =============================================================================

/// SEO table whose every call fails
struct FailingSeo;

fn unavailable() -> StorageError {
    StorageError::Unavailable {
        backend: "postgrest".to_string(),
        message: "connection refused".to_string(),
    }
}

#[async_trait]
impl DataService<SeoSetting> for FailingSeo {
    async fn insert(&self, _record: SeoSetting) -> Result<SeoSetting, StorageError> {
        Err(unavailable())
    }

    async fn insert_many(&self, _records: Vec<SeoSetting>) -> Result<Vec<SeoSetting>, StorageError> {
        Err(unavailable())
    }

    async fn get(&self, _id: &Uuid) -> Result<Option<SeoSetting>, StorageError> {
        Err(unavailable())
    }

    async fn list(&self, _query: &Query) -> Result<Vec<SeoSetting>, StorageError> {
        Err(unavailable())
    }

    async fn count(&self, _query: &Query) -> Result<usize, StorageError> {
        Err(unavailable())
    }

    async fn update(&self, _id: &Uuid, _record: SeoSetting) -> Result<SeoSetting, StorageError> {
        Err(unavailable())
    }

    async fn delete(&self, _id: &Uuid) -> Result<(), StorageError> {
        Err(unavailable())
    }

    async fn delete_where(&self, _query: &Query) -> Result<usize, StorageError> {
        Err(unavailable())
    }
}

mod site_tests {
    use super::*;

    #[tokio::test]
    async fn test_page_seo_defaults_when_unset() {
        let h = harness();
        let response = h
            .server
            .get("/seo/page")
            .add_query_param("path", "/services")
            .await;
        assert_eq!(response.status_code(), 200);
        let seo: Value = response.json();
        assert_eq!(seo["is_default"], true);
        assert_eq!(seo["canonical_url"], "https://example.com/services");
    }

    #[tokio::test]
    async fn test_page_seo_rejects_relative_path() {
        let h = harness();
        let response = h
            .server
            .get("/seo/page")
            .add_query_param("path", "services")
            .await;
        assert_eq!(response.status_code(), 400);
    }

    #[tokio::test]
    async fn test_upsert_list_and_delete_seo() {
        let h = harness();
        let input = json!({
            "page_path": "/cases/press-retrofit",
            "title": "Press retrofit",
            "description": "Hydraulic press line modernised",
        });

        let response = h
            .server
            .put("/seo")
            .authorization_bearer(ADMIN)
            .json(&input)
            .await;
        assert_eq!(response.status_code(), 201);
        let id = response.json::<Value>()["id"].as_str().unwrap().to_string();

        let mut changed = input.clone();
        changed["title"] = json!("Press line retrofit");
        let response = h
            .server
            .put("/seo")
            .authorization_bearer(ADMIN)
            .json(&changed)
            .await;
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.json::<Value>()["id"], id.as_str());

        let response = h
            .server
            .get("/seo/page")
            .add_query_param("path", "/cases/press-retrofit")
            .await;
        let seo: Value = response.json();
        assert_eq!(seo["is_default"], false);
        assert_eq!(seo["title"], "Press line retrofit");

        let response = h.server.get("/seo").await;
        assert_eq!(response.json::<Value>()["pagination"]["total"], 1);

        let sitemap = h.server.get("/sitemap.xml").await.text();
        assert!(sitemap.contains("<loc>https://example.com/cases/press-retrofit</loc>"));

        let response = h
            .server
            .delete(&format!("/seo/{}", id))
            .authorization_bearer(ADMIN)
            .await;
        assert_eq!(response.status_code(), 204);
        let response = h
            .server
            .delete(&format!("/seo/{}", id))
            .authorization_bearer(ADMIN)
            .await;
        assert_eq!(response.status_code(), 404);
    }

    #[tokio::test]
    async fn test_seo_writes_need_admin() {
        let h = harness();
        let response = h
            .server
            .put("/seo")
            .json(&json!({ "page_path": "/", "title": "Home" }))
            .await;
        assert_eq!(response.status_code(), 401);
    }

    #[tokio::test]
    async fn test_sitemap_falls_back_to_static_pages() {
        let h = harness_with_seo(Arc::new(FailingSeo));
        let response = h.server.get("/sitemap.xml").await;
        assert_eq!(response.status_code(), 200);
        assert!(
            response
                .header("content-type")
                .to_str()
                .unwrap()
                .starts_with("application/xml")
        );
        let body = response.text();
        assert!(body.starts_with("<?xml"));
        for page in &h.config.site.static_pages {
            assert!(body.contains(&format!("<loc>{}</loc>", h.config.site.url(&page.path))));
        }
    }

    #[tokio::test]
    async fn test_og_image_is_svg() {
        let h = harness();
        let response = h
            .server
            .get("/og-image")
            .add_query_param("title", "Automation & control")
            .await;
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.header("content-type"), "image/svg+xml");
        let body = response.text();
        assert!(body.contains("<svg"));
        assert!(body.contains("Automation &amp; control"));
    }
}

// =============================================================================
// Notifications and uploads
// =============================================================================

mod misc_tests {
    use super::*;

    #[tokio::test]
    async fn test_manual_notification_is_sent_and_recorded() {
        let h = harness();
        let response = h
            .server
            .post("/notifications")
            .authorization_bearer(ADMIN)
            .json(&json!({ "title": "Maintenance", "body": "Portal offline at 22h" }))
            .await;
        assert_eq!(response.status_code(), 201);
        let notification: Value = response.json();
        assert_eq!(notification["sent"], true);
        assert!(notification["error"].is_null());
        assert!(h.notifier.sent().iter().any(|m| m.title == "Maintenance"));

        let response = h
            .server
            .get("/notifications")
            .authorization_bearer(ADMIN)
            .await;
        assert_eq!(response.json::<Value>()["pagination"]["total"], 1);
    }

    #[tokio::test]
    async fn test_upload_and_remove_image() {
        let h = harness();
        let form = MultipartForm::new()
            .add_text("folder", "projects")
            .add_part(
                "file",
                Part::bytes(PNG.to_vec())
                    .file_name("painel elétrico.png")
                    .mime_type("image/png"),
            );
        let response = h
            .server
            .post("/uploads")
            .authorization_bearer(ADMIN)
            .multipart(form)
            .await;
        assert_eq!(response.status_code(), 201);
        let uploaded: Value = response.json();
        let path = uploaded["path"].as_str().unwrap().to_string();
        assert!(path.starts_with("projects/"));
        assert_eq!(uploaded["content_type"], "image/png");
        assert!(h.objects.contains(&h.config.storage.images_bucket, &path));

        let response = h
            .server
            .delete("/uploads")
            .add_query_param("path", &path)
            .authorization_bearer(ADMIN)
            .await;
        assert_eq!(response.status_code(), 204);
        assert!(!h.objects.contains(&h.config.storage.images_bucket, &path));
    }

    #[tokio::test]
    async fn test_upload_rejects_pdf() {
        let h = harness();
        let response = h
            .server
            .post("/uploads")
            .authorization_bearer(ADMIN)
            .multipart(receipt_form(PDF, "doc.pdf", "application/pdf"))
            .await;
        assert_eq!(response.status_code(), 415);
    }

    #[tokio::test]
    async fn test_remove_rejects_traversal() {
        let h = harness();
        let response = h
            .server
            .delete("/uploads")
            .add_query_param("path", "../receipts/secret.pdf")
            .authorization_bearer(ADMIN)
            .await;
        assert_eq!(response.status_code(), 400);
        assert_eq!(response.json::<Value>()["code"], "UPLOAD_INVALID_PATH");
    }

    #[tokio::test]
    async fn test_upload_folder_is_sanitized() {
        let h = harness();
        let form = MultipartForm::new()
            .add_text("folder", "my docs?x#y/../2026")
            .add_part(
                "file",
                Part::bytes(PNG.to_vec())
                    .file_name("logo.png")
                    .mime_type("image/png"),
            );
        let response = h
            .server
            .post("/uploads")
            .authorization_bearer(ADMIN)
            .multipart(form)
            .await;
        assert_eq!(response.status_code(), 201);
        let path = response.json::<Value>()["path"].as_str().unwrap().to_string();
        assert!(path.starts_with("my_docs_x_y/2026/"), "{}", path);
        assert!(h.objects.contains(&h.config.storage.images_bucket, &path));
    }

    #[tokio::test]
    async fn test_oversized_json_is_413() {
        let mut config = test_config();
        config.server.max_body_bytes = 1024;
        let h = harness_with_config(config);
        let response = h
            .server
            .post("/clients")
            .authorization_bearer(ADMIN)
            .json(&json!({ "name": "Acme", "notes": "x".repeat(4096) }))
            .await;
        assert_eq!(response.status_code(), 413);
        assert_eq!(response.json::<Value>()["code"], "BODY_TOO_LARGE");
        assert!(h.clients.is_empty());
    }

    #[tokio::test]
    async fn test_uploads_are_not_bound_by_json_limit() {
        let mut config = test_config();
        config.server.max_body_bytes = 1024;
        let h = harness_with_config(config);
        let mut png = PNG.to_vec();
        png.extend_from_slice(&[0u8; 8 * 1024]);
        let form = MultipartForm::new().add_part(
            "file",
            Part::bytes(png).file_name("banner.png").mime_type("image/png"),
        );
        let response = h
            .server
            .post("/uploads")
            .authorization_bearer(ADMIN)
            .multipart(form)
            .await;
        assert_eq!(response.status_code(), 201);
        assert!(response.json::<Value>()["path"].as_str().unwrap().starts_with("uploads/"));
    }
}
