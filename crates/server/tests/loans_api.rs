use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::Service;

use server::routes::{self, ServerState};
use service::loan::repository::mock::MockLoanRepository;

fn cors() -> tower_http::cors::CorsLayer { tower_http::cors::CorsLayer::very_permissive() }

fn build_app() -> (Arc<MockLoanRepository>, Router) {
    let repo = Arc::new(MockLoanRepository::default());
    let app = routes::build_router(ServerState::new(repo.clone()), cors());
    (repo, app)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> anyhow::Result<(StatusCode, Value)> {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            req = req.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&v)?)
        }
        None => Body::empty(),
    };
    let resp = app.clone().call(req.body(body)?).await?;
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await?;
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
    Ok((status, json))
}

fn loan_body(document: &str) -> Value {
    json!({
        "applicant_name": "Juan Pérez García",
        "requested_amount": "15000.00",
        "currency": "EUR",
        "document": document
    })
}

#[tokio::test]
async fn health_is_ok() -> anyhow::Result<()> {
    let (_repo, app) = build_app();
    let (status, body) = send(&app, "GET", "/health", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn create_returns_201_with_pending_loan() -> anyhow::Result<()> {
    let (repo, app) = build_app();

    let (status, body) = send(&app, "POST", "/api/loans", Some(loan_body("12345678A"))).await?;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "PENDING");
    assert_eq!(body["document"], "12345678A");
    assert_eq!(body["requested_amount"], "15000.00");
    assert!(body["id"].is_i64());
    assert!(body["created_at"].is_string());
    assert!(body["updated_at"].is_null());
    assert!(body["updated_by"].is_null());
    assert_eq!(repo.writes(), 1);
    Ok(())
}

#[tokio::test]
async fn numeric_amount_is_accepted() -> anyhow::Result<()> {
    let (_repo, app) = build_app();
    let mut body = loan_body("X1234567L");
    body["requested_amount"] = json!(2500.5);

    let (status, resp) = send(&app, "POST", "/api/loans", Some(body)).await?;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(resp["requested_amount"], "2500.5");
    Ok(())
}

#[tokio::test]
async fn duplicate_document_is_409_and_not_stored() -> anyhow::Result<()> {
    let (repo, app) = build_app();
    send(&app, "POST", "/api/loans", Some(loan_body("12345678A"))).await?;

    let (status, body) = send(&app, "POST", "/api/loans", Some(loan_body("12345678A"))).await?;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], 409);
    assert_eq!(body["error"], "Conflict");
    assert_eq!(body["path"], "/api/loans");
    assert!(body["message"].as_str().unwrap_or_default().contains("12345678A"));
    assert_eq!(repo.writes(), 1);
    Ok(())
}

#[tokio::test]
async fn invalid_fields_are_all_reported() -> anyhow::Result<()> {
    let (repo, app) = build_app();
    let body = json!({ "applicant_name": "", "requested_amount": -5, "currency": "euro" });

    let (status, resp) = send(&app, "POST", "/api/loans", Some(body)).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["error"], "Bad Request");
    let errs = resp["validation_errors"].as_object().cloned().unwrap_or_default();
    for field in ["applicant_name", "requested_amount", "currency", "document"] {
        assert!(errs.contains_key(field), "missing error for {field}");
    }
    assert_eq!(repo.writes(), 0);
    Ok(())
}

#[tokio::test]
async fn amounts_the_column_cannot_hold_are_400() -> anyhow::Result<()> {
    let (repo, app) = build_app();

    for (document, amount) in [("12345678A", json!("0.001")), ("X1234567L", json!(1e14))] {
        let mut body = loan_body(document);
        body["requested_amount"] = amount;

        let (status, resp) = send(&app, "POST", "/api/loans", Some(body)).await?;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(resp["validation_errors"]["requested_amount"].is_string());
    }
    assert_eq!(repo.writes(), 0);
    Ok(())
}

#[tokio::test]
async fn malformed_json_is_400() -> anyhow::Result<()> {
    let (_repo, app) = build_app();
    let req = Request::builder()
        .method("POST")
        .uri("/api/loans")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))?;
    let resp = app.clone().call(req).await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn get_by_id_and_list() -> anyhow::Result<()> {
    let (_repo, app) = build_app();
    let (_, a) = send(&app, "POST", "/api/loans", Some(loan_body("12345678A"))).await?;
    send(&app, "POST", "/api/loans", Some(loan_body("Y7654321Z"))).await?;

    let (status, one) = send(&app, "GET", &format!("/api/loans/{}", a["id"]), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(one["document"], "12345678A");

    let (status, all) = send(&app, "GET", "/api/loans", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().map(Vec::len), Some(2));
    Ok(())
}

#[tokio::test]
async fn unknown_id_is_404_with_error_body() -> anyhow::Result<()> {
    let (_repo, app) = build_app();

    let (status, body) = send(&app, "GET", "/api/loans/999", None).await?;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not Found");
    assert_eq!(body["path"], "/api/loans/999");
    assert!(body.get("validation_errors").is_none());
    Ok(())
}

#[tokio::test]
async fn non_numeric_id_is_400() -> anyhow::Result<()> {
    let (_repo, app) = build_app();
    let (status, _) = send(&app, "GET", "/api/loans/abc", None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn approve_then_cancel_then_reject_is_conflict() -> anyhow::Result<()> {
    let (repo, app) = build_app();
    let (_, created) = send(&app, "POST", "/api/loans", Some(loan_body("12345678A"))).await?;
    let uri = format!("/api/loans/{}/status", created["id"]);

    let (status, approved) =
        send(&app, "PATCH", &uri, Some(json!({"status": "APPROVED", "modified_by": "alice"}))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "APPROVED");
    assert_eq!(approved["updated_by"], "alice");
    assert!(approved["updated_at"].is_string());
    assert_eq!(approved["created_at"], created["created_at"]);

    let (status, cancelled) =
        send(&app, "PATCH", &uri, Some(json!({"status": "CANCELLED", "modified_by": "bob"}))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "CANCELLED");
    assert_eq!(cancelled["updated_by"], "bob");

    let (status, err) =
        send(&app, "PATCH", &uri, Some(json!({"status": "REJECTED", "modified_by": "bob"}))).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    let msg = err["message"].as_str().unwrap_or_default();
    assert!(msg.contains("CANCELLED") && msg.contains("REJECTED"));
    assert_eq!(repo.writes(), 3);
    Ok(())
}

#[tokio::test]
async fn status_change_validation_and_missing_loan() -> anyhow::Result<()> {
    let (_repo, app) = build_app();

    let (status, body) =
        send(&app, "PATCH", "/api/loans/1/status", Some(json!({"status": "ARCHIVED", "modified_by": " "}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["validation_errors"]["status"].is_string());
    assert!(body["validation_errors"]["modified_by"].is_string());

    let (status, _) =
        send(&app, "PATCH", "/api/loans/1/status", Some(json!({"status": "APPROVED", "modified_by": "alice"}))).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn storage_outage_is_opaque_500() -> anyhow::Result<()> {
    let (repo, app) = build_app();
    repo.set_unavailable(true);

    let (status, body) = send(&app, "GET", "/api/loans", None).await?;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal Server Error");
    assert!(!body["message"].as_str().unwrap_or_default().contains("unavailable"));
    Ok(())
}

#[tokio::test]
async fn openapi_and_metrics_are_served() -> anyhow::Result<()> {
    let (_repo, app) = build_app();
    send(&app, "POST", "/api/loans", Some(loan_body("12345678A"))).await?;

    let (status, doc) = send(&app, "GET", "/api-docs/openapi.json", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/api/loans/{id}/status"].is_object());

    let resp = app.clone().call(Request::builder().uri("/metrics").body(Body::empty())?).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let text = String::from_utf8(to_bytes(resp.into_body(), usize::MAX).await?.to_vec())?;
    assert!(text.contains("loan_api_loans_created_total"));
    Ok(())
}
