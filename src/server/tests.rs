use std::sync::Arc;
use std::time::Duration as StdDuration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Duration;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::{build_router, AppState};
use crate::clock::test_support::MutableClock;
use crate::db;
use crate::settings::PollScope;
use crate::worker::JobQueue;

struct TestApp {
    _dir: tempfile::TempDir,
    router: Router,
    clock: Arc<MutableClock>,
}

fn test_app(poll_scope: PollScope) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("api.db");
    db::open(&db_path).unwrap();
    let clock = Arc::new(MutableClock::at_epoch());
    let state = AppState {
        queue: JobQueue::start(db_path.clone(), clock.clone(), 1),
        db_path,
        secret: b"test-secret".to_vec(),
        token_ttl: Duration::minutes(40),
        poll_scope,
        clock: clock.clone(),
    };
    TestApp {
        _dir: dir,
        router: build_router(Arc::new(state)),
        clock,
    }
}

impl TestApp {
    async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn json(&self, method: &str, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut req = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(req.body(Body::from(body.to_string())).unwrap()).await
    }

    async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        let req = Request::builder()
            .uri(uri)
            .header("token", token)
            .body(Body::empty())
            .unwrap();
        self.send(req).await
    }

    async fn upload(&self, kind: &str, token: &str, filename: &str, content: &str) -> (StatusCode, Value) {
        let boundary = "fintrack-test-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: text/csv\r\n\r\n\
             {content}\r\n\
             --{boundary}--\r\n"
        );
        let req = Request::builder()
            .method("POST")
            .uri(format!("/upload/{kind}"))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
            .body(Body::from(body))
            .unwrap();
        self.send(req).await
    }

    async fn sign_up_and_in(&self, username: &str) -> String {
        let (status, _) = self
            .json(
                "POST",
                "/signup/",
                None,
                json!({
                    "first_name": "Ada",
                    "last_name": "Lovelace",
                    "date_of_birth": "1990-12-10",
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": "Sup3r$ecret",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = self
            .json("POST", "/signin/", None, json!({"username": username, "password": "Sup3r$ecret"}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_type"], "bearer");
        body["access_token"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_health() {
    let app = test_app(PollScope::Owner);
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_signup_conflict_and_bad_credentials() {
    let app = test_app(PollScope::Owner);
    app.sign_up_and_in("adalove").await;

    let (status, body) = app
        .json(
            "POST",
            "/signup/",
            None,
            json!({
                "first_name": "A", "last_name": "B", "date_of_birth": "1990-01-01",
                "username": "adalove", "email": "other@example.com", "password": "x",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("already exists"));

    let (status, _) = app
        .json("POST", "/signin/", None, json!({"username": "adalove", "password": "wrong"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_requests_without_valid_token_are_rejected() {
    let app = test_app(PollScope::Owner);
    let req = Request::builder().uri("/income/").body(Body::empty()).unwrap();
    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(resp.headers()[header::WWW_AUTHENTICATE], "Bearer");

    let (status, body) = app.get("/income/", "not.a-token").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Invalid token");
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let app = test_app(PollScope::Owner);
    let token = app.sign_up_and_in("adalove").await;
    app.clock.advance(Duration::minutes(41));
    let (status, body) = app.get("/financial-summary/", &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Token has expired");
}

#[tokio::test]
async fn test_income_crud_is_owner_scoped() {
    let app = test_app(PollScope::Owner);
    let alice = app.sign_up_and_in("alice1").await;
    let bob = app.sign_up_and_in("bobby1").await;

    let (status, body) = app
        .json("POST", "/income/", Some(alice.as_str()), json!({"amount": 1500.0, "source": "Salary"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["id"].as_i64().unwrap();

    let uri = format!("/income/{id}");
    let (status, body) = app
        .json("PUT", &uri, Some(bob.as_str()), json!({"amount": 1.0, "source": "Stolen"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Income not found");

    let (status, _) = app
        .json("PUT", &uri, Some(alice.as_str()), json!({"amount": 1600.0, "source": "Salary"}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, list) = app.get("/income/?min_amount=1000", &alice).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["amount"], 1600.0);
    let (_, list) = app.get("/income/", &bob).await;
    assert!(list.as_array().unwrap().is_empty());

    let (status, _) = app.json("DELETE", &uri, Some(alice.as_str()), Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.json("DELETE", &uri, Some(alice.as_str()), Value::Null).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_negative_amount_is_bad_request() {
    let app = test_app(PollScope::Owner);
    let token = app.sign_up_and_in("alice1").await;
    let (status, _) = app
        .json(
            "POST",
            "/expense/",
            Some(token.as_str()),
            json!({"amount": -5.0, "category": "Food", "description": "Lunch"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_financial_summary() {
    let app = test_app(PollScope::Owner);
    let token = app.sign_up_and_in("alice1").await;
    app.json("POST", "/income/", Some(token.as_str()), json!({"amount": 100.0, "source": "Gift"}))
        .await;
    app.json(
        "POST",
        "/expense/",
        Some(token.as_str()),
        json!({"amount": 30.0, "category": "Food", "description": "Groceries"}),
    )
    .await;

    let (status, body) = app.get("/financial-summary/", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_income"], 100.0);
    assert_eq!(body["total_expenses"], 30.0);
    assert_eq!(body["balance"], 70.0);
}

#[tokio::test]
async fn test_small_upload_is_processed_inline() {
    let app = test_app(PollScope::Owner);
    let token = app.sign_up_and_in("alice1").await;
    let csv = "amount,source\n100,Salary\n20,Gift\n,Bonus\n5,Tips\n7,Interest";

    let (status, body) = app.upload("income", &token, "incomes.csv", csv).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "processed");
    assert_eq!(body["inserted"], 4);
    assert_eq!(body["issues"], json!(["Row 3 is missing income columns"]));

    let (_, list) = app.get("/income/", &token).await;
    assert_eq!(list.as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_large_upload_is_tracked_until_ready() {
    let app = test_app(PollScope::Owner);
    let token = app.sign_up_and_in("alice1").await;
    let mut csv = String::from("amount,category,description");
    for i in 0..301 {
        csv.push_str(&format!("\n{i},Food,Item"));
    }

    let (status, body) = app.upload("expense", &token, "expenses.csv", &csv).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["wait_minutes"], 1);
    let code = body["tracking_code"].as_str().unwrap().to_string();
    let status_uri = format!("/upload/status/{code}");

    let (status, body) = app.get(&status_uri, &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "pending", "wait_minutes": 1}));

    app.clock.advance(Duration::seconds(61));
    let mut last = Value::Null;
    for _ in 0..100 {
        let (_, body) = app.get(&status_uri, &token).await;
        last = body;
        if last["status"] == "ready" {
            break;
        }
        tokio::time::sleep(StdDuration::from_millis(20)).await;
    }
    assert_eq!(last, json!({"status": "ready", "issues": [], "issue_count": 0}));

    let (_, list) = app.get("/expense/", &token).await;
    assert_eq!(list.as_array().unwrap().len(), 301);
}

#[tokio::test]
async fn test_status_polling_scope() {
    let app = test_app(PollScope::Owner);
    let alice = app.sign_up_and_in("alice1").await;
    let bob = app.sign_up_and_in("bobby1").await;
    let mut csv = String::from("amount,source");
    for i in 0..300 {
        csv.push_str(&format!("\n{i},Salary"));
    }
    let (_, body) = app.upload("income", &alice, "big.csv", &csv).await;
    let code = body["tracking_code"].as_str().unwrap().to_string();

    let (status, _) = app.get(&format!("/upload/status/{code}"), &bob).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get("/upload/status/deadbeef", &alice).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_status_polling_requires_a_valid_token() {
    let app = test_app(PollScope::Bearer);
    let token = app.sign_up_and_in("alice1").await;
    let mut csv = String::from("amount,source");
    for i in 0..300 {
        csv.push_str(&format!("\n{i},Salary"));
    }
    let (_, body) = app.upload("income", &token, "big.csv", &csv).await;
    let status_uri = format!("/upload/status/{}", body["tracking_code"].as_str().unwrap());

    let req = Request::builder().uri(&status_uri).body(Body::empty()).unwrap();
    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(resp.headers()[header::WWW_AUTHENTICATE], "Bearer");

    let (status, body) = app.get(&status_uri, "not.a-token").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Invalid token");

    app.clock.advance(Duration::minutes(41));
    let (status, body) = app.get(&status_uri, &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Token has expired");
}

#[tokio::test]
async fn test_bad_uploads_are_rejected() {
    let app = test_app(PollScope::Owner);
    let token = app.sign_up_and_in("alice1").await;

    let (status, _) = app.upload("savings", &token, "x.csv", "amount\n1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.upload("income", &token, "notes.pdf", "%PDF-1.4").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().starts_with("Could not read spreadsheet"));

    let (_, list) = app.get("/income/", &token).await;
    assert!(list.as_array().unwrap().is_empty());
}
