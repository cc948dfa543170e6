use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::Engine;
use migration::MigratorTrait;
use server::{
    GeneratorError, Identity, IdentityVerifier, ServerConfig, ServerState, TextGenerator, VerifyError,
};

struct CannedGenerator(&'static str);

#[async_trait]
impl TextGenerator for CannedGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GeneratorError> {
        Ok(self.0.to_string())
    }
}

struct FailingGenerator;

#[async_trait]
impl TextGenerator for FailingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GeneratorError> {
        Err(GeneratorError::Status(500))
    }
}

struct AcceptAll;

#[async_trait]
impl IdentityVerifier for AcceptAll {
    async fn verify(&self, credential: &str) -> Result<Identity, VerifyError> {
        Ok(Identity {
            email: Some(format!("{credential}@gmail.com")),
            name: Some("Google User".to_string()),
        })
    }
}

async fn state() -> ServerState {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();
    ServerState::new(engine, &ServerConfig::default())
}

async fn app() -> Router {
    server::router(state().await)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let (status, bytes) = send(app, request).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Register `email` and return its access and refresh tokens.
async fn register(app: &Router, email: &str) -> (String, String) {
    let (status, body) = send_json(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "email": email, "password": "secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    (
        body["access_token"].as_str().unwrap().to_string(),
        body["refresh_token"].as_str().unwrap().to_string(),
    )
}

async fn new_account(app: &Router, token: &str, name: &str) -> String {
    let (status, body) = send_json(
        app,
        "POST",
        "/accounts",
        Some(token),
        Some(json!({ "name": name, "currency": "USD" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().unwrap().to_string()
}

fn multipart(token: &str, field: &str, content: &str) -> Request<Body> {
    let boundary = "X-FINTRACK-BOUNDARY";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"statement.csv\"\r\n\
         Content-Type: text/csv\r\n\r\n\
         {content}\r\n\
         --{boundary}--\r\n"
    );
    Request::builder()
        .method("POST")
        .uri("/transactions/import")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let app = app().await;
    let (status, body) = send_json(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn protected_routes_require_access_token() {
    let app = app().await;
    let (_, refresh) = register(&app, "a@example.com").await;

    let (status, _) = send_json(&app, "GET", "/accounts", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send_json(&app, "GET", "/accounts", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send_json(&app, "GET", "/accounts", Some(&refresh), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/accounts")
        .header(header::AUTHORIZATION, "Basic YTpi")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_login_refresh_and_me() {
    let app = app().await;
    let (access, refresh) = register(&app, "Alice@Example.com").await;

    let (status, me) = send_json(&app, "GET", "/me", Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "alice@example.com");
    assert_eq!(me["role"], "user");

    let (status, _) = send_json(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "email": "alice@example.com", "password": "other" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send_json(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "alice@example.com", "password": "secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "alice@example.com");

    let (status, _) = send_json(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "alice@example.com", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send_json(
        &app,
        "POST",
        "/auth/refresh",
        None,
        Some(json!({ "refresh_token": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let fresh = body["access_token"].as_str().unwrap();
    let (status, _) = send_json(&app, "GET", "/me", Some(fresh), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_json(
        &app,
        "POST",
        "/auth/refresh",
        None,
        Some(json!({ "refresh_token": access })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_requires_email_and_password() {
    let app = app().await;
    let (status, body) = send_json(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "email": "a@example.com", "password": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "email and password required");
}

#[tokio::test]
async fn forgot_password_is_a_stub() {
    let app = app().await;
    let (status, _) = send_json(&app, "POST", "/auth/forgot", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = send_json(
        &app,
        "POST",
        "/auth/forgot",
        None,
        Some(json!({ "email": "a@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn google_sign_in() {
    let app = app().await;
    let (status, body) = send_json(
        &app,
        "POST",
        "/auth/google",
        None,
        Some(json!({ "credential": "token" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Google auth is not configured");

    let app = server::router(state().await.with_identity_verifier(Arc::new(AcceptAll)));
    let (status, body) = send_json(
        &app,
        "POST",
        "/auth/google",
        None,
        Some(json!({ "credential": "jane" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "jane@gmail.com");
    assert_eq!(body["user"]["name"], "Google User");
}

#[tokio::test]
async fn accounts_are_scoped_to_the_caller() {
    let app = app().await;
    let (alice, _) = register(&app, "alice@example.com").await;
    let (bob, _) = register(&app, "bob@example.com").await;
    let account_id = new_account(&app, &alice, "Main").await;

    let (status, body) = send_json(&app, "GET", "/accounts", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["balance_minor"], 0);

    let (status, body) = send_json(&app, "GET", "/accounts", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    let uri = format!("/accounts/{account_id}");
    let (status, _) = send_json(&app, "PUT", &uri, Some(&bob), Some(json!({ "name": "Mine" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send_json(&app, "DELETE", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send_json(
        &app,
        "POST",
        "/accounts",
        Some(&alice),
        Some(json!({ "name": "main" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send_json(&app, "DELETE", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn create_and_filter_transactions() {
    let app = app().await;
    let (token, _) = register(&app, "a@example.com").await;
    let account_id = new_account(&app, &token, "Main").await;

    for (day, kind, amount) in [(1, "expense", 500), (2, "income", 9000), (3, "expense", 700)] {
        let (status, body) = send_json(
            &app,
            "POST",
            "/transactions",
            Some(&token),
            Some(json!({
                "account_id": account_id,
                "kind": kind,
                "amount_minor": amount,
                "occurred_at": format!("2024-06-0{day}T08:00:00Z"),
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    let (status, body) = send_json(
        &app,
        "GET",
        "/transactions?kind=expense&start=2024-06-01&end=2024-06-02",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let listed = body["transactions"].as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["amount_minor"], 500);
    assert_eq!(listed[0]["currency"], "USD");

    let (status, _) = send_json(
        &app,
        "POST",
        "/transactions",
        Some(&token),
        Some(json!({ "account_id": account_id, "kind": "expense", "amount_minor": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(
        &app,
        "GET",
        "/transactions?start=tomorrow",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn import_statement_upload() {
    let app = app().await;
    let (token, _) = register(&app, "a@example.com").await;

    let csv = "Date,Description,Amount\n2024-01-05,Coffee,-4.50\n2024-01-06,Salary,1000\n";
    let (status, body) = send(&app, multipart(&token, "file", csv)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "no account exists");

    new_account(&app, &token, "Main").await;
    let (status, body) = send(&app, multipart(&token, "file", csv)).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["imported"], 2);
    let transactions = body["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 2);
    assert_eq!(transactions[0]["kind"], "income");
    assert_eq!(transactions[1]["note"], "Coffee");
    assert_eq!(transactions[1]["amount_minor"], 450);

    let (status, body) = send(&app, multipart(&token, "attachment", csv)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "no file supplied");
}

#[tokio::test]
async fn budgets_and_status() {
    let app = app().await;
    let (token, _) = register(&app, "a@example.com").await;
    let (status, budget) = send_json(
        &app,
        "POST",
        "/budgets",
        Some(&token),
        Some(json!({ "name": "Fun", "amount_minor": 5000 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(budget["period"], "monthly");

    let (status, body) = send_json(&app, "GET", "/budgets/status", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["spent_minor"], 0);
    assert_eq!(body[0]["remaining_minor"], 5000);

    let (status, _) = send_json(
        &app,
        "POST",
        "/budgets",
        Some(&token),
        Some(json!({ "name": "Bad", "amount_minor": -1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/budgets/{}", budget["id"].as_str().unwrap());
    let (status, _) = send_json(&app, "DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send_json(&app, "DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn report_export_formats() {
    let app = app().await;
    let (token, _) = register(&app, "a@example.com").await;

    let request = |uri: &str| {
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    };

    let response = app
        .clone()
        .oneshot(request("/reports/export?type=csv"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=report.csv"
    );

    let response = app
        .clone()
        .oneshot(request("/reports/export?type=pdf"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(body.starts_with(b"%PDF"));

    let (status, body) = send(&app, request("/reports/export?type=xml")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "unsupported type");

    let (status, body) = send_json(&app, "GET", "/reports/summary", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["net_minor"], 0);

    let (status, body) = send_json(&app, "GET", "/stats", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance_minor"], 0);
}

#[tokio::test]
async fn assistant_answers_and_falls_back() {
    let app = app().await;
    let (token, _) = register(&app, "a@example.com").await;

    let (status, body) = send_json(&app, "POST", "/assistant", Some(&token), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "query required");

    let (status, body) = send_json(
        &app,
        "POST",
        "/assistant",
        Some(&token),
        Some(json!({ "query": "recent transactions" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"], "No transactions yet.");

    let (status, body) = send_json(
        &app,
        "POST",
        "/assistant",
        Some(&token),
        Some(json!({ "query": "Should I buy a house?" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"], engine::FALLBACK_REPLY);
}

#[tokio::test]
async fn assistant_uses_generator_for_open_questions() {
    let canned_state = state()
        .await
        .with_generator(Arc::new(CannedGenerator("Diversify.")));
    let app = server::router(canned_state);
    let (token, _) = register(&app, "a@example.com").await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/assistant",
        Some(&token),
        Some(json!({ "query": "Should I buy a house?" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"], "Diversify.");

    let app = server::router(state().await.with_generator(Arc::new(FailingGenerator)));
    let (token, _) = register(&app, "a@example.com").await;
    let (_, body) = send_json(
        &app,
        "POST",
        "/assistant",
        Some(&token),
        Some(json!({ "query": "Should I buy a house?" })),
    )
    .await;
    assert_eq!(body["reply"], engine::FALLBACK_REPLY);
}

#[tokio::test]
async fn goal_suggestions_need_a_generator() {
    let goal = json!({
        "goal_name": "Car",
        "current_savings": 1000.0,
        "target_amount": 8000.0,
        "monthly_income": 4000.0,
        "monthly_expenses": 3500.0,
        "spending_habits": "eats out a lot"
    });

    let app = app().await;
    let (token, _) = register(&app, "a@example.com").await;
    let (status, _) = send_json(
        &app,
        "POST",
        "/goals/suggestions",
        Some(&token),
        Some(goal.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let app = server::router(
        state()
            .await
            .with_generator(Arc::new(CannedGenerator("1. Cook at home\n2. Sell the bike\n"))),
    );
    let (token, _) = register(&app, "a@example.com").await;
    let (status, body) = send_json(&app, "POST", "/goals/suggestions", Some(&token), Some(goal)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["suggestions"], json!(["Cook at home", "Sell the bike"]));
}
