//! End-to-end tests for the HTTP surface
//!
//! The router runs against in-memory stores and, for OAuth, a local stub
//! provider. No database is needed.
//!
//! ## Running Tests
//! ```bash
//! cargo test -p authgate-api --test auth_flow
//! ```

use std::{collections::HashMap, sync::Arc};

use authgate_api::{auth::JwtManager, create_router, AppState, Config};
use authgate_shared::{MemoryOAuthStateStore, MemoryUserStore, Role, UserId, UserStore};
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use time::{Duration, OffsetDateTime};
use tower::ServiceExt;

const SECRET: &str = "integration-test-secret-0123456789abcdef";

// ============================================================================
// Test Utilities
// ============================================================================

struct TestApp {
    router: Router,
    users: Arc<MemoryUserStore>,
}

fn test_config(provider_url: &str, timeout_secs: u64) -> Config {
    let vars: HashMap<&str, String> = HashMap::from([
        ("DATABASE_URL", "postgres://unused/authgate".to_string()),
        ("JWT_SECRET", SECRET.to_string()),
        ("OAUTH_CLIENT_ID", "client".to_string()),
        ("OAUTH_CLIENT_SECRET", "client-secret".to_string()),
        (
            "OAUTH_REDIRECT_URI",
            "https://app.example.com/oauth/callback".to_string(),
        ),
        ("OAUTH_PROVIDER_URL", provider_url.to_string()),
        ("OAUTH_TIMEOUT_SECS", timeout_secs.to_string()),
    ]);
    Config::from_lookup(|key| vars.get(key).cloned()).expect("valid test config")
}

fn spawn_app(provider_url: &str) -> TestApp {
    spawn_app_with_timeout(provider_url, 2)
}

fn spawn_app_with_timeout(provider_url: &str, timeout_secs: u64) -> TestApp {
    let users = Arc::new(MemoryUserStore::new());
    let state = AppState::new(
        test_config(provider_url, timeout_secs),
        users.clone(),
        Arc::new(MemoryOAuthStateStore::new()),
    )
    .expect("state");

    TestApp {
        router: create_router(state),
        users,
    }
}

/// Provider URL that refuses connections; for tests that never reach it
fn app() -> TestApp {
    spawn_app("http://127.0.0.1:9")
}

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl TestResponse {
    /// `AuthToken=...` pair from the Set-Cookie header, ready to send back
    fn session_cookie(&self) -> String {
        let set_cookie = self
            .headers
            .get(header::SET_COOKIE)
            .expect("Set-Cookie header")
            .to_str()
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    fn set_cookie(&self) -> &str {
        self.headers
            .get(header::SET_COOKIE)
            .expect("Set-Cookie header")
            .to_str()
            .unwrap()
    }
}

async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    TestResponse {
        status,
        headers,
        body,
    }
}

async fn signup(app: &TestApp, username: &str, password: &str) -> TestResponse {
    send(
        app,
        Method::POST,
        "/auth/signup",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await
}

async fn login(app: &TestApp, username: &str, password: &str) -> TestResponse {
    send(
        app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await
}

/// Sign up `username`, promote it to admin in the store, and log in again
async fn admin_cookie(app: &TestApp, username: &str) -> String {
    let res = signup(app, username, "admin-password").await;
    let id = UserId(res.body["userId"].as_i64().unwrap());
    app.users.update_role(id, &Role::admin()).await.unwrap();
    login(app, username, "admin-password").await.session_cookie()
}

// ============================================================================
// Password sign-up and login
// ============================================================================

#[tokio::test]
async fn test_signup_issues_session_cookie() {
    let app = app();

    let res = signup(&app, "alice", "s3cret-pass").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "Signup and login successful");
    assert!(res.body["userId"].is_i64());

    let set_cookie = res.set_cookie();
    assert!(set_cookie.starts_with("AuthToken="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Secure"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(set_cookie.contains("Path=/"));
    let max_age: i64 = set_cookie
        .split("; ")
        .find_map(|attr| attr.strip_prefix("Max-Age="))
        .unwrap()
        .parse()
        .unwrap();
    assert!((10_790..=10_800).contains(&max_age));

    let me = send(&app, Method::GET, "/auth/me", Some(&res.session_cookie()), None).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body, json!({ "username": "alice", "role": "user" }));
}

#[tokio::test]
async fn test_signup_ignores_client_supplied_role() {
    let app = app();

    let res = send(
        &app,
        Method::POST,
        "/auth/signup",
        None,
        Some(json!({ "username": "mallory", "password": "pw", "role": "admin" })),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);

    let me = send(&app, Method::GET, "/auth/me", Some(&res.session_cookie()), None).await;
    assert_eq!(me.body["role"], "user");
}

#[tokio::test]
async fn test_signup_missing_fields_is_validation_error() {
    let app = app();

    let res = send(
        &app,
        Method::POST,
        "/auth/signup",
        None,
        Some(json!({ "username": "alice" })),
    )
    .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"]["code"], "VALIDATION_ERROR");
    assert!(res.headers.get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_duplicate_signup_conflicts_and_keeps_original_password() {
    let app = app();

    assert_eq!(signup(&app, "alice", "first").await.status, StatusCode::OK);

    let res = signup(&app, "alice", "second").await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.body["error"]["code"], "CONFLICT");

    assert_eq!(login(&app, "alice", "first").await.status, StatusCode::OK);
    assert_eq!(
        login(&app, "alice", "second").await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_login_failures_do_not_reveal_which_part_was_wrong() {
    let app = app();
    signup(&app, "alice", "right").await;

    let wrong_password = login(&app, "alice", "wrong").await;
    let unknown_user = login(&app, "nobody", "right").await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body, unknown_user.body);
    assert!(wrong_password.headers.get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_login_sets_cookie() {
    let app = app();
    signup(&app, "alice", "pw").await;

    let res = login(&app, "alice", "pw").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "Login successful");

    let me = send(&app, Method::GET, "/auth/me", Some(&res.session_cookie()), None).await;
    assert_eq!(me.body["username"], "alice");
}

// ============================================================================
// Session verification
// ============================================================================

#[tokio::test]
async fn test_protected_route_requires_cookie() {
    let app = app();

    let res = send(&app, Method::GET, "/auth/me", None, None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = send(&app, Method::GET, "/auth/me", Some("AuthToken=not-a-jwt"), None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let app = app();
    let jwt = JwtManager::new(SECRET, 3);
    let issued = jwt
        .issue_at("alice", &Role::user(), OffsetDateTime::now_utc() - Duration::hours(4))
        .unwrap();

    let cookie = format!("AuthToken={}", issued.token);
    let res = send(&app, Method::GET, "/auth/me", Some(&cookie), None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["error"]["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_token_from_other_secret_is_rejected() {
    let app = app();
    let forged = JwtManager::new("some-other-secret-that-is-long-enough!!", 3)
        .issue("alice", &Role::admin())
        .unwrap();

    let cookie = format!("AuthToken={}", forged.token);
    let res = send(&app, Method::GET, "/auth/me", Some(&cookie), None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_reissues_cookie_with_current_role() {
    let app = app();
    let res = signup(&app, "alice", "pw").await;
    let id = UserId(res.body["userId"].as_i64().unwrap());
    let old_cookie = res.session_cookie();

    app.users.update_role(id, &Role::admin()).await.unwrap();

    // Old token still carries the old role
    let denied = send(&app, Method::GET, "/api/list_users", Some(&old_cookie), None).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let refreshed = send(
        &app,
        Method::POST,
        "/auth/token/verify-refresh",
        Some(&old_cookie),
        None,
    )
    .await;
    assert_eq!(refreshed.status, StatusCode::OK);
    assert_eq!(refreshed.body["username"], "alice");
    assert_eq!(refreshed.body["role"], "admin");

    let new_cookie = refreshed.session_cookie();
    let allowed = send(&app, Method::GET, "/api/list_users", Some(&new_cookie), None).await;
    assert_eq!(allowed.status, StatusCode::OK);
}

/// `exp` claim of the token inside an `AuthToken=...` pair
fn cookie_exp(cookie: &str) -> i64 {
    let token = cookie.strip_prefix("AuthToken=").unwrap();
    JwtManager::new(SECRET, 3).verify(token).unwrap().exp
}

#[tokio::test]
async fn test_refresh_right_after_signup_extends_expiry() {
    let app = app();
    let cookie = signup(&app, "alice", "pw").await.session_cookie();

    let refreshed = send(
        &app,
        Method::POST,
        "/auth/token/verify-refresh",
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(refreshed.status, StatusCode::OK);

    let old_exp = cookie_exp(&cookie);
    let new_exp = cookie_exp(&refreshed.session_cookie());
    assert!(new_exp > old_exp, "refreshed exp {new_exp} not after {old_exp}");
}

#[tokio::test]
async fn test_refresh_without_cookie_is_unauthorized() {
    let app = app();
    let res = send(&app, Method::POST, "/auth/token/verify-refresh", None, None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert!(res.headers.get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_logout_expires_cookie() {
    let app = app();
    let cookie = signup(&app, "alice", "pw").await.session_cookie();

    let res = send(&app, Method::POST, "/auth/logout", Some(&cookie), None).await;
    assert_eq!(res.status, StatusCode::OK);
    let set_cookie = res.set_cookie();
    assert!(set_cookie.starts_with("AuthToken=;"));
    assert!(set_cookie.contains("Max-Age=0"));

    // The browser now sends the emptied cookie
    let cleared = res.session_cookie();
    let me = send(&app, Method::GET, "/auth/me", Some(&cleared), None).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// OAuth
// ============================================================================

fn state_param(location: &str) -> String {
    let url = url::Url::parse(location).unwrap();
    url.query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .unwrap()
}

#[tokio::test]
async fn test_oauth_login_then_session_works() {
    let mut server = mockito::Server::new_async().await;
    let token_mock = server
        .mock("POST", "/oauth/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"provider-token","token_type":"Bearer"}"#)
        .create_async()
        .await;
    let profile_mock = server
        .mock("GET", "/oauth/userinfo")
        .match_header("authorization", "Bearer provider-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"email":"alice@example.com"}"#)
        .create_async()
        .await;

    let app = spawn_app(&server.url());

    let redirect = send(&app, Method::GET, "/auth/oauth/login", None, None).await;
    assert_eq!(redirect.status, StatusCode::FOUND);
    let location = redirect
        .headers
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(location.starts_with(&format!("{}/oauth/authorize?", server.url())));
    assert!(location.contains("response_type=code"));
    assert!(location.contains("client_id=client"));

    let state = state_param(&location);
    let res = send(
        &app,
        Method::POST,
        &format!("/auth/oauth/verify?code=auth-code&state={state}"),
        None,
        None,
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["username"], "alice");

    let me = send(&app, Method::GET, "/auth/me", Some(&res.session_cookie()), None).await;
    assert_eq!(me.body, json!({ "username": "alice", "role": "user" }));

    token_mock.assert_async().await;
    profile_mock.assert_async().await;

    // Provisioned account cannot be used for password login
    let stored = app.users.find_by_username("alice").await.unwrap().unwrap();
    assert!(!stored.is_password_login_enabled());
}

#[tokio::test]
async fn test_oauth_unknown_state_never_reaches_provider() {
    let mut server = mockito::Server::new_async().await;
    let token_mock = server
        .mock("POST", "/oauth/token")
        .expect(0)
        .create_async()
        .await;

    let app = spawn_app(&server.url());
    let res = send(
        &app,
        Method::POST,
        "/auth/oauth/verify?code=auth-code&state=forged",
        None,
        None,
    )
    .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.headers.get(header::SET_COOKIE).is_none());
    token_mock.assert_async().await;
}

#[tokio::test]
async fn test_oauth_missing_code_is_validation_error() {
    let app = app();
    let res = send(&app, Method::POST, "/auth/oauth/verify?state=abc", None, None).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oauth_provider_rejection_passes_status_through() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/oauth/token")
        .with_status(401)
        .with_body(r#"{"error":"invalid_grant"}"#)
        .create_async()
        .await;

    let app = spawn_app(&server.url());
    let redirect = send(&app, Method::GET, "/auth/oauth/login", None, None).await;
    let location = redirect.headers.get(header::LOCATION).unwrap().to_str().unwrap();
    let state = state_param(location);

    let res = send(
        &app,
        Method::POST,
        &format!("/auth/oauth/verify?code=bad&state={state}"),
        None,
        None,
    )
    .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["error"]["code"], "OAUTH_EXCHANGE_FAILED");
    assert!(res.headers.get(header::SET_COOKIE).is_none());
}

/// Accepts connections and never answers
async fn silent_provider() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_oauth_provider_timeout_is_bad_gateway() {
    let app = spawn_app_with_timeout(&silent_provider().await, 1);

    let redirect = send(&app, Method::GET, "/auth/oauth/login", None, None).await;
    let location = redirect.headers.get(header::LOCATION).unwrap().to_str().unwrap();
    let state = state_param(location);

    let res = send(
        &app,
        Method::POST,
        &format!("/auth/oauth/verify?code=slow&state={state}"),
        None,
        None,
    )
    .await;
    assert_eq!(res.status, StatusCode::BAD_GATEWAY);
    assert_eq!(res.body["error"]["code"], "UPSTREAM_UNAVAILABLE");
    assert!(res.headers.get(header::SET_COOKIE).is_none());
    assert_eq!(app.users.list_users(Default::default()).await.unwrap().total, 0);
}

// ============================================================================
// Profile and user administration
// ============================================================================

#[tokio::test]
async fn test_complete_own_profile() {
    let app = app();
    let cookie = signup(&app, "alice", "old-pw").await.session_cookie();

    let res = send(
        &app,
        Method::POST,
        "/api/new",
        Some(&cookie),
        Some(json!({ "email": "alice@example.com", "phoneNumber": "555-0100", "password": "new-pw" })),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);

    let stored = app.users.find_by_username("alice").await.unwrap().unwrap();
    assert_eq!(stored.email.as_deref(), Some("alice@example.com"));
    assert_eq!(stored.phone_number.as_deref(), Some("555-0100"));

    assert_eq!(login(&app, "alice", "new-pw").await.status, StatusCode::OK);
    assert_eq!(
        login(&app, "alice", "old-pw").await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_profile_of_another_user_needs_admin() {
    let app = app();
    signup(&app, "bob", "pw").await;
    let alice = signup(&app, "alice", "pw").await.session_cookie();

    let res = send(
        &app,
        Method::POST,
        "/api/new",
        Some(&alice),
        Some(json!({ "username": "bob", "email": "x@example.com" })),
    )
    .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let admin = admin_cookie(&app, "root").await;
    let res = send(
        &app,
        Method::POST,
        "/api/new",
        Some(&admin),
        Some(json!({ "username": "bob", "email": "bob@example.com" })),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);

    let res = send(
        &app,
        Method::POST,
        "/api/new",
        Some(&admin),
        Some(json!({ "username": "ghost", "email": "ghost@example.com" })),
    )
    .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_users_is_admin_only_and_paginated() {
    let app = app();
    for name in ["u1", "u2", "u3"] {
        signup(&app, name, "pw").await;
    }
    let user = login(&app, "u1", "pw").await.session_cookie();
    let admin = admin_cookie(&app, "root").await;

    let res = send(&app, Method::GET, "/api/list_users", Some(&user), None).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = send(
        &app,
        Method::GET,
        "/api/list_users?page=2&limit=3",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["page"], 2);
    assert_eq!(res.body["limit"], 3);
    assert_eq!(res.body["total"], 4);
    assert_eq!(res.body["users"].as_array().unwrap().len(), 1);

    let res = send(&app, Method::GET, "/api/list_users?limit=1000", Some(&admin), None).await;
    assert_eq!(res.body["limit"], 100);
    assert!(res.body["users"][0].get("password").is_none());
    assert!(res.body["users"][0].get("salt").is_none());
}

#[tokio::test]
async fn test_no_user_lookup_by_id_route() {
    let app = app();
    let id = signup(&app, "alice", "pw").await.body["userId"].as_i64().unwrap();
    let admin = admin_cookie(&app, "root").await;

    let res = send(&app, Method::GET, &format!("/api/user/{id}"), Some(&admin), None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_role() {
    let app = app();
    let id = signup(&app, "alice", "pw").await.body["userId"].as_i64().unwrap();
    let admin = admin_cookie(&app, "root").await;

    let res = send(
        &app,
        Method::POST,
        "/api/update_role",
        Some(&admin),
        Some(json!({ "userId": id, "newRole": "admin" })),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["user"]["role"], "admin");

    let res = send(
        &app,
        Method::POST,
        "/api/update_role",
        Some(&admin),
        Some(json!({ "userId": id, "newRole": "  " })),
    )
    .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = send(
        &app,
        Method::POST,
        "/api/update_role",
        Some(&admin),
        Some(json!({ "userId": 999999, "newRole": "user" })),
    )
    .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Health and headers
// ============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let app = app();

    let res = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "healthy");

    assert_eq!(
        send(&app, Method::GET, "/health/live", None, None).await.status,
        StatusCode::OK
    );
    assert_eq!(
        send(&app, Method::GET, "/health/ready", None, None).await.status,
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_responses_carry_security_headers() {
    let app = app();
    let res = send(&app, Method::GET, "/auth/me", None, None).await;

    assert_eq!(res.headers.get("x-frame-options").unwrap(), "DENY");
    assert_eq!(res.headers.get("x-content-type-options").unwrap(), "nosniff");
    assert!(res
        .headers
        .get(header::CACHE_CONTROL)
        .unwrap()
        .to_str()
        .unwrap()
        .contains("no-store"));
}
