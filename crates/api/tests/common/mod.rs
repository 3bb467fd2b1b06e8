#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use optique_api::auth::token::{AccessTokens, TokenConfig};
use optique_api::config::ServerConfig;
use optique_api::middleware::csrf::{CsrfConfig, CSRF_HEADER};
use optique_api::middleware::rate_limit::RateLimitConfig;
use optique_api::router::build_app_router;
use optique_api::state::AppState;
use optique_db::models::user::NewUser;
use optique_db::repositories::{AccessRepo, UserRepo};

/// Build a test `ServerConfig` with fixed secrets and a generous rate limit.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        tokens: TokenConfig {
            secret: "test-jwt-secret-long-enough-for-hmac".to_string(),
            access_expiry_mins: 60,
        },
        csrf: CsrfConfig {
            secret: "test-csrf-secret".to_string(),
            ttl_secs: 7200,
        },
        rate_limit: RateLimitConfig {
            capacity: 100.0,
            refill_per_sec: 0.0,
        },
        trusted_proxies: Vec::new(),
    }
}

/// Build the full application router, middleware included, on `pool`.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, test_config())
}

pub fn build_test_app_with(pool: PgPool, config: ServerConfig) -> Router {
    build_app_router(AppState::new(pool, config))
}

/// An authenticated caller: bearer token plus a matching CSRF token.
pub struct TestSession {
    pub user_id: i64,
    pub token: String,
    pub csrf: String,
}

/// Create a user holding `role` and mint tokens for them without going
/// through `/auth/login`.
pub async fn session_for(pool: &PgPool, username: &str, role: &str) -> TestSession {
    let role = AccessRepo::find_role_by_name(pool, role)
        .await
        .unwrap()
        .expect("seeded role");
    let user = UserRepo::create(
        pool,
        &NewUser {
            username: username.to_string(),
            email: format!("{username}@test.com"),
            password_hash: "unused".to_string(),
            role_id: role.id,
        },
    )
    .await
    .expect("user creation should succeed");

    let config = test_config();
    TestSession {
        user_id: user.id,
        token: AccessTokens::new(&config.tokens)
            .issue(user.id, &user.username)
            .unwrap()
            .token,
        csrf: config.csrf.issue(user.id),
    }
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

fn json_request(
    method: Method,
    uri: &str,
    body: &serde_json::Value,
    token: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, json_request(Method::POST, uri, &body, None)).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, json_request(Method::POST, uri, &body, Some(token))).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, json_request(Method::PUT, uri, &body, Some(token))).await
}

/// DELETE with no body; the CSRF token, if any, travels in the header.
pub async fn delete_auth(app: Router, uri: &str, token: &str, csrf: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"));
    if let Some(csrf) = csrf {
        builder = builder.header(CSRF_HEADER, csrf);
    }
    send(app, builder.body(Body::empty()).unwrap()).await
}

/// Assert the status and return the parsed body.
pub async fn expect_status(response: Response<Body>, status: StatusCode) -> serde_json::Value {
    let actual = response.status();
    let json = body_json(response).await;
    assert_eq!(actual, status, "unexpected status, body: {json}");
    json
}
