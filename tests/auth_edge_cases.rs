//! Authentication edge cases: every failure to resolve an identity is a 401
//! before any authz evaluation, and legacy-shaped sessions are migrated on
//! read (except Student sessions, which are never flushed back).

use anyhow::{Context, Result};
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt;
use uuid::Uuid;

use hosteldesk::authz::Role;
use hosteldesk::create_app;
use hosteldesk::jwt::JwtConfig;
use hosteldesk::utils::hash_password;

async fn setup() -> Result<(TempDir, SqlitePool, Router)> {
    let dir = tempfile::tempdir().context("failed to create tempdir")?;
    let db_path = dir.path().join("test_auth.db");

    use sqlx::sqlite::SqliteConnectOptions;
    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"),
    )
    .await?;
    migrator.run(&pool).await?;

    std::env::set_var("JWT_SECRET", "test-secret");
    let app = create_app(pool.clone()).await?;

    Ok((dir, pool, app))
}

async fn seed_user(pool: &SqlitePool, email: &str, role: Role) -> Result<Uuid> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    let password_hash = hash_password("password123").map_err(|e| anyhow::anyhow!("{e}"))?;

    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind("Test User")
    .bind(email)
    .bind(password_hash)
    .bind(role.as_str())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(id)
}

/// Insert a session row in the old shape: a flat `permissions` map and no
/// `effective` field.
async fn insert_legacy_session(pool: &SqlitePool, user_id: Uuid, expires_in_hours: i64) -> Result<Uuid> {
    let session_id = Uuid::new_v4();
    let now = Utc::now();
    let legacy_data = json!({
        "user_id": user_id,
        "email": "legacy@example.edu",
        "permissions": {"students": {"view": true}}
    });

    sqlx::query(
        "INSERT INTO sessions (id, user_id, data, created_at, expires_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(session_id.to_string())
    .bind(user_id.to_string())
    .bind(legacy_data.to_string())
    .bind(now)
    .bind(now + Duration::hours(expires_in_hours))
    .execute(pool)
    .await?;

    Ok(session_id)
}

async fn get_me(app: &Router, token: &str) -> Result<(StatusCode, Value)> {
    let req = Request::builder()
        .method("GET")
        .uri("/auth/me")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())?;
    let resp: Response = app.clone().oneshot(req).await?;
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    let value: Value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
    Ok((status, value))
}

#[tokio::test]
async fn auth_failures_are_401_before_authz() -> Result<()> {
    let (_dir, _pool, app) = setup().await?;

    // 1. Register with short password
    let req = Request::builder()
        .method("POST")
        .uri("/auth/register")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"name": "Short", "email": "short@example.edu", "password": "short"}).to_string(),
        ))?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // 2. Login with unknown email
    let req = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"email": "nobody@example.edu", "password": "password123"}).to_string(),
        ))?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // 3. Protected endpoints without a token short-circuit to 401, even the
    // ones behind a route-key guard
    for uri in ["/auth/me", "/students", "/admin/authz/catalog"] {
        let req = Request::builder().method("GET").uri(uri).body(Body::empty())?;
        let resp: Response = app.clone().oneshot(req).await?;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri} should be 401");
    }

    // 4. Garbage token
    let (status, _) = get_me(&app, "not-a-jwt").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // 5. Valid JWT pointing at a session that does not exist
    let jwt = JwtConfig::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;
    let token = jwt
        .encode(Uuid::new_v4(), Uuid::new_v4())
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    let (status, _) = get_me(&app, &token).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn logout_destroys_the_session() -> Result<()> {
    let (_dir, pool, app) = setup().await?;

    seed_user(&pool, "warden@example.edu", Role::Warden).await?;
    let req = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"email": "warden@example.edu", "password": "password123"}).to_string(),
        ))?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    let body_json: Value = serde_json::from_slice(&bytes)?;
    let token = body_json["token"].as_str().context("missing token")?.to_string();

    let (status, _) = get_me(&app, &token).await?;
    assert_eq!(status, StatusCode::OK);

    let req = Request::builder()
        .method("POST")
        .uri("/auth/logout")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let (status, _) = get_me(&app, &token).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn expired_session_is_rejected() -> Result<()> {
    let (_dir, pool, app) = setup().await?;

    let user_id = seed_user(&pool, "expired@example.edu", Role::Warden).await?;
    let session_id = insert_legacy_session(&pool, user_id, -1).await?;

    let jwt = JwtConfig::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;
    let token = jwt.encode(user_id, session_id).map_err(|e| anyhow::anyhow!("{e}"))?;

    let (status, _) = get_me(&app, &token).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn legacy_session_is_migrated_and_persisted() -> Result<()> {
    let (_dir, pool, app) = setup().await?;

    let user_id = seed_user(&pool, "legacywarden@example.edu", Role::Warden).await?;
    let session_id = insert_legacy_session(&pool, user_id, 24).await?;

    let jwt = JwtConfig::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;
    let token = jwt.encode(user_id, session_id).map_err(|e| anyhow::anyhow!("{e}"))?;

    // the request succeeds with a freshly computed effective authz
    let (status, body) = get_me(&app, &token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "Warden");
    assert!(body["effective"]["capabilities"]
        .as_array()
        .unwrap()
        .iter()
        .any(|v| v == "cap.complaints.resolve"));

    // and the rewritten shape was flushed back to the store
    let stored: String = sqlx::query_scalar("SELECT data FROM sessions WHERE id = ?")
        .bind(session_id.to_string())
        .fetch_one(&pool)
        .await?;
    let stored: Value = serde_json::from_str(&stored)?;
    assert!(stored.get("effective").is_some(), "warden session not migrated: {stored}");
    assert!(stored.get("permissions").is_none());

    Ok(())
}

#[tokio::test]
async fn legacy_student_session_is_recomputed_but_never_flushed() -> Result<()> {
    let (_dir, pool, app) = setup().await?;

    let user_id = seed_user(&pool, "legacystudent@example.edu", Role::Student).await?;
    let session_id = insert_legacy_session(&pool, user_id, 24).await?;

    let jwt = JwtConfig::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;
    let token = jwt.encode(user_id, session_id).map_err(|e| anyhow::anyhow!("{e}"))?;

    // recomputed in place: the response carries the resolved authz
    let (status, body) = get_me(&app, &token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "Student");
    assert!(body["effective"]["routes"]
        .as_array()
        .unwrap()
        .iter()
        .any(|v| v == "route.student.home"));

    // but the stored row keeps its legacy shape
    let stored: String = sqlx::query_scalar("SELECT data FROM sessions WHERE id = ?")
        .bind(session_id.to_string())
        .fetch_one(&pool)
        .await?;
    let stored: Value = serde_json::from_str(&stored)?;
    assert!(stored.get("effective").is_none(), "student session was flushed: {stored}");
    assert!(stored.get("permissions").is_some());

    Ok(())
}
