//! End-to-end authorization flow with enforcement fully on: route guards,
//! capability checks, override editing, and session refresh.

use anyhow::{Context, Result};
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot`
use uuid::Uuid;

use hosteldesk::authz::Role;
use hosteldesk::create_app;
use hosteldesk::utils::hash_password;

async fn setup() -> Result<(TempDir, SqlitePool, Router)> {
    let dir = tempfile::tempdir().context("failed to create tempdir")?;
    let db_path = dir.path().join("test.db");

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
    std::env::set_var("AUTHZ_MODE", "enforce");
    let app = create_app(pool.clone()).await?;

    Ok((dir, pool, app))
}

async fn seed_user(pool: &SqlitePool, name: &str, email: &str, role: Role) -> Result<Uuid> {
    let id = Uuid::new_v4();
    let now = chrono::Utc::now();
    let password_hash = hash_password("password123").map_err(|e| anyhow::anyhow!("{e}"))?;

    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(role.as_str())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(id)
}

async fn login(app: &Router, email: &str) -> Result<String> {
    let resp = send_json(
        app,
        "POST",
        "/auth/login",
        None,
        Some(json!({"email": email, "password": "password123"})),
    )
    .await?;
    let (status, body) = read(resp).await?;
    anyhow::ensure!(status == StatusCode::OK, "login failed: {} - {}", status, body);
    body.get("token")
        .and_then(|t| t.as_str())
        .map(String::from)
        .context("missing token")
}

async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    payload: Option<Value>,
) -> Result<Response> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let req = match payload {
        Some(payload) => builder
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))?,
        None => builder.body(Body::empty())?,
    };
    Ok(app.clone().oneshot(req).await?)
}

async fn read(resp: Response) -> Result<(StatusCode, Value)> {
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, value))
}

#[tokio::test]
async fn enforced_route_and_capability_flow() -> Result<()> {
    let (_dir, pool, app) = setup().await?;

    seed_user(&pool, "Admin", "admin@example.edu", Role::Admin).await?;
    let warden_id = seed_user(&pool, "Warden", "warden@example.edu", Role::Warden).await?;

    // student self-registers
    let resp = send_json(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({"name": "Ravi", "email": "ravi@example.edu", "password": "password123"})),
    )
    .await?;
    let (status, body) = read(resp).await?;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
    let student_token = body["token"].as_str().context("missing token")?.to_string();
    assert_eq!(body["user"]["role"], "Student");

    let admin_token = login(&app, "admin@example.edu").await?;
    let warden_token = login(&app, "warden@example.edu").await?;

    // student lacks route.admin.students entirely
    let resp = send_json(&app, "GET", "/students", Some(&student_token), None).await?;
    let (status, body) = read(resp).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
    // no capability or route key leaks into the deny message
    assert!(!body["message"].as_str().unwrap_or_default().contains("route."));

    // admin has the full students area
    let resp = send_json(
        &app,
        "POST",
        "/students",
        Some(&admin_token),
        Some(json!({"name": "Ravi Kumar", "roll_no": "H23CS014", "email": "ravi@example.edu", "room": "B-214"})),
    )
    .await?;
    let (status, body) = read(resp).await?;
    assert_eq!(status, StatusCode::CREATED, "student create failed: {}", body);
    let student_record_id = body["id"].as_str().context("missing id")?.to_string();

    let resp = send_json(&app, "GET", "/students", Some(&admin_token), None).await?;
    let (status, body) = read(resp).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(|a| a.len()), Some(1));

    // warden has no admin route key by default
    let resp = send_json(&app, "GET", "/students", Some(&warden_token), None).await?;
    let (status, _) = read(resp).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // admin edits the warden's override: open the students area, allow
    // export, take away complaint resolution
    let resp = send_json(
        &app,
        "PUT",
        &format!("/admin/users/{}/authz", warden_id),
        Some(&admin_token),
        Some(json!({
            "grants": ["route.admin.students", "cap.students.export"],
            "revokes": ["cap.complaints.resolve"]
        })),
    )
    .await?;
    let (status, body) = read(resp).await?;
    assert_eq!(status, StatusCode::OK, "override update failed: {}", body);
    let effective_caps: Vec<&str> = body["effective"]["capabilities"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert!(effective_caps.contains(&"cap.students.export"));
    assert!(!effective_caps.contains(&"cap.complaints.resolve"));

    // the live session is stale until the warden refreshes
    let resp = send_json(&app, "GET", "/students", Some(&warden_token), None).await?;
    let (status, _) = read(resp).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let resp = send_json(&app, "POST", "/auth/refresh", Some(&warden_token), None).await?;
    let (status, body) = read(resp).await?;
    assert_eq!(status, StatusCode::OK, "refresh failed: {}", body);
    assert!(body["effective"]["routes"]
        .as_array()
        .unwrap()
        .iter()
        .any(|v| v == "route.admin.students"));

    let resp = send_json(&app, "GET", "/students", Some(&warden_token), None).await?;
    let (status, _) = read(resp).await?;
    assert_eq!(status, StatusCode::OK);

    // export needs both view (role default) and export (granted)
    let resp = send_json(&app, "GET", "/students/export", Some(&warden_token), None).await?;
    let (status, body) = read(resp).await?;
    assert_eq!(status, StatusCode::OK, "export failed: {}", body);
    assert_eq!(body[0]["roll_no"], "H23CS014");

    // student files a complaint through the student area
    let resp = send_json(
        &app,
        "POST",
        "/my/complaints",
        Some(&student_token),
        Some(json!({"category": "maintenance", "description": "Fan broken in B-214"})),
    )
    .await?;
    let (status, body) = read(resp).await?;
    assert_eq!(status, StatusCode::CREATED, "complaint create failed: {}", body);
    let complaint_id = body["id"].as_str().context("missing id")?.to_string();

    // resolve is any-of [resolve, escalate]; resolve was revoked but the
    // warden still holds escalate by default
    let resp = send_json(
        &app,
        "POST",
        &format!("/complaints/{}/resolve", complaint_id),
        Some(&warden_token),
        Some(json!({"resolution_note": "Fan replaced"})),
    )
    .await?;
    let (status, body) = read(resp).await?;
    assert_eq!(status, StatusCode::OK, "resolve failed: {}", body);
    assert_eq!(body["status"], "resolved");

    // admin deletes the student record
    let resp = send_json(
        &app,
        "DELETE",
        &format!("/students/{}", student_record_id),
        Some(&admin_token),
        None,
    )
    .await?;
    let (status, _) = read(resp).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let resp = send_json(&app, "GET", "/students", Some(&admin_token), None).await?;
    let (status, body) = read(resp).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(|a| a.len()), Some(0));

    Ok(())
}

#[tokio::test]
async fn override_admin_endpoints() -> Result<()> {
    let (_dir, pool, app) = setup().await?;

    seed_user(&pool, "Admin", "admin2@example.edu", Role::Admin).await?;
    let warden_id = seed_user(&pool, "Warden", "warden2@example.edu", Role::Warden).await?;
    let admin_token = login(&app, "admin2@example.edu").await?;

    // unknown keys are rejected at edit time
    let resp = send_json(
        &app,
        "PUT",
        &format!("/admin/users/{}/authz", warden_id),
        Some(&admin_token),
        Some(json!({"grants": ["cap.students.teleport"], "revokes": []})),
    )
    .await?;
    let (status, _) = read(resp).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // a valid diff round-trips exactly through the store
    let resp = send_json(
        &app,
        "PUT",
        &format!("/admin/users/{}/authz", warden_id),
        Some(&admin_token),
        Some(json!({
            "grants": ["cap.students.export"],
            "revokes": ["cap.leave.approve"]
        })),
    )
    .await?;
    let (status, _) = read(resp).await?;
    assert_eq!(status, StatusCode::OK);

    let resp = send_json(
        &app,
        "GET",
        &format!("/admin/users/{}/authz", warden_id),
        Some(&admin_token),
        None,
    )
    .await?;
    let (status, body) = read(resp).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["override"]["grants"], json!(["cap.students.export"]));
    assert_eq!(body["override"]["revokes"], json!(["cap.leave.approve"]));
    assert_eq!(body["role"], "Warden");

    // catalog listing
    let resp = send_json(&app, "GET", "/admin/authz/catalog", Some(&admin_token), None).await?;
    let (status, body) = read(resp).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["capabilities"]
        .as_array()
        .unwrap()
        .iter()
        .any(|v| v == "cap.students.view"));
    assert!(body["routes"]
        .as_array()
        .unwrap()
        .iter()
        .any(|v| v == "route.admin.dashboard"));

    // role baseline view, including the legacy permission-map projection
    let resp = send_json(&app, "GET", "/admin/authz/roles/Warden", Some(&admin_token), None).await?;
    let (status, body) = read(resp).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "Warden");
    assert_eq!(body["permissions"]["complaints"]["resolve"], true);

    // unknown role names resolve to no permissions, not an error
    let resp = send_json(&app, "GET", "/admin/authz/roles/Chancellor", Some(&admin_token), None).await?;
    let (status, body) = read(resp).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["capabilities"].as_array().map(|a| a.len()), Some(0));

    // a missing user is a 404, not a silent empty override
    let resp = send_json(
        &app,
        "GET",
        &format!("/admin/users/{}/authz", Uuid::new_v4()),
        Some(&admin_token),
        None,
    )
    .await?;
    let (status, _) = read(resp).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}
