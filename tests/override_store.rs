//! Override persistence: round-trips, legacy migration, and write isolation
//! against a real database.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use tempfile::TempDir;
use uuid::Uuid;

use hosteldesk::authz::{AuthzOverride, DbOverrideStore, OverrideStore};

async fn setup() -> Result<(TempDir, SqlitePool)> {
    let dir = tempfile::tempdir().context("failed to create tempdir")?;
    let db_path = dir.path().join("test_overrides.db");

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

    Ok((dir, pool))
}

async fn seed_user(pool: &SqlitePool, email: &str, authz_override: Option<&str>) -> Result<Uuid> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, role, authz_override, created_at, updated_at) VALUES (?, ?, ?, ?, 'Warden', ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind("Test User")
    .bind(email)
    .bind("not-a-real-hash")
    .bind(authz_override)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(id)
}

#[tokio::test]
async fn save_then_load_round_trips_exactly() -> Result<()> {
    let (_dir, pool) = setup().await?;
    let store = DbOverrideStore::new(pool.clone());
    let user_id = seed_user(&pool, "roundtrip@example.edu", None).await?;

    // absent column reads as the empty diff
    assert_eq!(store.load(user_id).await?, AuthzOverride::default());

    let mut value = AuthzOverride::default();
    value.grants.insert("cap.students.export".to_string());
    value.grants.insert("route.admin.students".to_string());
    value.revokes.insert("cap.complaints.resolve".to_string());

    store.save(user_id, &value).await?;
    assert_eq!(store.load(user_id).await?, value);

    Ok(())
}

#[tokio::test]
async fn legacy_flat_map_reads_as_diff() -> Result<()> {
    let (_dir, pool) = setup().await?;
    let store = DbOverrideStore::new(pool.clone());

    let legacy = r#"{"cap.students.export": true, "cap.leave.approve": false}"#;
    let user_id = seed_user(&pool, "legacy@example.edu", Some(legacy)).await?;

    let loaded = store.load(user_id).await?;
    assert!(loaded.grants.contains("cap.students.export"));
    assert!(loaded.revokes.contains("cap.leave.approve"));

    Ok(())
}

#[tokio::test]
async fn save_touches_only_the_override_column() -> Result<()> {
    let (_dir, pool) = setup().await?;
    let store = DbOverrideStore::new(pool.clone());
    let user_id = seed_user(&pool, "isolated@example.edu", None).await?;

    let mut value = AuthzOverride::default();
    value.revokes.insert("cap.leave.approve".to_string());
    store.save(user_id, &value).await?;

    let (email, role, password_hash): (String, String, String) = sqlx::query_as(
        "SELECT email, role, password_hash FROM users WHERE id = ?",
    )
    .bind(user_id.to_string())
    .fetch_one(&pool)
    .await?;

    assert_eq!(email, "isolated@example.edu");
    assert_eq!(role, "Warden");
    assert_eq!(password_hash, "not-a-real-hash");

    Ok(())
}

#[tokio::test]
async fn missing_user_is_an_error() -> Result<()> {
    let (_dir, pool) = setup().await?;
    let store = DbOverrideStore::new(pool.clone());

    assert!(store.load(Uuid::new_v4()).await.is_err());
    assert!(store.save(Uuid::new_v4(), &AuthzOverride::default()).await.is_err());

    Ok(())
}
