//! Per-user authz override persistence.
//!
//! An override is always a diff against the role defaults: explicit grants
//! and revokes of catalog keys. It is stored as a JSON column on the user
//! row; writes replace only that column. Concurrent writes are
//! last-write-wins.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

/// Grants and revokes applied on top of a role's defaults. Empty means
/// "pure role defaults".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AuthzOverride {
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub grants: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub revokes: BTreeSet<String>,
}

impl AuthzOverride {
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty() && self.revokes.is_empty()
    }
}

/// On-disk shapes the override column has carried over time. Old records
/// hold a flat `key -> allowed` map instead of the grants/revokes diff.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredOverride {
    Current(AuthzOverride),
    Legacy(BTreeMap<String, bool>),
}

impl StoredOverride {
    /// Total migration to the current shape. A legacy `true` entry becomes a
    /// grant, `false` a revoke.
    fn into_current(self) -> AuthzOverride {
        match self {
            StoredOverride::Current(current) => current,
            StoredOverride::Legacy(flat) => {
                let mut out = AuthzOverride::default();
                for (key, allowed) in flat {
                    if allowed {
                        out.grants.insert(key);
                    } else {
                        out.revokes.insert(key);
                    }
                }
                out
            }
        }
    }
}

/// Parse a raw override column value. Absent, null, or unreadable values
/// fall back to the empty diff so reads stay total.
pub fn parse_override(raw: Option<&str>) -> AuthzOverride {
    let Some(raw) = raw else {
        return AuthzOverride::default();
    };
    match serde_json::from_str::<StoredOverride>(raw) {
        Ok(stored) => stored.into_current(),
        Err(err) => {
            tracing::warn!(error = %err, "unreadable authz_override column, treating as empty");
            AuthzOverride::default()
        }
    }
}

/// Pluggable override persistence.
#[async_trait]
pub trait OverrideStore: Send + Sync {
    async fn load(&self, user_id: Uuid) -> AppResult<AuthzOverride>;
    async fn save(&self, user_id: Uuid, value: &AuthzOverride) -> AppResult<()>;
}

/// Override store backed by the `users.authz_override` column.
#[derive(Debug, Clone)]
pub struct DbOverrideStore {
    pool: SqlitePool,
}

impl DbOverrideStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OverrideStore for DbOverrideStore {
    async fn load(&self, user_id: Uuid) -> AppResult<AuthzOverride> {
        let raw: Option<Option<String>> =
            sqlx::query_scalar("SELECT authz_override FROM users WHERE id = ?")
                .bind(user_id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        match raw {
            Some(column) => Ok(parse_override(column.as_deref())),
            None => Err(AppError::not_found("user not found")),
        }
    }

    async fn save(&self, user_id: Uuid, value: &AuthzOverride) -> AppResult<()> {
        let json = serde_json::to_string(value)
            .map_err(|err| AppError::internal(format!("failed to encode override: {err}")))?;

        let result = sqlx::query("UPDATE users SET authz_override = ?, updated_at = ? WHERE id = ?")
            .bind(json)
            .bind(crate::utils::utc_now())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("user not found"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_column_means_empty_diff() {
        assert_eq!(parse_override(None), AuthzOverride::default());
        assert_eq!(parse_override(Some("null")), AuthzOverride::default());
    }

    #[test]
    fn current_shape_round_trips() {
        let mut value = AuthzOverride::default();
        value.grants.insert("cap.students.export".to_string());
        value.revokes.insert("cap.complaints.resolve".to_string());

        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(parse_override(Some(&json)), value);
    }

    #[test]
    fn legacy_flat_map_migrates_to_diff() {
        let legacy = r#"{"cap.students.export": true, "cap.complaints.resolve": false}"#;
        let migrated = parse_override(Some(legacy));

        assert!(migrated.grants.contains("cap.students.export"));
        assert!(migrated.revokes.contains("cap.complaints.resolve"));
    }

    #[test]
    fn garbage_column_degrades_to_empty() {
        assert_eq!(parse_override(Some("{not json")), AuthzOverride::default());
        assert_eq!(parse_override(Some("[1,2,3]")), AuthzOverride::default());
    }
}
