//! Session-cached principal.
//!
//! The effective authz is computed at login and cached in the session row;
//! requests reuse it without touching the role table or override store. A
//! legacy-shaped session (old flat `permissions` field) is recomputed from
//! the user record on read and written back. Student sessions are the
//! exception: recomputed in place but never flushed, which keeps the
//! highest-traffic role off the session write path.

use axum::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::errors::{AppError, AppResult};
use crate::models::user::{fetch_db_user, DbUser};

use super::checks::{self, Caller};
use super::effective::{build_effective, EffectiveAuthz};
use super::enforcement::EnforcementConfig;
use super::override_store::parse_override;
use super::role::Role;

/// User fields cached in the session record.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SessionData {
    pub user_id: Uuid,
    pub email: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostel_id: Option<Uuid>,
    pub effective: EffectiveAuthz,
    #[serde(default)]
    pub pinned_tabs: Vec<String>,
}

impl SessionData {
    /// Build session data from a user row, resolving the effective authz
    /// from role defaults plus the stored override.
    pub fn from_user(user: &DbUser) -> Self {
        let override_diff = parse_override(user.authz_override.as_deref());
        let effective = build_effective(&user.role, &override_diff);
        let pinned_tabs = crate::utils::parse_string_array(user.pinned_tabs.as_deref());

        Self {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role.clone(),
            sub_role: user.sub_role.clone(),
            hostel_id: user.hostel_id,
            effective,
            pinned_tabs,
        }
    }
}

pub async fn create_session(
    pool: &SqlitePool,
    data: &SessionData,
    exp_hours: i64,
) -> AppResult<Uuid> {
    let session_id = Uuid::new_v4();
    let now = Utc::now();
    let json = serde_json::to_string(data)
        .map_err(|err| AppError::internal(format!("failed to encode session: {err}")))?;

    sqlx::query(
        "INSERT INTO sessions (id, user_id, data, created_at, expires_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(session_id.to_string())
    .bind(data.user_id.to_string())
    .bind(json)
    .bind(now)
    .bind(now + Duration::hours(exp_hours))
    .execute(pool)
    .await?;

    Ok(session_id)
}

pub async fn persist_session_data(
    pool: &SqlitePool,
    session_id: Uuid,
    data: &SessionData,
) -> AppResult<()> {
    let json = serde_json::to_string(data)
        .map_err(|err| AppError::internal(format!("failed to encode session: {err}")))?;

    sqlx::query("UPDATE sessions SET data = ? WHERE id = ?")
        .bind(json)
        .bind(session_id.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn delete_session(pool: &SqlitePool, session_id: Uuid) -> AppResult<()> {
    sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(session_id.to_string())
        .execute(pool)
        .await?;
    Ok(())
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    user_id: Uuid,
    data: String,
    expires_at: DateTime<Utc>,
}

/// Resolve a session id to its cached data, migrating legacy-shaped rows.
///
/// Any failure to resolve the identity (missing row, expired session,
/// vanished user) is an authentication error; authz is never consulted for
/// such requests.
pub async fn resolve_session(pool: &SqlitePool, session_id: Uuid) -> AppResult<SessionData> {
    let row: Option<SessionRow> =
        sqlx::query_as("SELECT user_id, data, expires_at FROM sessions WHERE id = ?")
            .bind(session_id.to_string())
            .fetch_optional(pool)
            .await?;

    let row = row.ok_or_else(|| AppError::unauthorized("authentication required"))?;
    if row.expires_at < Utc::now() {
        return Err(AppError::unauthorized("session expired"));
    }

    let value: serde_json::Value = serde_json::from_str(&row.data)
        .map_err(|err| AppError::internal(format!("unreadable session data: {err}")))?;

    // Current shape carries the resolved authz; key presence decides.
    if value.get("effective").is_some() {
        return serde_json::from_value(value)
            .map_err(|err| AppError::internal(format!("unreadable session data: {err}")));
    }

    // Legacy shape (flat `permissions` field or older): rebuild from the
    // user record.
    let user = fetch_db_user(pool, row.user_id)
        .await
        .map_err(|err| match err {
            AppError::NotFound(_) => AppError::unauthorized("authentication required"),
            other => other,
        })?;
    let data = SessionData::from_user(&user);

    if Role::parse(&data.role) != Some(Role::Student) {
        persist_session_data(pool, session_id, &data).await?;
    }

    Ok(data)
}

/// The authenticated principal for one request, carrying the session-cached
/// effective authz plus the request metadata used in authz diagnostics.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub session_id: Uuid,
    pub data: SessionData,
    method: String,
    path: String,
}

impl CurrentUser {
    pub fn caller(&self) -> Caller<'_> {
        Caller {
            user_id: self.data.user_id,
            role: &self.data.role,
            method: &self.method,
            path: &self.path,
        }
    }

    pub fn require_route_access(&self, cfg: &EnforcementConfig, key: &str) -> AppResult<()> {
        let decision = checks::check_route_access(cfg, &self.data.effective, key);
        checks::apply(cfg, self.caller(), decision)
    }

    pub fn require_capability(&self, cfg: &EnforcementConfig, key: &str) -> AppResult<()> {
        let decision = checks::check_capability(cfg, &self.data.effective, key);
        checks::apply(cfg, self.caller(), decision)
    }

    pub fn require_any_capability(&self, cfg: &EnforcementConfig, keys: &[&str]) -> AppResult<()> {
        let decision = checks::check_any_capability(cfg, &self.data.effective, keys);
        checks::apply(cfg, self.caller(), decision)
    }

    pub fn require_all_capabilities(&self, cfg: &EnforcementConfig, keys: &[&str]) -> AppResult<()> {
        let decision = checks::check_all_capabilities(cfg, &self.data.effective, keys);
        checks::apply(cfg, self.caller(), decision)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // A route guard may already have resolved the principal.
        if let Some(cached) = parts.extensions.get::<CurrentUser>() {
            return Ok(cached.clone());
        }

        let token = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::unauthorized("Authorization header missing"))?;

        let claims = state.jwt.decode(token)?;
        let data = resolve_session(&state.pool, claims.sid).await?;

        let user = CurrentUser {
            session_id: claims.sid,
            data,
            method: parts.method.to_string(),
            path: parts.uri.path().to_string(),
        };
        parts.extensions.insert(user.clone());

        Ok(user)
    }
}

/// Route-key guard applied with `route_layer` on a feature router. State is
/// the shared app state paired with the router's declared route key.
pub async fn route_guard(
    State((state, key)): State<(AppState, &'static str)>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();
    let user = CurrentUser::from_request_parts(&mut parts, &state).await?;
    user.require_route_access(&state.authz, key)?;

    Ok(next.run(Request::from_parts(parts, body)).await)
}
