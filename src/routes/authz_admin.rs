//! Authz administration: inspect and edit per-user override diffs.
//!
//! Catalog membership is enforced here, at edit time, so the effective-authz
//! builder can stay total. Every edit is written to the activity log with
//! Critical severity.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::catalog::{capability_catalog, is_known_key, route_catalog};
use crate::authz::{build_effective, caps, AuthzOverride, CurrentUser};
use crate::errors::{AppError, AppResult};
use crate::events::{log_activity_with_context, RequestContext};
use crate::authz::table::{default_permissions, defaults_for_name};
use crate::models::authz::{
    AuthzOverrideChange, CatalogResponse, OverrideUpdateRequest, RoleDefaultsResponse,
    UserAuthzResponse,
};
use crate::models::user::fetch_db_user;

#[utoipa::path(
    get,
    path = "/admin/authz/catalog",
    tag = "Authz",
    responses(
        (status = 200, description = "Capability and route-key catalogs", body = CatalogResponse),
        (status = 403, description = "Access denied"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_catalog(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<CatalogResponse>> {
    user.require_capability(&state.authz, caps::USERS_MANAGE_ACCESS)?;

    Ok(Json(CatalogResponse {
        capabilities: capability_catalog().iter().copied().collect(),
        routes: route_catalog().iter().copied().collect(),
    }))
}

/// Baseline view for one role. Unknown role names return empty sets rather
/// than an error, mirroring how the resolver treats them.
#[utoipa::path(
    get,
    path = "/admin/authz/roles/{role}",
    tag = "Authz",
    params(("role" = String, Path, description = "Role name, e.g. \"Warden\"")),
    responses(
        (status = 200, description = "Role default access", body = RoleDefaultsResponse),
        (status = 403, description = "Access denied"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_role_defaults(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(role): Path<String>,
) -> AppResult<Json<RoleDefaultsResponse>> {
    user.require_capability(&state.authz, caps::USERS_MANAGE_ACCESS)?;

    let defaults = defaults_for_name(&role);
    Ok(Json(RoleDefaultsResponse {
        routes: defaults.routes.iter().map(|k| k.to_string()).collect(),
        capabilities: defaults.capabilities.iter().map(|k| k.to_string()).collect(),
        permissions: default_permissions(&role),
        role,
    }))
}

#[utoipa::path(
    get,
    path = "/admin/users/{user_id}/authz",
    tag = "Authz",
    params(("user_id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Override diff and computed effective authz", body = UserAuthzResponse),
        (status = 404, description = "User not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_user_authz(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<UserAuthzResponse>> {
    user.require_capability(&state.authz, caps::USERS_MANAGE_ACCESS)?;

    let target = fetch_db_user(&state.pool, user_id).await?;
    let override_diff = state.overrides.load(user_id).await?;
    let effective = build_effective(&target.role, &override_diff);

    Ok(Json(UserAuthzResponse {
        user_id,
        role: target.role,
        override_diff,
        effective,
    }))
}

/// Replace a user's override diff. The new value takes effect at the
/// target's next session refresh or login, not retroactively on live
/// sessions.
#[utoipa::path(
    put,
    path = "/admin/users/{user_id}/authz",
    tag = "Authz",
    params(("user_id" = Uuid, Path, description = "User ID")),
    request_body = OverrideUpdateRequest,
    responses(
        (status = 200, description = "Override replaced", body = UserAuthzResponse),
        (status = 400, description = "Unknown capability or route key"),
        (status = 404, description = "User not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn put_user_authz(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
    Json(req): Json<OverrideUpdateRequest>,
) -> AppResult<Json<UserAuthzResponse>> {
    user.require_capability(&state.authz, caps::USERS_MANAGE_ACCESS)?;

    let unknown: Vec<&String> = req
        .grants
        .iter()
        .chain(req.revokes.iter())
        .filter(|key| !is_known_key(key))
        .collect();
    if !unknown.is_empty() {
        return Err(AppError::bad_request(format!(
            "unknown keys: {}",
            unknown
                .iter()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }

    let target = fetch_db_user(&state.pool, user_id).await?;

    let override_diff = AuthzOverride {
        grants: req.grants.iter().cloned().collect(),
        revokes: req.revokes.iter().cloned().collect(),
    };
    state.overrides.save(user_id, &override_diff).await?;

    let change = AuthzOverrideChange {
        user_id,
        grants: override_diff.grants.iter().cloned().collect(),
        revokes: override_diff.revokes.iter().cloned().collect(),
    };
    log_activity_with_context(
        &state.event_bus,
        "updated",
        Some(user.data.user_id),
        &change,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    let effective = build_effective(&target.role, &override_diff);
    Ok(Json(UserAuthzResponse {
        user_id,
        role: target.role,
        override_diff,
        effective,
    }))
}
