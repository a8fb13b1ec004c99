use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app::AppState;
use crate::authz::session::{create_session, delete_session, persist_session_data, SessionData};
use crate::authz::{CurrentUser, Role};
use crate::errors::{AppError, AppResult};
use crate::events::{log_activity_with_context, RequestContext};
use crate::models::authz::SessionRefresh;
use crate::models::user::{
    fetch_db_user, fetch_db_user_by_email, AuthResponse, LoginRequest, RegisterRequest, User,
};
use crate::utils::{hash_password, utc_now, verify_password};

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    message: String,
}

/// Self-registration always lands on the Student role; staff accounts are
/// provisioned by an admin or the seed tool.
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = AuthResponse),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    if fetch_db_user_by_email(&state.pool, &payload.email).await?.is_some() {
        return Err(AppError::conflict("email already in use"));
    }

    let password_hash = hash_password(&payload.password)?;
    let now = utc_now();
    let user_id = uuid::Uuid::new_v4();

    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, role, sub_role, hostel_id, authz_override, pinned_tabs, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(user_id.to_string())
    .bind(&payload.name)
    .bind(&payload.email)
    .bind(password_hash)
    .bind(Role::Student.as_str())
    .bind(Option::<String>::None)
    .bind(Option::<String>::None)
    .bind(Option::<String>::None)
    .bind(Option::<String>::None)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let db_user = fetch_db_user(&state.pool, user_id).await?;
    let session = SessionData::from_user(&db_user);
    let session_id = create_session(&state.pool, &session, state.jwt.exp_hours).await?;
    let token = state.jwt.encode(user_id, session_id)?;
    let user: User = db_user.try_into()?;

    log_activity_with_context(
        &state.event_bus,
        "registered",
        Some(user_id),
        &user,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let db_user = fetch_db_user_by_email(&state.pool, &payload.email)
        .await?
        .ok_or_else(|| AppError::unauthorized("invalid credentials"))?;

    let password_ok = verify_password(&payload.password, &db_user.password_hash)?;
    if !password_ok {
        return Err(AppError::unauthorized("invalid credentials"));
    }

    // The effective authz is resolved once here and cached on the session;
    // per-request checks are pure set lookups from then on.
    let session = SessionData::from_user(&db_user);
    let session_id = create_session(&state.pool, &session, state.jwt.exp_hours).await?;
    let token = state.jwt.encode(db_user.id, session_id)?;
    let user: User = db_user.try_into()?;

    log_activity_with_context(
        &state.event_bus,
        "login",
        Some(user.id),
        &user,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(Json(AuthResponse { token, user }))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Auth",
    responses((status = 200, description = "Session view of the current user", body = SessionData)),
    security(("bearerAuth" = []))
)]
pub async fn me(user: CurrentUser) -> AppResult<Json<SessionData>> {
    Ok(Json(user.data))
}

/// Rebuild the caller's effective authz from the current user record and
/// persist it into the session, for any role.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "Auth",
    responses((status = 200, description = "Session refreshed", body = SessionData)),
    security(("bearerAuth" = []))
)]
pub async fn refresh(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
) -> AppResult<Json<SessionData>> {
    let db_user = fetch_db_user(&state.pool, user.data.user_id)
        .await
        .map_err(|err| match err {
            AppError::NotFound(_) => AppError::unauthorized("authentication required"),
            other => other,
        })?;

    let data = SessionData::from_user(&db_user);
    persist_session_data(&state.pool, user.session_id, &data).await?;

    log_activity_with_context(
        &state.event_bus,
        "refreshed",
        Some(data.user_id),
        &SessionRefresh { user_id: data.user_id, session_id: user.session_id },
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(Json(data))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "Auth",
    responses((status = 200, description = "Session destroyed")),
    security(("bearerAuth" = []))
)]
pub async fn logout(State(state): State<AppState>, user: CurrentUser) -> AppResult<Json<MessageResponse>> {
    delete_session(&state.pool, user.session_id).await?;
    Ok(Json(MessageResponse {
        message: "Logged out".to_string(),
    }))
}
