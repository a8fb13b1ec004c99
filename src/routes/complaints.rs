//! Complaints. Two surfaces: the warden area (`route.warden.complaints`)
//! for triage and resolution, and the student area
//! (`route.student.complaints`) for filing and tracking one's own.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{caps, CurrentUser};
use crate::errors::{AppError, AppResult};
use crate::events::{log_activity_with_context, RequestContext};
use crate::models::complaint::{
    Complaint, ComplaintCreateRequest, ComplaintResolveRequest, DbComplaint,
};
use crate::utils::utc_now;

const COMPLAINT_COLUMNS: &str = "id, filed_by, hostel_id, category, description, status, resolution_note, created_at, updated_at, resolved_at";

#[utoipa::path(
    get,
    path = "/complaints",
    tag = "Complaints",
    responses(
        (status = 200, description = "All open and resolved complaints", body = Vec<Complaint>),
        (status = 403, description = "Access denied"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_complaints(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<Complaint>>> {
    user.require_capability(&state.authz, caps::COMPLAINTS_VIEW)?;

    let sql = format!("SELECT {COMPLAINT_COLUMNS} FROM complaints ORDER BY created_at DESC");
    let rows = sqlx::query_as::<_, DbComplaint>(&sql).fetch_all(&state.pool).await?;

    Ok(Json(rows.into_iter().map(Complaint::from).collect()))
}

/// Resolution is open to anyone who can either resolve or escalate.
#[utoipa::path(
    post,
    path = "/complaints/{id}/resolve",
    tag = "Complaints",
    params(("id" = Uuid, Path, description = "Complaint ID")),
    request_body = ComplaintResolveRequest,
    responses(
        (status = 200, description = "Complaint resolved", body = Complaint),
        (status = 404, description = "Complaint not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn resolve_complaint(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<ComplaintResolveRequest>,
) -> AppResult<Json<Complaint>> {
    user.require_any_capability(
        &state.authz,
        &[caps::COMPLAINTS_RESOLVE, caps::COMPLAINTS_ESCALATE],
    )?;

    let old = fetch_complaint(&state, id).await?;
    if old.status == "resolved" {
        return Err(AppError::conflict("complaint already resolved"));
    }

    let now = utc_now();
    sqlx::query(
        "UPDATE complaints SET status = 'resolved', resolution_note = ?, updated_at = ?, resolved_at = ? WHERE id = ?",
    )
    .bind(&req.resolution_note)
    .bind(now)
    .bind(now)
    .bind(id.to_string())
    .execute(&state.pool)
    .await?;

    let complaint = Complaint {
        status: "resolved".to_string(),
        resolution_note: req.resolution_note,
        updated_at: now,
        resolved_at: Some(now),
        ..old.clone()
    };

    log_activity_with_context(
        &state.event_bus,
        "resolved",
        Some(user.data.user_id),
        &complaint,
        Some(&old),
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(Json(complaint))
}

#[utoipa::path(
    get,
    path = "/my/complaints",
    tag = "Complaints",
    responses(
        (status = 200, description = "Complaints filed by the caller", body = Vec<Complaint>),
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_own_complaints(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<Complaint>>> {
    user.require_capability(&state.authz, caps::COMPLAINTS_VIEW)?;

    let sql = format!(
        "SELECT {COMPLAINT_COLUMNS} FROM complaints WHERE filed_by = ? ORDER BY created_at DESC"
    );
    let rows = sqlx::query_as::<_, DbComplaint>(&sql)
        .bind(user.data.user_id.to_string())
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(rows.into_iter().map(Complaint::from).collect()))
}

#[utoipa::path(
    post,
    path = "/my/complaints",
    tag = "Complaints",
    request_body = ComplaintCreateRequest,
    responses(
        (status = 201, description = "Complaint filed", body = Complaint),
        (status = 403, description = "Access denied"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_complaint(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Json(req): Json<ComplaintCreateRequest>,
) -> AppResult<(StatusCode, Json<Complaint>)> {
    user.require_capability(&state.authz, caps::COMPLAINTS_CREATE)?;

    let id = Uuid::new_v4();
    let now = utc_now();
    let hostel_id = req.hostel_id.or(user.data.hostel_id);

    sqlx::query(
        "INSERT INTO complaints (id, filed_by, hostel_id, category, description, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?, 'open', ?, ?)",
    )
    .bind(id.to_string())
    .bind(user.data.user_id.to_string())
    .bind(hostel_id.map(|h| h.to_string()))
    .bind(&req.category)
    .bind(&req.description)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let complaint = Complaint {
        id,
        filed_by: user.data.user_id,
        hostel_id,
        category: req.category,
        description: req.description,
        status: "open".to_string(),
        resolution_note: None,
        created_at: now,
        updated_at: now,
        resolved_at: None,
    };

    log_activity_with_context(
        &state.event_bus,
        "created",
        Some(user.data.user_id),
        &complaint,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok((StatusCode::CREATED, Json(complaint)))
}

async fn fetch_complaint(state: &AppState, id: Uuid) -> AppResult<Complaint> {
    let sql = format!("SELECT {COMPLAINT_COLUMNS} FROM complaints WHERE id = ?");
    let row = sqlx::query_as::<_, DbComplaint>(&sql)
        .bind(id.to_string())
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::not_found("complaint not found"))?;

    Ok(Complaint::from(row))
}
