//! Student records. The whole area sits behind `route.admin.students`; each
//! handler additionally declares the capability it needs.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{caps, CurrentUser};
use crate::errors::{AppError, AppResult};
use crate::events::{log_activity_with_context, RequestContext};
use crate::models::student::{
    DbStudent, Student, StudentCreateRequest, StudentExportRow, StudentUpdateRequest,
};
use crate::utils::utc_now;

const STUDENT_COLUMNS: &str =
    "id, name, roll_no, email, hostel_id, room, created_at, updated_at, deleted_at";

#[utoipa::path(
    get,
    path = "/students",
    tag = "Students",
    responses(
        (status = 200, description = "List of students", body = Vec<Student>),
        (status = 403, description = "Access denied"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_students(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<Student>>> {
    user.require_capability(&state.authz, caps::STUDENTS_VIEW)?;

    let sql = format!(
        "SELECT {STUDENT_COLUMNS} FROM students WHERE deleted_at IS NULL ORDER BY roll_no"
    );
    let rows = sqlx::query_as::<_, DbStudent>(&sql).fetch_all(&state.pool).await?;

    Ok(Json(rows.into_iter().map(Student::from).collect()))
}

#[utoipa::path(
    post,
    path = "/students",
    tag = "Students",
    request_body = StudentCreateRequest,
    responses(
        (status = 201, description = "Student created", body = Student),
        (status = 409, description = "Roll number already exists"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_student(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Json(req): Json<StudentCreateRequest>,
) -> AppResult<(StatusCode, Json<Student>)> {
    user.require_capability(&state.authz, caps::STUDENTS_CREATE)?;

    let existing: i64 = sqlx::query_scalar(
        "SELECT COUNT(1) FROM students WHERE roll_no = ? AND deleted_at IS NULL",
    )
    .bind(&req.roll_no)
    .fetch_one(&state.pool)
    .await?;
    if existing > 0 {
        return Err(AppError::conflict("roll number already exists"));
    }

    let id = Uuid::new_v4();
    let now = utc_now();

    sqlx::query(
        "INSERT INTO students (id, name, roll_no, email, hostel_id, room, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(&req.name)
    .bind(&req.roll_no)
    .bind(&req.email)
    .bind(req.hostel_id.map(|h| h.to_string()))
    .bind(&req.room)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let student = Student {
        id,
        name: req.name,
        roll_no: req.roll_no,
        email: req.email,
        hostel_id: req.hostel_id,
        room: req.room,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };

    log_activity_with_context(
        &state.event_bus,
        "created",
        Some(user.data.user_id),
        &student,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok((StatusCode::CREATED, Json(student)))
}

#[utoipa::path(
    get,
    path = "/students/{id}",
    tag = "Students",
    params(("id" = Uuid, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student details", body = Student),
        (status = 404, description = "Student not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_student(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Student>> {
    user.require_capability(&state.authz, caps::STUDENTS_VIEW)?;

    let student = fetch_student(&state, id).await?;
    Ok(Json(student))
}

#[utoipa::path(
    put,
    path = "/students/{id}",
    tag = "Students",
    params(("id" = Uuid, Path, description = "Student ID")),
    request_body = StudentUpdateRequest,
    responses(
        (status = 200, description = "Student updated", body = Student),
        (status = 404, description = "Student not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_student(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<StudentUpdateRequest>,
) -> AppResult<Json<Student>> {
    user.require_capability(&state.authz, caps::STUDENTS_UPDATE)?;

    let old = fetch_student(&state, id).await?;
    let now = utc_now();

    let name = req.name.unwrap_or_else(|| old.name.clone());
    let email = req.email.unwrap_or_else(|| old.email.clone());
    let hostel_id = req.hostel_id.or(old.hostel_id);
    let room = req.room.or_else(|| old.room.clone());

    sqlx::query(
        "UPDATE students SET name = ?, email = ?, hostel_id = ?, room = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&name)
    .bind(&email)
    .bind(hostel_id.map(|h| h.to_string()))
    .bind(&room)
    .bind(now)
    .bind(id.to_string())
    .execute(&state.pool)
    .await?;

    let student = Student {
        id,
        name,
        roll_no: old.roll_no.clone(),
        email,
        hostel_id,
        room,
        created_at: old.created_at,
        updated_at: now,
        deleted_at: None,
    };

    log_activity_with_context(
        &state.event_bus,
        "updated",
        Some(user.data.user_id),
        &student,
        Some(&old),
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(Json(student))
}

#[utoipa::path(
    delete,
    path = "/students/{id}",
    tag = "Students",
    params(("id" = Uuid, Path, description = "Student ID")),
    responses(
        (status = 204, description = "Student soft deleted"),
        (status = 404, description = "Student not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_student(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    user.require_capability(&state.authz, caps::STUDENTS_DELETE)?;

    let student = fetch_student(&state, id).await?;

    sqlx::query("UPDATE students SET deleted_at = ? WHERE id = ?")
        .bind(utc_now())
        .bind(id.to_string())
        .execute(&state.pool)
        .await?;

    log_activity_with_context(
        &state.event_bus,
        "deleted",
        Some(user.data.user_id),
        &student,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Bulk export needs both view and export rights.
#[utoipa::path(
    get,
    path = "/students/export",
    tag = "Students",
    responses(
        (status = 200, description = "Flat export of all students", body = Vec<StudentExportRow>),
        (status = 403, description = "Access denied"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn export_students(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<StudentExportRow>>> {
    user.require_all_capabilities(&state.authz, &[caps::STUDENTS_VIEW, caps::STUDENTS_EXPORT])?;

    let sql = format!(
        "SELECT {STUDENT_COLUMNS} FROM students WHERE deleted_at IS NULL ORDER BY roll_no"
    );
    let rows = sqlx::query_as::<_, DbStudent>(&sql).fetch_all(&state.pool).await?;
    let export: Vec<StudentExportRow> = rows
        .into_iter()
        .map(Student::from)
        .map(|student| StudentExportRow::from(&student))
        .collect();

    Ok(Json(export))
}

async fn fetch_student(state: &AppState, id: Uuid) -> AppResult<Student> {
    let sql = format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = ? AND deleted_at IS NULL");
    let row = sqlx::query_as::<_, DbStudent>(&sql)
        .bind(id.to_string())
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::not_found("student not found"))?;

    Ok(Student::from(row))
}
