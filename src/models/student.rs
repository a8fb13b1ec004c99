use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::events::Loggable;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub roll_no: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostel_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Loggable for Student {
    fn entity_type() -> &'static str { "student" }
    fn subject_id(&self) -> Uuid { self.id }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbStudent {
    pub id: Uuid,
    pub name: String,
    pub roll_no: String,
    pub email: String,
    pub hostel_id: Option<Uuid>,
    pub room: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<DbStudent> for Student {
    fn from(db: DbStudent) -> Self {
        Student {
            id: db.id,
            name: db.name,
            roll_no: db.roll_no,
            email: db.email,
            hostel_id: db.hostel_id,
            room: db.room,
            created_at: db.created_at,
            updated_at: db.updated_at,
            deleted_at: db.deleted_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StudentCreateRequest {
    #[schema(example = "Ravi Kumar")]
    pub name: String,
    #[schema(example = "H23CS014")]
    pub roll_no: String,
    #[schema(example = "ravi@example.edu")]
    pub email: String,
    pub hostel_id: Option<Uuid>,
    #[schema(example = "B-214")]
    pub room: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StudentUpdateRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub hostel_id: Option<Uuid>,
    pub room: Option<String>,
}

/// Flat export row for the CSV-ish export endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct StudentExportRow {
    pub roll_no: String,
    pub name: String,
    pub email: String,
    pub room: Option<String>,
}

impl From<&Student> for StudentExportRow {
    fn from(student: &Student) -> Self {
        StudentExportRow {
            roll_no: student.roll_no.clone(),
            name: student.name.clone(),
            email: student.email.clone(),
            room: student.room.clone(),
        }
    }
}
