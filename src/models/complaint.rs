use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::events::{Loggable, Severity};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Complaint {
    pub id: Uuid,
    /// User who filed the complaint.
    pub filed_by: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostel_id: Option<Uuid>,
    #[schema(example = "maintenance")]
    pub category: String,
    pub description: String,
    #[schema(example = "open")]
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Loggable for Complaint {
    fn entity_type() -> &'static str { "complaint" }
    fn subject_id(&self) -> Uuid { self.id }
    fn severity(&self) -> Severity { Severity::Important }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbComplaint {
    pub id: Uuid,
    pub filed_by: Uuid,
    pub hostel_id: Option<Uuid>,
    pub category: String,
    pub description: String,
    pub status: String,
    pub resolution_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<DbComplaint> for Complaint {
    fn from(db: DbComplaint) -> Self {
        Complaint {
            id: db.id,
            filed_by: db.filed_by,
            hostel_id: db.hostel_id,
            category: db.category,
            description: db.description,
            status: db.status,
            resolution_note: db.resolution_note,
            created_at: db.created_at,
            updated_at: db.updated_at,
            resolved_at: db.resolved_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ComplaintCreateRequest {
    #[schema(example = "maintenance")]
    pub category: String,
    #[schema(example = "Ceiling fan in B-214 not working")]
    pub description: String,
    pub hostel_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ComplaintResolveRequest {
    #[schema(example = "Fan replaced on 12th")]
    pub resolution_note: Option<String>,
}
