use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::{AuthzOverride, EffectiveAuthz};
use crate::events::{Loggable, Severity};

/// Replacement override diff submitted by an admin. Keys are validated
/// against the catalogs before the write; the builder itself never rejects.
#[derive(Debug, Deserialize, ToSchema)]
pub struct OverrideUpdateRequest {
    #[serde(default)]
    pub grants: Vec<String>,
    #[serde(default)]
    pub revokes: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserAuthzResponse {
    pub user_id: Uuid,
    pub role: String,
    #[serde(rename = "override")]
    pub override_diff: AuthzOverride,
    pub effective: EffectiveAuthz,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CatalogResponse {
    pub capabilities: Vec<&'static str>,
    pub routes: Vec<&'static str>,
}

/// Baseline access a role carries before overrides, including the legacy
/// `resource -> action -> allowed` projection consumed by older clients.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoleDefaultsResponse {
    pub role: String,
    pub routes: Vec<String>,
    pub capabilities: Vec<String>,
    pub permissions: std::collections::BTreeMap<String, std::collections::BTreeMap<String, bool>>,
}

/// Audit wrapper for override edits; these are always Critical.
#[derive(Debug, Clone, Serialize)]
pub struct AuthzOverrideChange {
    pub user_id: Uuid,
    pub grants: Vec<String>,
    pub revokes: Vec<String>,
}

impl Loggable for AuthzOverrideChange {
    fn entity_type() -> &'static str { "authz_override" }
    fn subject_id(&self) -> Uuid { self.user_id }
    fn severity(&self) -> Severity { Severity::Critical }
}

/// Audit marker for explicit session authz refreshes.
#[derive(Debug, Clone, Serialize)]
pub struct SessionRefresh {
    pub user_id: Uuid,
    pub session_id: Uuid,
}

impl Loggable for SessionRefresh {
    fn entity_type() -> &'static str { "session" }
    fn subject_id(&self) -> Uuid { self.user_id }
}
