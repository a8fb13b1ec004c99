use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Primary function of a user account. Fixed for the lifetime of a session;
/// changing it requires re-authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Role {
    Admin,
    #[serde(rename = "Super Admin")]
    SuperAdmin,
    Warden,
    #[serde(rename = "Associate Warden")]
    AssociateWarden,
    #[serde(rename = "Hostel Supervisor")]
    HostelSupervisor,
    Security,
    #[serde(rename = "Hostel Gate")]
    HostelGate,
    #[serde(rename = "Maintenance Staff")]
    MaintenanceStaff,
    Student,
    Gymkhana,
}

impl Role {
    pub const ALL: [Role; 10] = [
        Role::Admin,
        Role::SuperAdmin,
        Role::Warden,
        Role::AssociateWarden,
        Role::HostelSupervisor,
        Role::Security,
        Role::HostelGate,
        Role::MaintenanceStaff,
        Role::Student,
        Role::Gymkhana,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::SuperAdmin => "Super Admin",
            Role::Warden => "Warden",
            Role::AssociateWarden => "Associate Warden",
            Role::HostelSupervisor => "Hostel Supervisor",
            Role::Security => "Security",
            Role::HostelGate => "Hostel Gate",
            Role::MaintenanceStaff => "Maintenance Staff",
            Role::Student => "Student",
            Role::Gymkhana => "Gymkhana",
        }
    }

    /// Parse a stored role string. Unknown strings yield `None`; callers fall
    /// back to empty defaults rather than failing the request.
    pub fn parse(value: &str) -> Option<Role> {
        Role::ALL.iter().copied().find(|role| role.as_str() == value)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_every_role() {
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn parse_rejects_unknown_role() {
        assert_eq!(Role::parse("Janitor"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn serde_uses_display_strings() {
        let json = serde_json::to_string(&Role::AssociateWarden).unwrap();
        assert_eq!(json, "\"Associate Warden\"");
        let back: Role = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Role::AssociateWarden);
    }
}
