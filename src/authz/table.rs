//! Static role capability table.
//!
//! One authoritative mapping from role to default route-key and
//! capability-key sets. Route files declare only the key they require; the
//! role/feature mapping lives here and nowhere else.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::OnceLock;

use super::catalog::{caps, route_keys};
use super::role::Role;

/// Default access granted by a role before any per-user override is applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoleDefaults {
    pub routes: BTreeSet<&'static str>,
    pub capabilities: BTreeSet<&'static str>,
}

impl RoleDefaults {
    fn new(routes: &[&'static str], capabilities: &[&'static str]) -> Self {
        Self {
            routes: routes.iter().copied().collect(),
            capabilities: capabilities.iter().copied().collect(),
        }
    }
}

fn table() -> &'static HashMap<Role, RoleDefaults> {
    static TABLE: OnceLock<HashMap<Role, RoleDefaults>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut map = HashMap::new();

        map.insert(
            Role::SuperAdmin,
            RoleDefaults {
                routes: super::catalog::route_catalog().iter().copied().collect(),
                capabilities: super::catalog::capability_catalog().iter().copied().collect(),
            },
        );

        map.insert(
            Role::Admin,
            RoleDefaults::new(
                &[
                    route_keys::ADMIN_DASHBOARD,
                    route_keys::ADMIN_SETTINGS,
                    route_keys::ADMIN_STUDENTS,
                    route_keys::ADMIN_INVENTORY,
                ],
                &[
                    caps::USERS_VIEW,
                    caps::USERS_CREATE,
                    caps::USERS_UPDATE,
                    caps::USERS_MANAGE_ACCESS,
                    caps::STUDENTS_VIEW,
                    caps::STUDENTS_CREATE,
                    caps::STUDENTS_UPDATE,
                    caps::STUDENTS_DELETE,
                    caps::STUDENTS_EXPORT,
                    caps::ROOMS_VIEW,
                    caps::ROOMS_ALLOCATE,
                    caps::ROOMS_VACATE,
                    caps::INVENTORY_VIEW,
                    caps::INVENTORY_RECONCILE,
                    caps::HOSTELS_VIEW,
                    caps::HOSTELS_MANAGE,
                    caps::COMPLAINTS_VIEW,
                    caps::DISCIPLINE_VIEW,
                ],
            ),
        );

        map.insert(
            Role::Warden,
            RoleDefaults::new(
                &[
                    route_keys::WARDEN_DASHBOARD,
                    route_keys::WARDEN_COMPLAINTS,
                    route_keys::WARDEN_LEAVE,
                    route_keys::WARDEN_DISCIPLINE,
                ],
                &[
                    caps::STUDENTS_VIEW,
                    caps::ROOMS_VIEW,
                    caps::COMPLAINTS_VIEW,
                    caps::COMPLAINTS_RESOLVE,
                    caps::COMPLAINTS_ESCALATE,
                    caps::DISCIPLINE_VIEW,
                    caps::DISCIPLINE_CREATE,
                    caps::DISCIPLINE_CLOSE,
                    caps::LEAVE_VIEW,
                    caps::LEAVE_APPROVE,
                    caps::ATTENDANCE_VIEW,
                    caps::APPOINTMENTS_VIEW,
                ],
            ),
        );

        map.insert(
            Role::AssociateWarden,
            RoleDefaults::new(
                &[
                    route_keys::WARDEN_DASHBOARD,
                    route_keys::WARDEN_COMPLAINTS,
                    route_keys::WARDEN_LEAVE,
                ],
                &[
                    caps::STUDENTS_VIEW,
                    caps::ROOMS_VIEW,
                    caps::COMPLAINTS_VIEW,
                    caps::COMPLAINTS_RESOLVE,
                    caps::LEAVE_VIEW,
                    caps::LEAVE_APPROVE,
                    caps::ATTENDANCE_VIEW,
                ],
            ),
        );

        map.insert(
            Role::HostelSupervisor,
            RoleDefaults::new(
                &[route_keys::WARDEN_COMPLAINTS, route_keys::MAINTENANCE_TASKS],
                &[
                    caps::STUDENTS_VIEW,
                    caps::ROOMS_VIEW,
                    caps::COMPLAINTS_VIEW,
                    caps::COMPLAINTS_RESOLVE,
                    caps::INVENTORY_VIEW,
                    caps::INVENTORY_ISSUE,
                    caps::ATTENDANCE_VIEW,
                    caps::ATTENDANCE_MARK,
                ],
            ),
        );

        map.insert(
            Role::Security,
            RoleDefaults::new(
                &[route_keys::SECURITY_VISITORS, route_keys::SECURITY_GATE],
                &[
                    caps::VISITORS_VIEW,
                    caps::VISITORS_REGISTER,
                    caps::VISITORS_CHECKOUT,
                    caps::STUDENTS_VIEW,
                    caps::ATTENDANCE_VIEW,
                ],
            ),
        );

        map.insert(
            Role::HostelGate,
            RoleDefaults::new(
                &[route_keys::SECURITY_GATE],
                &[caps::VISITORS_VIEW, caps::VISITORS_REGISTER, caps::VISITORS_CHECKOUT],
            ),
        );

        map.insert(
            Role::MaintenanceStaff,
            RoleDefaults::new(
                &[route_keys::MAINTENANCE_TASKS],
                &[caps::COMPLAINTS_VIEW, caps::INVENTORY_VIEW, caps::INVENTORY_ISSUE],
            ),
        );

        map.insert(
            Role::Student,
            RoleDefaults::new(
                &[
                    route_keys::STUDENT_HOME,
                    route_keys::STUDENT_COMPLAINTS,
                    route_keys::STUDENT_LEAVE,
                ],
                &[
                    caps::COMPLAINTS_VIEW,
                    caps::COMPLAINTS_CREATE,
                    caps::LEAVE_VIEW,
                    caps::LEAVE_APPLY,
                    caps::APPOINTMENTS_VIEW,
                    caps::APPOINTMENTS_BOOK,
                    caps::APPOINTMENTS_CANCEL,
                ],
            ),
        );

        map.insert(
            Role::Gymkhana,
            RoleDefaults::new(
                &[route_keys::GYMKHANA_EVENTS, route_keys::STUDENT_HOME],
                &[
                    caps::STUDENTS_VIEW,
                    caps::APPOINTMENTS_VIEW,
                    caps::APPOINTMENTS_BOOK,
                    caps::APPOINTMENTS_CANCEL,
                ],
            ),
        );

        map
    })
}

/// Defaults for a known role.
pub fn defaults_for(role: Role) -> &'static RoleDefaults {
    // every Role variant is seeded above, so the lookup cannot miss
    table().get(&role).expect("role defaults table covers every role")
}

/// Defaults for a stored role string. Unknown names get empty defaults, not
/// an error.
pub fn defaults_for_name(role: &str) -> RoleDefaults {
    match Role::parse(role) {
        Some(role) => defaults_for(role).clone(),
        None => RoleDefaults::default(),
    }
}

/// Legacy `resource -> action -> allowed` view of a role's capability
/// defaults, derived by splitting `cap.<resource>.<action>` keys.
pub fn default_permissions(role: &str) -> BTreeMap<String, BTreeMap<String, bool>> {
    let mut permissions: BTreeMap<String, BTreeMap<String, bool>> = BTreeMap::new();
    for key in defaults_for_name(role).capabilities {
        let mut parts = key.splitn(3, '.');
        let (Some(_), Some(resource), Some(action)) = (parts.next(), parts.next(), parts.next())
        else {
            continue;
        };
        permissions
            .entry(resource.to_string())
            .or_default()
            .insert(action.to_string(), true);
    }
    permissions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::catalog::{is_known_capability, is_known_route};

    #[test]
    fn every_role_has_defaults_within_the_catalog() {
        for role in Role::ALL {
            let defaults = defaults_for(role);
            for key in &defaults.routes {
                assert!(is_known_route(key), "{role}: {key} not in route catalog");
            }
            for key in &defaults.capabilities {
                assert!(is_known_capability(key), "{role}: {key} not in capability catalog");
            }
        }
    }

    #[test]
    fn super_admin_holds_the_full_catalog() {
        let defaults = defaults_for(Role::SuperAdmin);
        assert_eq!(defaults.routes.len(), super::super::catalog::route_catalog().len());
        assert_eq!(
            defaults.capabilities.len(),
            super::super::catalog::capability_catalog().len()
        );
    }

    #[test]
    fn unknown_role_gets_no_permissions() {
        assert_eq!(defaults_for_name("Chancellor"), RoleDefaults::default());
        assert!(default_permissions("Chancellor").is_empty());
    }

    #[test]
    fn permission_map_splits_capability_keys() {
        let perms = default_permissions("Warden");
        assert_eq!(perms["complaints"]["resolve"], true);
        assert_eq!(perms["leave"]["approve"], true);
        assert!(!perms.contains_key("visitors"));
    }
}
