//! Closed catalogs of capability keys and route keys.
//!
//! Capability keys (`cap.<domain>.<action>`) gate individual actions; route
//! keys (`route.<area>.<feature>`) gate whether a feature area is reachable
//! at all. Keys outside these catalogs never match anywhere in the system.

use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Well-known capability keys.
pub mod caps {
    // Users
    pub const USERS_VIEW: &str = "cap.users.view";
    pub const USERS_CREATE: &str = "cap.users.create";
    pub const USERS_UPDATE: &str = "cap.users.update";
    pub const USERS_MANAGE_ACCESS: &str = "cap.users.manage_access";

    // Students
    pub const STUDENTS_VIEW: &str = "cap.students.view";
    pub const STUDENTS_CREATE: &str = "cap.students.create";
    pub const STUDENTS_UPDATE: &str = "cap.students.update";
    pub const STUDENTS_DELETE: &str = "cap.students.delete";
    pub const STUDENTS_EXPORT: &str = "cap.students.export";

    // Rooms
    pub const ROOMS_VIEW: &str = "cap.rooms.view";
    pub const ROOMS_ALLOCATE: &str = "cap.rooms.allocate";
    pub const ROOMS_VACATE: &str = "cap.rooms.vacate";

    // Complaints
    pub const COMPLAINTS_VIEW: &str = "cap.complaints.view";
    pub const COMPLAINTS_CREATE: &str = "cap.complaints.create";
    pub const COMPLAINTS_RESOLVE: &str = "cap.complaints.resolve";
    pub const COMPLAINTS_ESCALATE: &str = "cap.complaints.escalate";

    // Visitors
    pub const VISITORS_VIEW: &str = "cap.visitors.view";
    pub const VISITORS_REGISTER: &str = "cap.visitors.register";
    pub const VISITORS_CHECKOUT: &str = "cap.visitors.checkout";

    // Disciplinary cases
    pub const DISCIPLINE_VIEW: &str = "cap.discipline.view";
    pub const DISCIPLINE_CREATE: &str = "cap.discipline.create";
    pub const DISCIPLINE_CLOSE: &str = "cap.discipline.close";

    // Inventory
    pub const INVENTORY_VIEW: &str = "cap.inventory.view";
    pub const INVENTORY_ISSUE: &str = "cap.inventory.issue";
    pub const INVENTORY_RECONCILE: &str = "cap.inventory.reconcile";

    // Leave
    pub const LEAVE_VIEW: &str = "cap.leave.view";
    pub const LEAVE_APPLY: &str = "cap.leave.apply";
    pub const LEAVE_APPROVE: &str = "cap.leave.approve";

    // Attendance
    pub const ATTENDANCE_VIEW: &str = "cap.attendance.view";
    pub const ATTENDANCE_MARK: &str = "cap.attendance.mark";

    // Appointments
    pub const APPOINTMENTS_VIEW: &str = "cap.appointments.view";
    pub const APPOINTMENTS_BOOK: &str = "cap.appointments.book";
    pub const APPOINTMENTS_CANCEL: &str = "cap.appointments.cancel";

    // Hostels
    pub const HOSTELS_VIEW: &str = "cap.hostels.view";
    pub const HOSTELS_MANAGE: &str = "cap.hostels.manage";
}

/// Well-known route keys.
pub mod route_keys {
    pub const ADMIN_DASHBOARD: &str = "route.admin.dashboard";
    pub const ADMIN_SETTINGS: &str = "route.admin.settings";
    pub const ADMIN_STUDENTS: &str = "route.admin.students";
    pub const ADMIN_INVENTORY: &str = "route.admin.inventory";
    pub const WARDEN_DASHBOARD: &str = "route.warden.dashboard";
    pub const WARDEN_COMPLAINTS: &str = "route.warden.complaints";
    pub const WARDEN_LEAVE: &str = "route.warden.leave";
    pub const WARDEN_DISCIPLINE: &str = "route.warden.discipline";
    pub const SECURITY_VISITORS: &str = "route.security.visitors";
    pub const SECURITY_GATE: &str = "route.security.gate";
    pub const MAINTENANCE_TASKS: &str = "route.maintenance.tasks";
    pub const STUDENT_HOME: &str = "route.student.home";
    pub const STUDENT_COMPLAINTS: &str = "route.student.complaints";
    pub const STUDENT_LEAVE: &str = "route.student.leave";
    pub const GYMKHANA_EVENTS: &str = "route.gymkhana.events";
}

const CAPABILITIES: &[&str] = &[
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
    caps::COMPLAINTS_VIEW,
    caps::COMPLAINTS_CREATE,
    caps::COMPLAINTS_RESOLVE,
    caps::COMPLAINTS_ESCALATE,
    caps::VISITORS_VIEW,
    caps::VISITORS_REGISTER,
    caps::VISITORS_CHECKOUT,
    caps::DISCIPLINE_VIEW,
    caps::DISCIPLINE_CREATE,
    caps::DISCIPLINE_CLOSE,
    caps::INVENTORY_VIEW,
    caps::INVENTORY_ISSUE,
    caps::INVENTORY_RECONCILE,
    caps::LEAVE_VIEW,
    caps::LEAVE_APPLY,
    caps::LEAVE_APPROVE,
    caps::ATTENDANCE_VIEW,
    caps::ATTENDANCE_MARK,
    caps::APPOINTMENTS_VIEW,
    caps::APPOINTMENTS_BOOK,
    caps::APPOINTMENTS_CANCEL,
    caps::HOSTELS_VIEW,
    caps::HOSTELS_MANAGE,
];

const ROUTE_KEYS: &[&str] = &[
    route_keys::ADMIN_DASHBOARD,
    route_keys::ADMIN_SETTINGS,
    route_keys::ADMIN_STUDENTS,
    route_keys::ADMIN_INVENTORY,
    route_keys::WARDEN_DASHBOARD,
    route_keys::WARDEN_COMPLAINTS,
    route_keys::WARDEN_LEAVE,
    route_keys::WARDEN_DISCIPLINE,
    route_keys::SECURITY_VISITORS,
    route_keys::SECURITY_GATE,
    route_keys::MAINTENANCE_TASKS,
    route_keys::STUDENT_HOME,
    route_keys::STUDENT_COMPLAINTS,
    route_keys::STUDENT_LEAVE,
    route_keys::GYMKHANA_EVENTS,
];

pub fn capability_catalog() -> &'static BTreeSet<&'static str> {
    static CATALOG: OnceLock<BTreeSet<&'static str>> = OnceLock::new();
    CATALOG.get_or_init(|| CAPABILITIES.iter().copied().collect())
}

pub fn route_catalog() -> &'static BTreeSet<&'static str> {
    static CATALOG: OnceLock<BTreeSet<&'static str>> = OnceLock::new();
    CATALOG.get_or_init(|| ROUTE_KEYS.iter().copied().collect())
}

pub fn is_known_capability(key: &str) -> bool {
    capability_catalog().contains(key)
}

pub fn is_known_route(key: &str) -> bool {
    route_catalog().contains(key)
}

/// Catalog membership for any key, routed by prefix.
pub fn is_known_key(key: &str) -> bool {
    is_known_capability(key) || is_known_route(key)
}
