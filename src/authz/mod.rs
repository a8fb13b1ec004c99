//! Authorization core.
//!
//! Resolution pipeline: static role capability table -> per-user override
//! diff -> effective authz cached in the session -> request-time access
//! checks gated by the enforcement-mode controller. All decisions are local,
//! synchronous set lookups; the only I/O is the session/user read on a cache
//! miss.

pub mod catalog;
pub mod checks;
pub mod effective;
pub mod enforcement;
pub mod override_store;
pub mod role;
pub mod session;
pub mod table;

pub use catalog::{caps, route_keys};
pub use checks::{
    check_all_capabilities, check_any_capability, check_capability, check_route_access, Caller,
    Decision,
};
pub use effective::{build_effective, EffectiveAuthz};
pub use enforcement::{EnforcementConfig, EnforcementMode, KeyKind};
pub use override_store::{AuthzOverride, DbOverrideStore, OverrideStore};
pub use role::Role;
pub use session::{CurrentUser, SessionData};
