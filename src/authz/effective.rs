//! Effective-authz builder.
//!
//! Combines a role's static defaults with the user's override diff into one
//! resolved, serializable structure. Pure: identical (role, override) input
//! always yields a set-equal result.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::catalog::{is_known_capability, is_known_route};
use super::override_store::AuthzOverride;
use super::table::defaults_for_name;

/// Resolved access for one user: role defaults plus override grants, minus
/// override revokes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EffectiveAuthz {
    pub routes: BTreeSet<String>,
    pub capabilities: BTreeSet<String>,
}

impl EffectiveAuthz {
    pub fn has_route(&self, key: &str) -> bool {
        self.routes.contains(key)
    }

    pub fn has_capability(&self, key: &str) -> bool {
        self.capabilities.contains(key)
    }
}

/// Build the effective authz for a (role, override) pair.
///
/// Grants and revokes naming keys outside the catalogs are skipped silently;
/// catalog membership is enforced when an admin edits the override, not
/// here, so the builder is total. An explicit revoke removes a key even when
/// the role grants it by default and even when the same key also appears in
/// the grants.
pub fn build_effective(role: &str, override_diff: &AuthzOverride) -> EffectiveAuthz {
    let defaults = defaults_for_name(role);

    let mut routes: BTreeSet<String> = defaults.routes.iter().map(|k| k.to_string()).collect();
    let mut capabilities: BTreeSet<String> =
        defaults.capabilities.iter().map(|k| k.to_string()).collect();

    for key in &override_diff.grants {
        if is_known_route(key) {
            routes.insert(key.clone());
        } else if is_known_capability(key) {
            capabilities.insert(key.clone());
        }
    }

    for key in &override_diff.revokes {
        routes.remove(key);
        capabilities.remove(key);
    }

    EffectiveAuthz { routes, capabilities }
}
