//! Access-check predicates.
//!
//! Each check is a synchronous membership test over the caller's effective
//! authz, followed by a consultation of the enforcement controller when the
//! test fails. A failed-but-unenforced check logs a "would deny" diagnostic
//! and lets the request through; a failed-and-enforced check rejects with a
//! generic message. Key names are only ever logged server-side.

use uuid::Uuid;

use crate::errors::{AppError, AppResult};

use super::effective::EffectiveAuthz;
use super::enforcement::{EnforcementConfig, KeyKind};

/// Outcome of one membership test against the enforcement controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    /// Membership failed but no failing key is enforced; request proceeds.
    Observed { kind: KeyKind, keys: Vec<String> },
    /// Membership failed and at least one failing key is enforced.
    Denied { kind: KeyKind, keys: Vec<String> },
}

impl Decision {
    fn failed(cfg: &EnforcementConfig, kind: KeyKind, keys: Vec<String>) -> Decision {
        if keys.iter().any(|key| cfg.should_enforce(kind, key)) {
            Decision::Denied { kind, keys }
        } else {
            Decision::Observed { kind, keys }
        }
    }
}

pub fn check_route_access(cfg: &EnforcementConfig, effective: &EffectiveAuthz, key: &str) -> Decision {
    if effective.has_route(key) {
        Decision::Allowed
    } else {
        Decision::failed(cfg, KeyKind::Route, vec![key.to_string()])
    }
}

pub fn check_capability(cfg: &EnforcementConfig, effective: &EffectiveAuthz, key: &str) -> Decision {
    if effective.has_capability(key) {
        Decision::Allowed
    } else {
        Decision::failed(cfg, KeyKind::Capability, vec![key.to_string()])
    }
}

/// At least one key must be held. An empty list is "no restriction" and
/// passes vacuously in every mode; callers must not use an empty list to
/// mean deny-all.
pub fn check_any_capability(
    cfg: &EnforcementConfig,
    effective: &EffectiveAuthz,
    keys: &[&str],
) -> Decision {
    if keys.is_empty() || keys.iter().any(|key| effective.has_capability(key)) {
        return Decision::Allowed;
    }
    Decision::failed(
        cfg,
        KeyKind::Capability,
        keys.iter().map(|key| key.to_string()).collect(),
    )
}

/// Every key must be held. An empty list passes vacuously, same as
/// [`check_any_capability`].
pub fn check_all_capabilities(
    cfg: &EnforcementConfig,
    effective: &EffectiveAuthz,
    keys: &[&str],
) -> Decision {
    let missing: Vec<String> = keys
        .iter()
        .filter(|key| !effective.has_capability(key))
        .map(|key| key.to_string())
        .collect();

    if missing.is_empty() {
        Decision::Allowed
    } else {
        Decision::failed(cfg, KeyKind::Capability, missing)
    }
}

/// Identity and request metadata attached to "would deny" diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct Caller<'a> {
    pub user_id: Uuid,
    pub role: &'a str,
    pub method: &'a str,
    pub path: &'a str,
}

/// Turn a decision into a request outcome, emitting the observe-mode
/// diagnostic when enabled.
pub fn apply(cfg: &EnforcementConfig, caller: Caller<'_>, decision: Decision) -> AppResult<()> {
    match decision {
        Decision::Allowed => Ok(()),
        Decision::Observed { kind, keys } => {
            if cfg.log_denials {
                tracing::warn!(
                    user_id = %caller.user_id,
                    role = caller.role,
                    method = caller.method,
                    path = caller.path,
                    kind = kind.as_str(),
                    keys = ?keys,
                    "access check would deny"
                );
            }
            Ok(())
        }
        Decision::Denied { kind, keys } => {
            tracing::info!(
                user_id = %caller.user_id,
                role = caller.role,
                method = caller.method,
                path = caller.path,
                kind = kind.as_str(),
                keys = ?keys,
                "access denied"
            );
            Err(AppError::forbidden("access denied"))
        }
    }
}
