//! Enforcement-mode controller.
//!
//! Staged rollout of access checks without redeploys: `off` (never block),
//! `observe` (block only allow-listed keys, log the rest), `enforce` (block
//! everything). Built once from the environment at startup and carried as an
//! explicit value in application state, so tests can run independent
//! controllers side by side.

use std::collections::BTreeSet;

/// Process-wide enforcement posture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnforcementMode {
    /// No check ever blocks (development).
    #[default]
    Off,
    /// Only allow-listed keys block; everything else is log-only (rollout).
    Observe,
    /// Every failed check blocks (production).
    Enforce,
}

impl EnforcementMode {
    fn parse(value: &str) -> EnforcementMode {
        match value.to_lowercase().as_str() {
            "observe" => EnforcementMode::Observe,
            "enforce" => EnforcementMode::Enforce,
            _ => EnforcementMode::Off,
        }
    }
}

/// Which catalog a key being checked belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Route,
    Capability,
}

impl KeyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyKind::Route => "route",
            KeyKind::Capability => "capability",
        }
    }
}

/// Sentinel accepted in either allow-list meaning "all keys of this kind".
pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, Default)]
pub struct EnforcementConfig {
    pub mode: EnforcementMode,
    enforced_routes: BTreeSet<String>,
    enforced_capabilities: BTreeSet<String>,
    pub log_denials: bool,
}

impl EnforcementConfig {
    pub fn new(
        mode: EnforcementMode,
        enforced_routes: impl IntoIterator<Item = String>,
        enforced_capabilities: impl IntoIterator<Item = String>,
        log_denials: bool,
    ) -> Self {
        Self {
            mode,
            enforced_routes: enforced_routes.into_iter().collect(),
            enforced_capabilities: enforced_capabilities.into_iter().collect(),
            log_denials,
        }
    }

    /// Read the controller state from the environment. Not consulted again
    /// after startup; changing enforcement requires a restart.
    pub fn from_env() -> Self {
        let mode = EnforcementMode::parse(&std::env::var("AUTHZ_MODE").unwrap_or_default());
        let enforced_routes = csv_env("AUTHZ_ENFORCED_ROUTE_KEYS");
        let enforced_capabilities = csv_env("AUTHZ_ENFORCED_CAP_KEYS");
        let log_denials = std::env::var("AUTHZ_LOG_DENIALS")
            .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
            .unwrap_or(true);

        Self::new(mode, enforced_routes, enforced_capabilities, log_denials)
    }

    /// Should a failed membership test for `key` actually block the request?
    pub fn should_enforce(&self, kind: KeyKind, key: &str) -> bool {
        match self.mode {
            EnforcementMode::Enforce => true,
            EnforcementMode::Off => false,
            EnforcementMode::Observe => {
                let list = match kind {
                    KeyKind::Route => &self.enforced_routes,
                    KeyKind::Capability => &self.enforced_capabilities,
                };
                list.contains(WILDCARD) || list.contains(key)
            }
        }
    }
}

fn csv_env(name: &str) -> Vec<String> {
    std::env::var(name)
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(String::from)
        .collect()
}
