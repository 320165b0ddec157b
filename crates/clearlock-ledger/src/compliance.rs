//! Compliance oracle seam.
//!
//! The core asks one question: may this principal transfer this asset right
//! now? Production deployments answer from per-token rule engines; the
//! reference [`AllowListOracle`] answers from explicit allow/deny sets.

use std::collections::HashSet;

use clearlock_types::{Asset, PrincipalId};

/// Answers whether a transfer is currently permitted.
/// Consumed, never mutated, by the settlement core.
pub trait ComplianceOracle {
    fn is_compliant(&self, principal: PrincipalId, asset: &str) -> bool;
}

/// Allow/deny-list oracle. Deny entries always win; otherwise the
/// default mode decides unknown pairs.
#[derive(Debug, Default)]
pub struct AllowListOracle {
    default_allow: bool,
    allowed: HashSet<(PrincipalId, Asset)>,
    denied: HashSet<(PrincipalId, Asset)>,
}

impl AllowListOracle {
    /// Unknown (principal, asset) pairs are permitted.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            default_allow: true,
            ..Self::default()
        }
    }

    /// Unknown (principal, asset) pairs are rejected.
    #[must_use]
    pub fn restrictive() -> Self {
        Self {
            default_allow: false,
            ..Self::default()
        }
    }

    /// Explicitly permit a pair (only meaningful in restrictive mode).
    pub fn allow(&mut self, principal: PrincipalId, asset: &str) {
        self.allowed.insert((principal, asset.to_string()));
        self.denied.remove(&(principal, asset.to_string()));
    }

    /// Explicitly reject a pair.
    pub fn deny(&mut self, principal: PrincipalId, asset: &str) {
        self.denied.insert((principal, asset.to_string()));
    }
}

impl ComplianceOracle for AllowListOracle {
    fn is_compliant(&self, principal: PrincipalId, asset: &str) -> bool {
        let key = (principal, asset.to_string());
        if self.denied.contains(&key) {
            return false;
        }
        self.default_allow || self.allowed.contains(&key)
    }
}
