//! Identity lookup seam.
//!
//! Consumed for optional gating at order and request creation: when the
//! registry is configured to require identity, both counterparties must
//! have a record meeting the minimum KYC level.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use clearlock_types::PrincipalId;

/// Investor classification carried on an identity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvestorType {
    Retail,
    Accredited,
    Institutional,
}

impl std::fmt::Display for InvestorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Retail => write!(f, "RETAIL"),
            Self::Accredited => write!(f, "ACCREDITED"),
            Self::Institutional => write!(f, "INSTITUTIONAL"),
        }
    }
}

/// Verified identity attributes for a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityStatus {
    pub kyc_level: u8,
    pub investor_type: InvestorType,
}

/// Identity lookup consumed by the registry for optional gating.
pub trait IdentityProvider {
    fn has_identity(&self, principal: PrincipalId) -> bool;
    fn identity_status(&self, principal: PrincipalId) -> Option<IdentityStatus>;
}

/// In-memory identity directory.
#[derive(Debug, Default)]
pub struct IdentityDirectory {
    records: HashMap<PrincipalId, IdentityStatus>,
}

impl IdentityDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    /// Register or replace a principal's identity record.
    pub fn register(&mut self, principal: PrincipalId, status: IdentityStatus) {
        self.records.insert(principal, status);
    }
}

impl IdentityProvider for IdentityDirectory {
    fn has_identity(&self, principal: PrincipalId) -> bool {
        self.records.contains_key(&principal)
    }

    fn identity_status(&self, principal: PrincipalId) -> Option<IdentityStatus> {
        self.records.get(&principal).copied()
    }
}
