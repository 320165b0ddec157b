//! Settlement outcome records.
//!
//! One [`Settlement`] is written per escrow resolution attempt. Records are
//! immutable once written and form an append-only audit trail usable for
//! external reconciliation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Asset, EscrowId, OrderId, PrincipalId, RequestId, SettlementId};

/// Outcome of a settlement attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettlementStatus {
    Completed,
    Failed,
}

impl std::fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// What triggered this settlement: a direct order execution or a
/// delayed settlement request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettlementSource {
    Order(OrderId),
    Request(RequestId),
}

impl std::fmt::Display for SettlementSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Order(id) => write!(f, "order {id}"),
            Self::Request(id) => write!(f, "request {id}"),
        }
    }
}

/// The recorded outcome of processing an escrow or settlement request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    pub id: SettlementId,
    pub source: SettlementSource,
    /// The escrow record this settlement resolved, when one exists.
    pub escrow_id: Option<EscrowId>,
    pub seller: PrincipalId,
    pub buyer: PrincipalId,
    pub sell_asset: Asset,
    pub sell_amount: Decimal,
    pub pay_asset: Asset,
    pub pay_amount: Decimal,
    pub status: SettlementStatus,
    /// Populated only when `status` is [`SettlementStatus::Failed`].
    pub failure_reason: Option<String>,
    pub settled_at: DateTime<Utc>,
}
