//! Escrow record types.
//!
//! An [`Escrow`] snapshots both legs of a successfully-locked order at the
//! moment of execution. It is created exactly once per locked order, owned
//! by the settlement processor, and only ever read by queries afterwards.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Asset, EscrowId, OrderId, PrincipalId};

/// Status of an escrow record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EscrowStatus {
    /// Funds held pending settlement.
    Active,
    /// Settlement realized; escrow closed.
    Settled,
}

impl std::fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Settled => write!(f, "SETTLED"),
        }
    }
}

/// Record of funds held against a specific order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Escrow {
    pub id: EscrowId,
    pub order_id: OrderId,
    pub seller: PrincipalId,
    pub buyer: PrincipalId,
    pub sell_asset: Asset,
    pub sell_amount: Decimal,
    pub pay_asset: Asset,
    pub pay_amount: Decimal,
    pub status: EscrowStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
