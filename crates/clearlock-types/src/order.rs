//! Order types for the ClearLock registry.
//!
//! An order is a proposed bilateral exchange: the seller delivers
//! `sell_amount` of `sell_asset`, the buyer pays `pay_amount` of
//! `pay_asset`. Status transitions are monotonic — an order never
//! re-enters an earlier state — and terminal orders are retained as
//! immutable history, never deleted.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Asset, OrderId, PrincipalId};

/// Lifecycle status of an order.
///
/// Ordering matters: the derived `Ord` follows lifecycle progression,
/// which is what makes the monotonicity check a simple `>=` comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Created by the seller, awaiting execution.
    Pending,
    /// Funds captured; execution in flight.
    Locked,
    /// Both legs settled. Terminal.
    Executed,
    /// Cancelled by a counterparty while pending. Terminal.
    Cancelled,
    /// Expiry passed while still pending. Terminal.
    Expired,
}

impl OrderStatus {
    /// Whether no further transition is permitted out of this status.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Executed | Self::Cancelled | Self::Expired)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Locked => write!(f, "LOCKED"),
            Self::Executed => write!(f, "EXECUTED"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// Parameters for creating a new order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub seller: PrincipalId,
    pub buyer: PrincipalId,
    pub sell_asset: Asset,
    pub sell_amount: Decimal,
    pub pay_asset: Asset,
    pub pay_amount: Decimal,
    pub expiry: DateTime<Utc>,
}

/// A proposed bilateral exchange between a seller and a buyer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub seller: PrincipalId,
    pub buyer: PrincipalId,
    /// Asset the seller delivers.
    pub sell_asset: Asset,
    pub sell_amount: Decimal,
    /// Asset the buyer pays with.
    pub pay_asset: Asset,
    pub pay_amount: Decimal,
    pub status: OrderStatus,
    pub expiry: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Whether the stored status is stale due to a passed expiry.
    ///
    /// Expiry is discovered lazily: nothing drives pending orders into
    /// `Expired` — readers recompute, mutators re-check before acting.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == OrderStatus::Pending && now > self.expiry
    }

    /// The status as observed at `now`, accounting for lazy expiry.
    #[must_use]
    pub fn effective_status(&self, now: DateTime<Utc>) -> OrderStatus {
        if self.is_expired(now) {
            OrderStatus::Expired
        } else {
            self.status
        }
    }

    /// Whether `principal` is a counterparty to this order.
    #[must_use]
    pub fn involves(&self, principal: PrincipalId) -> bool {
        self.seller == principal || self.buyer == principal
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Order {
    pub fn dummy(seller: PrincipalId, buyer: PrincipalId) -> Self {
        let now = Utc::now();
        Self {
            id: OrderId::new(),
            seller,
            buyer,
            sell_asset: "GOLD-T".to_string(),
            sell_amount: Decimal::new(10, 0),
            pay_asset: "USDC".to_string(),
            pay_amount: Decimal::new(5000, 0),
            status: OrderStatus::Pending,
            expiry: now + chrono::Duration::hours(1),
            created_at: now,
            updated_at: now,
        }
    }
}
