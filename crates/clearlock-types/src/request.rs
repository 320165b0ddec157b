//! Delayed settlement requests and batches.
//!
//! A [`SettlementRequest`] is the independent-escrow variant of an order:
//! instead of an expiry it carries an explicit `settlement_delay`, and it
//! becomes eligible for execution only once the delay has elapsed.
//!
//! A [`SettlementBatch`] groups request ids for best-effort execution:
//! individual member failures never abort the remaining members.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Asset, BatchId, PrincipalId, RequestId};

/// The kind of exchange a settlement request realizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettlementType {
    /// Direct delivery-versus-payment: asset against cash leg.
    DeliveryVersusPayment,
    /// Asset-for-asset exchange.
    Exchange,
}

impl std::fmt::Display for SettlementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DeliveryVersusPayment => write!(f, "DVP"),
            Self::Exchange => write!(f, "EXCHANGE"),
        }
    }
}

/// Lifecycle status of a settlement request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Completed,
    /// The transfer primitive failed; recorded, not retried automatically.
    Failed,
}

impl RequestStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// Parameters for creating a settlement request. A `None` delay falls
/// back to the configured default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSettlementRequest {
    pub seller: PrincipalId,
    pub buyer: PrincipalId,
    pub sell_asset: Asset,
    pub sell_amount: Decimal,
    pub pay_asset: Asset,
    pub pay_amount: Decimal,
    pub settlement_type: SettlementType,
    pub settlement_delay_secs: Option<u64>,
}

/// A bilateral exchange keyed by an explicit settlement delay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementRequest {
    pub id: RequestId,
    pub seller: PrincipalId,
    pub buyer: PrincipalId,
    pub sell_asset: Asset,
    pub sell_amount: Decimal,
    pub pay_asset: Asset,
    pub pay_amount: Decimal,
    pub settlement_type: SettlementType,
    /// Seconds from creation until the request may be executed.
    pub settlement_delay_secs: u64,
    /// Grace window after eligibility, snapshotted from configuration at
    /// creation so later config updates never apply retroactively.
    pub settlement_window_secs: u64,
    pub status: RequestStatus,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SettlementRequest {
    /// The instant at which the request becomes executable.
    #[must_use]
    pub fn eligible_at(&self) -> DateTime<Utc> {
        let delay = i64::try_from(self.settlement_delay_secs).unwrap_or(i64::MAX);
        Duration::try_seconds(delay)
            .and_then(|d| self.created_at.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Whether the settlement delay has elapsed at `now`.
    #[must_use]
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        now >= self.eligible_at()
    }

    /// The instant the settlement window closes; execution attempts after
    /// this instant fail.
    #[must_use]
    pub fn window_closes_at(&self) -> DateTime<Utc> {
        let window = i64::try_from(self.settlement_window_secs).unwrap_or(i64::MAX);
        Duration::try_seconds(window)
            .and_then(|d| self.eligible_at().checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Whether the window has closed at `now` (the request went stale).
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now > self.window_closes_at()
    }
}

/// Status of a settlement batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BatchStatus {
    Created,
    /// All members have been attempted (some may have failed or been skipped).
    Executed,
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::Executed => write!(f, "EXECUTED"),
        }
    }
}

/// Per-member counts recorded when a batch finishes executing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub succeeded: usize,
    pub failed: usize,
    /// Members no longer pending or not yet eligible at execution time.
    pub skipped: usize,
}

/// An ordered collection of settlement requests submitted together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementBatch {
    pub id: BatchId,
    pub name: String,
    pub members: Vec<RequestId>,
    pub status: BatchStatus,
    pub outcome: Option<BatchOutcome>,
    pub created_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl SettlementRequest {
    pub fn dummy(seller: PrincipalId, buyer: PrincipalId, delay_secs: u64) -> Self {
        let now = Utc::now();
        Self {
            id: RequestId::new(),
            seller,
            buyer,
            sell_asset: "GOLD-T".to_string(),
            sell_amount: Decimal::new(10, 0),
            pay_asset: "USDC".to_string(),
            pay_amount: Decimal::new(5000, 0),
            settlement_type: SettlementType::DeliveryVersusPayment,
            settlement_delay_secs: delay_secs,
            settlement_window_secs: 86_400,
            status: RequestStatus::Pending,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }
}
