//! The arbitration-capable escrow hold.
//!
//! A [`ConfidentialEscrow`] locks a buyer's payment against a seller, with a
//! designated arbitrator empowered to split the held value if the buyer
//! disputes. Four flags track the terminal disposition:
//!
//! - at most one of `claimed` / `cancelled` ever becomes true;
//! - `resolved` implies `claimed`;
//! - `disputed` may be set at most once, and only while the hold is active.
//!
//! Once a terminal flag is set, no state-changing operation succeeds.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Asset, HoldId, PrincipalId};

/// Derived view of a hold's state, for logs and queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HoldState {
    Active,
    Disputed,
    Resolved,
    Claimed,
    Cancelled,
}

impl std::fmt::Display for HoldState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Disputed => write!(f, "DISPUTED"),
            Self::Resolved => write!(f, "RESOLVED"),
            Self::Claimed => write!(f, "CLAIMED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Parameters for opening an arbitration hold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewHold {
    pub buyer: PrincipalId,
    pub seller: PrincipalId,
    pub arbitrator: PrincipalId,
    pub asset: Asset,
    pub amount: Decimal,
    /// Seconds from creation during which the buyer may dispute or cancel.
    pub challenge_period_secs: u64,
}

/// Buyer funds locked against a seller with third-party arbitration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidentialEscrow {
    pub id: HoldId,
    pub buyer: PrincipalId,
    pub seller: PrincipalId,
    pub arbitrator: PrincipalId,
    pub asset: Asset,
    /// Amount locked from the buyer at creation.
    pub amount: Decimal,
    /// Window during which the buyer may dispute or cancel.
    pub challenge_period_secs: u64,
    pub disputed: bool,
    pub resolved: bool,
    pub claimed: bool,
    pub cancelled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConfidentialEscrow {
    /// Whether a terminal flag has been set.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.claimed || self.cancelled
    }

    /// The instant the challenge period ends.
    #[must_use]
    pub fn challenge_deadline(&self) -> DateTime<Utc> {
        let secs = i64::try_from(self.challenge_period_secs).unwrap_or(i64::MAX);
        Duration::try_seconds(secs)
            .and_then(|d| self.created_at.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Whether the seller may claim at `now`: hold active, undisputed,
    /// and the challenge period has elapsed.
    #[must_use]
    pub fn can_claim(&self, now: DateTime<Utc>) -> bool {
        !self.is_terminal() && !self.disputed && now >= self.challenge_deadline()
    }

    /// Whether the buyer may cancel at `now`: hold active, undisputed,
    /// and the challenge period is still open.
    #[must_use]
    pub fn can_cancel(&self, now: DateTime<Utc>) -> bool {
        !self.is_terminal() && !self.disputed && now < self.challenge_deadline()
    }

    /// The derived state of the hold.
    #[must_use]
    pub fn state(&self) -> HoldState {
        if self.cancelled {
            HoldState::Cancelled
        } else if self.resolved {
            HoldState::Resolved
        } else if self.claimed {
            HoldState::Claimed
        } else if self.disputed {
            HoldState::Disputed
        } else {
            HoldState::Active
        }
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl ConfidentialEscrow {
    pub fn dummy(
        buyer: PrincipalId,
        seller: PrincipalId,
        arbitrator: PrincipalId,
        amount: Decimal,
        challenge_period_secs: u64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: HoldId::new(),
            buyer,
            seller,
            arbitrator,
            asset: "USDC".to_string(),
            amount,
            challenge_period_secs,
            disputed: false,
            resolved: false,
            claimed: false,
            cancelled: false,
            created_at: now,
            updated_at: now,
        }
    }
}
