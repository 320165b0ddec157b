//! Structured audit events for the ClearLock audit trail.
//!
//! Every state-changing operation pushes an [`AuditEvent`] carrying the
//! acting principal, the subject record's id, and a SHA-256 digest of the
//! serialized record. The trail is append-only and usable for external
//! reconciliation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::PrincipalId;

/// What kind of state change this event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    OrderCreated,
    OrderCancelled,
    OrderExecuted,
    EscrowOpened,
    EscrowSettled,
    SettlementRequested,
    SettlementExecuted,
    SettlementFailed,
    BatchCreated,
    BatchExecuted,
    ConfigUpdated,
    HoldOpened,
    HoldReleased,
    HoldDisputed,
    HoldResolved,
    HoldClaimed,
    HoldCancelled,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OrderCreated => write!(f, "ORDER_CREATED"),
            Self::OrderCancelled => write!(f, "ORDER_CANCELLED"),
            Self::OrderExecuted => write!(f, "ORDER_EXECUTED"),
            Self::EscrowOpened => write!(f, "ESCROW_OPENED"),
            Self::EscrowSettled => write!(f, "ESCROW_SETTLED"),
            Self::SettlementRequested => write!(f, "SETTLEMENT_REQUESTED"),
            Self::SettlementExecuted => write!(f, "SETTLEMENT_EXECUTED"),
            Self::SettlementFailed => write!(f, "SETTLEMENT_FAILED"),
            Self::BatchCreated => write!(f, "BATCH_CREATED"),
            Self::BatchExecuted => write!(f, "BATCH_EXECUTED"),
            Self::ConfigUpdated => write!(f, "CONFIG_UPDATED"),
            Self::HoldOpened => write!(f, "HOLD_OPENED"),
            Self::HoldReleased => write!(f, "HOLD_RELEASED"),
            Self::HoldDisputed => write!(f, "HOLD_DISPUTED"),
            Self::HoldResolved => write!(f, "HOLD_RESOLVED"),
            Self::HoldClaimed => write!(f, "HOLD_CLAIMED"),
            Self::HoldCancelled => write!(f, "HOLD_CANCELLED"),
        }
    }
}

/// A single append-only audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub kind: EventKind,
    /// The principal whose call caused this state change.
    pub actor: PrincipalId,
    /// Display form of the subject record's id.
    pub subject: String,
    /// Serialized snapshot of the subject record after the change.
    pub payload: Vec<u8>,
    /// SHA-256 digest of `payload`.
    pub payload_hash: [u8; 32],
    pub recorded_at: DateTime<Utc>,
}

impl AuditEvent {
    /// Hex rendering of the payload digest.
    #[must_use]
    pub fn hash_hex(&self) -> String {
        hex::encode(self.payload_hash)
    }
}

/// Append-only sequence of audit events.
#[derive(Debug, Default)]
pub struct AuditTrail {
    events: Vec<AuditEvent>,
}

impl AuditTrail {
    #[must_use]
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Append an event, computing the payload digest.
    pub fn record(
        &mut self,
        kind: EventKind,
        actor: PrincipalId,
        subject: impl Into<String>,
        payload: Vec<u8>,
        now: DateTime<Utc>,
    ) {
        let payload_hash: [u8; 32] = Sha256::digest(&payload).into();
        self.events.push(AuditEvent {
            kind,
            actor,
            subject: subject.into(),
            payload,
            payload_hash,
            recorded_at: now,
        });
    }

    /// All events, oldest first.
    #[must_use]
    pub fn events(&self) -> &[AuditEvent] {
        &self.events
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events of a particular kind, oldest first.
    pub fn of_kind(&self, kind: EventKind) -> impl Iterator<Item = &AuditEvent> {
        self.events.iter().filter(move |e| e.kind == kind)
    }
}
