//! Error types for the ClearLock settlement engine.
//!
//! All errors use the `CL_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Order errors
//! - 2xx: Balance / transfer errors
//! - 3xx: Delayed-settlement errors
//! - 4xx: Batch errors
//! - 5xx: Arbitration-escrow errors
//! - 9xx: General / configuration errors

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::{Asset, BatchId, HoldId, OrderId, PrincipalId, RequestId};

/// Central error enum for all ClearLock operations.
#[derive(Debug, Error)]
pub enum ClearlockError {
    // =================================================================
    // Order Errors (1xx)
    // =================================================================
    /// The requested order was not found in the registry.
    #[error("CL_ERR_100: Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order failed validation (non-positive amount, stale expiry, etc.).
    #[error("CL_ERR_101: Invalid order: {reason}")]
    InvalidOrder { reason: String },

    /// The record is no longer in the state the operation requires.
    #[error("CL_ERR_102: Already finalized: record is not in the required state")]
    AlreadyFinalized,

    /// The order's expiry has passed.
    #[error("CL_ERR_103: Order expired: {0}")]
    OrderExpired(OrderId),

    /// The caller lacks the required relationship to the record.
    #[error("CL_ERR_104: Unauthorized: {reason}")]
    Unauthorized { reason: String },

    /// The compliance oracle denied a transfer of `asset` by `principal`.
    #[error("CL_ERR_105: Compliance rejected: principal {principal} may not transfer {asset}")]
    ComplianceRejected { principal: PrincipalId, asset: Asset },

    /// Identity gating is enabled and the principal has no verified identity.
    #[error("CL_ERR_106: Identity required for principal {0}")]
    IdentityRequired(PrincipalId),

    // =================================================================
    // Balance / Transfer Errors (2xx)
    // =================================================================
    /// Not enough available balance to perform the operation.
    #[error("CL_ERR_200: Insufficient available balance: need {needed}, have {available}")]
    InsufficientBalance { needed: Decimal, available: Decimal },

    /// Not enough held (locked) balance to settle or release.
    #[error("CL_ERR_201: Insufficient held balance")]
    InsufficientHeld,

    /// The balance-ledger primitive failed.
    #[error("CL_ERR_202: Transfer failed: {reason}")]
    TransferFailed { reason: String },

    // =================================================================
    // Delayed-Settlement Errors (3xx)
    // =================================================================
    /// The settlement request was not found.
    #[error("CL_ERR_300: Settlement request not found: {0}")]
    RequestNotFound(RequestId),

    /// The request's settlement delay has not yet elapsed.
    #[error("CL_ERR_301: Not yet eligible: eligible at {eligible_at}")]
    NotYetEligible { eligible_at: DateTime<Utc> },

    /// The settlement window has closed for this request.
    #[error("CL_ERR_302: Settlement window closed for request {0}")]
    SettlementWindowClosed(RequestId),

    // =================================================================
    // Batch Errors (4xx)
    // =================================================================
    /// The settlement batch was not found.
    #[error("CL_ERR_400: Batch not found: {0}")]
    BatchNotFound(BatchId),

    /// The batch failed validation (empty, oversized, etc.).
    #[error("CL_ERR_401: Invalid batch: {reason}")]
    InvalidBatch { reason: String },

    /// Batch settlement is disabled by configuration.
    #[error("CL_ERR_402: Batch settlement is disabled")]
    BatchingDisabled,

    // =================================================================
    // Arbitration-Escrow Errors (5xx)
    // =================================================================
    /// The escrow hold was not found.
    #[error("CL_ERR_500: Escrow hold not found: {0}")]
    HoldNotFound(HoldId),

    /// The hold is already under dispute.
    #[error("CL_ERR_501: Hold already disputed: {0}")]
    AlreadyDisputed(HoldId),

    /// The operation requires a disputed hold and this one is not.
    #[error("CL_ERR_502: Hold is not disputed: {0}")]
    NotDisputed(HoldId),

    /// The challenge period has already elapsed (cancel no longer allowed).
    #[error("CL_ERR_503: Challenge period elapsed at {elapsed_at}")]
    ChallengePeriodElapsed { elapsed_at: DateTime<Utc> },

    /// A resolution split does not add up to the locked amount.
    #[error("CL_ERR_504: Invalid split: locked {locked}, proposed total {proposed}")]
    InvalidSplit { locked: Decimal, proposed: Decimal },

    /// The hold failed validation (non-positive amount, degenerate parties, etc.).
    #[error("CL_ERR_505: Invalid hold: {reason}")]
    InvalidHold { reason: String },

    // =================================================================
    // General / Configuration (9xx)
    // =================================================================
    /// Configuration error (non-positive knob, bad duration bounds, etc.).
    #[error("CL_ERR_900: Configuration error: {0}")]
    Configuration(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, ClearlockError>;
