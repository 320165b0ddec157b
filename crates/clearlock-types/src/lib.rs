//! # clearlock-types
//!
//! Shared types, errors, and configuration for the **ClearLock**
//! conditional-settlement engine.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`PrincipalId`], [`OrderId`], [`EscrowId`], [`SettlementId`], [`RequestId`], [`BatchId`], [`HoldId`]
//! - **Order model**: [`Order`], [`NewOrder`], [`OrderStatus`]
//! - **Escrow model**: [`Escrow`], [`EscrowStatus`]
//! - **Settlement model**: [`Settlement`], [`SettlementStatus`], [`SettlementSource`]
//! - **Delayed-settlement model**: [`SettlementRequest`], [`SettlementType`], [`RequestStatus`], [`SettlementBatch`], [`BatchOutcome`]
//! - **Arbitration model**: [`ConfidentialEscrow`], [`NewHold`], [`HoldState`]
//! - **Configuration**: [`SettlementConfig`], [`RegistryConfig`]
//! - **Audit trail**: [`AuditEvent`], [`AuditTrail`], [`EventKind`]
//! - **Errors**: [`ClearlockError`] with `CL_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod config;
pub mod confidential;
pub mod constants;
pub mod error;
pub mod escrow;
pub mod event;
pub mod ids;
pub mod order;
pub mod request;
pub mod settlement;

// Re-export all primary types at crate root for ergonomic imports:
//   use clearlock_types::{Order, OrderStatus, ClearlockError, ...};

pub use config::*;
pub use confidential::*;
pub use error::*;
pub use escrow::*;
pub use event::*;
pub use ids::*;
pub use order::*;
pub use request::*;
pub use settlement::*;

// Constants are accessed via `clearlock_types::constants::FOO`
// (not re-exported to avoid name collisions).
