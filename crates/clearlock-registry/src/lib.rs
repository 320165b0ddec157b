//! # clearlock-registry
//!
//! The **Order Registry**: canonical set of exchange orders and their
//! lifecycle state.
//!
//! ## Order Flow
//!
//! ```text
//! create_order() → PENDING ──execute (settlement crate)──▶ LOCKED → EXECUTED
//!                     │
//!                     ├── cancel_order() ──▶ CANCELLED
//!                     └── expiry passes  ──▶ EXPIRED (lazy, discovered on read)
//! ```
//!
//! Admission is compliance-gated: both assets must pass the oracle check
//! for their respective holders, and identity gating may additionally be
//! required by configuration. Terminal orders are retained forever as
//! immutable history.

pub mod registry;

pub use registry::OrderRegistry;
