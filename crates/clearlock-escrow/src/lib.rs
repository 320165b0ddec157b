//! # clearlock-escrow
//!
//! The **Arbitration Desk**: escrow holds with a challenge period, a
//! buyer-initiated dispute path, and an arbitrator empowered to split the
//! held value.
//!
//! ## Hold lifecycle
//!
//! ```text
//!                 pay (buyer locks funds)
//!                        |
//!                        v
//!                  +-- ACTIVE --+-------------------+
//!                  |            |                   |
//!            release        dispute           challenge period
//!          (buyer, any      (buyer, before        elapses
//!            time)           a terminal op)         |
//!                  |            |                   |
//!                  v            v                   v
//!              CLAIMED      DISPUTED       claim (seller) -> CLAIMED
//!                               |          cancel is now blocked
//!                           resolve
//!                         (arbitrator
//!                          splits amount)
//!                               |
//!                               v
//!                           RESOLVED
//! ```
//!
//! Cancel is the buyer's inverse of claim: allowed only while the
//! challenge period is open and the hold is undisputed. Every funds
//! movement goes through the ledger's held-balance primitives, so a
//! hold's value is never spendable while the hold is live.

pub mod arbitration;

pub use arbitration::ArbitrationDesk;
