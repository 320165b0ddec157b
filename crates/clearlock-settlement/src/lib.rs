//! # clearlock-settlement
//!
//! The **Settlement Processor**: validates timing and authorization, then
//! invokes the balance ledger to realize an exchange — individually or as
//! part of a batch.
//!
//! ## Two execution paths
//!
//! 1. **Direct** ([`SettlementProcessor::execute_order`]): the buyer executes
//!    a pending order; both legs are realized in one indivisible ledger swap,
//!    an escrow record snapshots the legs, and a completed settlement record
//!    is written.
//! 2. **Delayed / batched** (`request_settlement` → `execute_settlement`,
//!    or grouped via `create_settlement_batch` → `execute_settlement_batch`):
//!    requests become eligible once their delay elapses; batches execute
//!    best-effort with per-member failure isolation and never a global
//!    rollback.
//!
//! The processor owns all [`Escrow`](clearlock_types::Escrow) and
//! [`Settlement`](clearlock_types::Settlement) records; queries read them,
//! nothing else mutates them.

pub mod delayed;
pub mod processor;

pub use processor::SettlementProcessor;
