//! # clearlock-ledger
//!
//! The seams between the settlement core and its external collaborators:
//!
//! 1. **BalanceLedger**: per-(principal, asset) balances with atomic
//!    debit/credit and a single indivisible dual-leg [`BalanceLedger::swap`]
//! 2. **ComplianceOracle**: answers whether a principal may transfer an asset
//! 3. **IdentityProvider**: KYC level and investor-type lookup
//! 4. **Clock**: injected time source, so window checks are testable
//!
//! The core consumes these through traits (or the concrete ledger handle);
//! production deployments substitute their own implementations behind the
//! same interfaces.

pub mod balance;
pub mod clock;
pub mod compliance;
pub mod identity;

pub use balance::{BalanceEntry, BalanceLedger, TransferLeg};
pub use clock::{Clock, ManualClock, SystemClock};
pub use compliance::{AllowListOracle, ComplianceOracle};
pub use identity::{IdentityDirectory, IdentityProvider, IdentityStatus, InvestorType};
