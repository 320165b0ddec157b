//! System-wide constants for the ClearLock settlement engine.

/// Default delay for settlement requests created without an explicit one.
pub const DEFAULT_SETTLEMENT_DELAY_SECS: u64 = 3_600;

/// Default maximum members per settlement batch.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;

/// Hard upper bound on the configurable batch size.
pub const MAX_BATCH_SIZE_LIMIT: usize = 10_000;

/// Default grace window after a request becomes eligible.
pub const DEFAULT_SETTLEMENT_WINDOW_SECS: u64 = 86_400;

/// Maximum decimal precision for asset amounts (8 decimal places).
pub const AMOUNT_PRECISION: u32 = 8;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "ClearLock";
