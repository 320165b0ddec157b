//! Configuration for the ClearLock engines.
//!
//! All knobs are pure policy: updates are validated for positivity and
//! duration bounds and affect future requests only, never retroactively.

use serde::{Deserialize, Serialize};

use crate::{ClearlockError, Result, constants};

/// Policy knobs for the settlement processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementConfig {
    /// Delay applied to requests created without an explicit delay.
    pub default_settlement_delay_secs: u64,
    /// Whether batched settlement is accepted at all.
    pub batch_settlement_enabled: bool,
    /// Maximum number of members in one batch.
    pub max_batch_size: usize,
    /// Grace window after eligibility during which a pending request
    /// may still be executed; stale requests fail with a closed-window error.
    pub settlement_window_secs: u64,
}

impl SettlementConfig {
    /// Validate knob bounds. Called on every update before it takes effect.
    pub fn validate(&self) -> Result<()> {
        if self.default_settlement_delay_secs == 0 {
            return Err(ClearlockError::Configuration(
                "default_settlement_delay_secs must be positive".to_string(),
            ));
        }
        if self.max_batch_size == 0 {
            return Err(ClearlockError::Configuration(
                "max_batch_size must be positive".to_string(),
            ));
        }
        if self.max_batch_size > constants::MAX_BATCH_SIZE_LIMIT {
            return Err(ClearlockError::Configuration(format!(
                "max_batch_size exceeds hard limit {}",
                constants::MAX_BATCH_SIZE_LIMIT
            )));
        }
        if self.settlement_window_secs == 0 {
            return Err(ClearlockError::Configuration(
                "settlement_window_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            default_settlement_delay_secs: constants::DEFAULT_SETTLEMENT_DELAY_SECS,
            batch_settlement_enabled: true,
            max_batch_size: constants::DEFAULT_MAX_BATCH_SIZE,
            settlement_window_secs: constants::DEFAULT_SETTLEMENT_WINDOW_SECS,
        }
    }
}

/// Policy knobs for the order registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// When set, both counterparties must have a verified identity
    /// at order creation.
    pub require_identity: bool,
    /// Minimum KYC level required of both counterparties when
    /// `require_identity` is set.
    pub min_kyc_level: u8,
}
