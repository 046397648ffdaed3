//! # Registry Configuration
//!
//! Chain parameters the registry depends on. All values are consensus
//! relevant except the snapshot and retention knobs, which only affect
//! memory and disk use.

use crate::domain::{LlmqParams, LlmqType, RegistryError, RegistryResult};
use serde::{Deserialize, Serialize};
use shared_types::{Amount, Height};

/// Blocks between full snapshots (one day of blocks).
pub const DEFAULT_SNAPSHOT_PERIOD: i32 = 576;

/// Full snapshots kept on disk.
pub const DEFAULT_DISK_SNAPSHOTS: usize = 3;

/// 1000 coins.
pub const DEFAULT_COLLATERAL_AMOUNT: Amount = 1000 * 100_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub snapshot_period: i32,
    pub disk_snapshots: usize,
    /// Lists below this height are empty and blocks are not processed.
    pub activation_height: Height,
    /// From this height on, payments and quorums follow the registry.
    pub enforcement_height: Height,
    /// Exact value of a provider collateral output.
    pub collateral_amount: Amount,
    /// Penalties decay by one every this many blocks.
    pub penalty_decay_interval: i32,
    /// Percentage of the max penalty applied for failing a DKG session.
    pub punish_percent: i32,
    pub llmqs: Vec<LlmqParams>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            snapshot_period: DEFAULT_SNAPSHOT_PERIOD,
            disk_snapshots: DEFAULT_DISK_SNAPSHOTS,
            activation_height: 1,
            enforcement_height: 1,
            collateral_amount: DEFAULT_COLLATERAL_AMOUNT,
            penalty_decay_interval: 3,
            punish_percent: 66,
            llmqs: vec![
                LlmqParams::llmq_50_60(),
                LlmqParams::llmq_400_60(),
                LlmqParams::llmq_400_85(),
            ],
        }
    }
}

impl RegistryConfig {
    /// Regtest-like parameters: small snapshot period, per-block decay and
    /// the three-member test quorum.
    pub fn regtest() -> Self {
        Self {
            snapshot_period: 24,
            penalty_decay_interval: 1,
            collateral_amount: 1000,
            llmqs: vec![LlmqParams::llmq_test()],
            ..Self::default()
        }
    }

    pub fn with_snapshot_period(mut self, period: i32) -> Self {
        self.snapshot_period = period.max(1);
        self
    }

    pub fn with_disk_snapshots(mut self, count: usize) -> Self {
        self.disk_snapshots = count.max(1);
        self
    }

    pub fn with_activation_height(mut self, height: Height) -> Self {
        self.activation_height = height;
        self
    }

    pub fn with_enforcement_height(mut self, height: Height) -> Self {
        self.enforcement_height = height;
        self
    }

    pub fn with_collateral_amount(mut self, amount: Amount) -> Self {
        self.collateral_amount = amount;
        self
    }

    pub fn with_penalty_decay_interval(mut self, interval: i32) -> Self {
        self.penalty_decay_interval = interval.max(1);
        self
    }

    pub fn with_llmqs(mut self, llmqs: Vec<LlmqParams>) -> Self {
        self.llmqs = llmqs;
        self
    }

    /// Rejects parameters the registry cannot run on. Serde-loaded configs
    /// bypass the clamping builders, so this is checked at startup.
    pub fn validate(&self) -> RegistryResult<()> {
        let invalid = |msg: String| Err(RegistryError::InvalidConfig(msg));
        if self.snapshot_period <= 0 {
            return invalid(format!("snapshot_period must be positive, got {}", self.snapshot_period));
        }
        if self.disk_snapshots == 0 {
            return invalid("disk_snapshots must be at least 1".to_string());
        }
        if self.penalty_decay_interval <= 0 {
            return invalid(format!(
                "penalty_decay_interval must be positive, got {}",
                self.penalty_decay_interval
            ));
        }
        if !(0..=100).contains(&self.punish_percent) {
            return invalid(format!("punish_percent {} outside 0..=100", self.punish_percent));
        }
        for (i, params) in self.llmqs.iter().enumerate() {
            if params.dkg_interval <= 0 {
                return invalid(format!("{}: dkg_interval must be positive", params.name));
            }
            if params.size == 0 {
                return invalid(format!("{}: size must be positive", params.name));
            }
            if self.llmqs[..i].iter().any(|p| p.llmq_type == params.llmq_type) {
                return invalid(format!("{}: quorum type configured twice", params.name));
            }
        }
        Ok(())
    }

    pub fn llmq(&self, llmq_type: LlmqType) -> Option<&LlmqParams> {
        self.llmqs.iter().find(|p| p.llmq_type == llmq_type)
    }

    /// Number of recent deltas kept in memory.
    pub fn delta_cache_size(&self) -> usize {
        self.snapshot_period.max(1) as usize * self.disk_snapshots
    }

    pub fn is_snapshot_height(&self, height: Height) -> bool {
        height.rem_euclid(self.snapshot_period.max(1)) == 0
    }

    pub fn is_decay_height(&self, height: Height) -> bool {
        height.rem_euclid(self.penalty_decay_interval.max(1)) == 0
    }
}
