//! # Proof-of-Service Penalties
//!
//! Penalty and ban state machine:
//!
//! ```text
//!   valid(p) --punish(x)--> valid(min(p + x, max))   while p + x < max
//!   valid(p) --punish(x)--> banned(max)              once p + x >= max
//!   valid(p) --decrease-->  valid(max(p - 1, 0))
//!   banned   --punish-->    banned                   (penalty frozen)
//!   banned   --decrease-->  validation error
//!   any      --revive-->    valid(0)
//! ```
//!
//! The maximum penalty follows the registry size, so it is roughly one full
//! payment cycle.

use super::errors::{RegistryError, RegistryResult};
use super::registry::Registry;
use shared_types::Hash;
use tracing::{debug, info};

/// Floor of the dynamic maximum penalty.
pub const MIN_MAX_POSE_PENALTY: i32 = 100;

impl Registry {
    /// `max(100, all_count)`.
    pub fn calc_max_pose_penalty(&self) -> i32 {
        let count = i32::try_from(self.all_count()).unwrap_or(i32::MAX);
        count.max(MIN_MAX_POSE_PENALTY)
    }

    /// `percent` of the maximum penalty, rounded down.
    pub fn calc_penalty(&self, percent: i32) -> i32 {
        let max = i64::from(self.calc_max_pose_penalty());
        (max * i64::from(percent) / 100) as i32
    }

    /// Raises a provider's penalty, banning it once the maximum is reached.
    /// Banned providers are left untouched.
    pub fn pose_punish(&mut self, pro_tx_hash: &Hash, penalty: i32, debug_logs: bool) -> RegistryResult<()> {
        let record = self
            .get(pro_tx_hash)
            .ok_or_else(|| RegistryError::unknown_provider(pro_tx_hash))?;
        if record.is_banned() || penalty <= 0 {
            return Ok(());
        }

        let max_penalty = self.calc_max_pose_penalty();
        let mut state = (*record.state).clone();
        state.pose_penalty = state.pose_penalty.saturating_add(penalty).min(max_penalty);
        if debug_logs {
            debug!(
                "[qc-18] punished provider {}, penalty {} -> {} (max={})",
                hex::encode(pro_tx_hash),
                record.state.pose_penalty,
                state.pose_penalty,
                max_penalty
            );
        }

        if state.pose_penalty >= max_penalty {
            state.ban_if_not_banned(self.height());
            if debug_logs {
                info!(
                    "[qc-18] banned provider {} at height {}",
                    hex::encode(pro_tx_hash),
                    self.height()
                );
            }
        }
        self.update_record(pro_tx_hash, state)
    }

    /// Lowers a provider's penalty by one, never below zero.
    pub fn pose_decrease(&mut self, pro_tx_hash: &Hash) -> RegistryResult<()> {
        let record = self
            .get(pro_tx_hash)
            .ok_or_else(|| RegistryError::unknown_provider(pro_tx_hash))?;
        if record.is_banned() {
            return Err(RegistryError::DecreaseBanned(hex::encode(pro_tx_hash)));
        }
        if record.state.pose_penalty <= 0 {
            return Ok(());
        }

        let mut state = (*record.state).clone();
        state.pose_penalty -= 1;
        self.update_record(pro_tx_hash, state)
    }

    /// Decays the penalty of every valid provider holding one.
    pub fn decrease_pose_penalties(&mut self) -> RegistryResult<()> {
        let to_decrease: Vec<Hash> = self
            .iter_valid()
            .filter(|r| r.state.pose_penalty > 0)
            .map(|r| r.pro_tx_hash)
            .collect();
        for hash in &to_decrease {
            self.pose_decrease(hash)?;
        }
        Ok(())
    }
}
