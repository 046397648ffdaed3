//! Long-living masternode quorum (LLMQ) parameters.

use serde::{Deserialize, Serialize};

/// Quorum type. The discriminant is the on-chain type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LlmqType {
    Llmq50_60 = 1,
    Llmq400_60 = 2,
    Llmq400_85 = 3,
    LlmqTest = 100,
}

impl LlmqType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(LlmqType::Llmq50_60),
            2 => Some(LlmqType::Llmq400_60),
            3 => Some(LlmqType::Llmq400_85),
            100 => Some(LlmqType::LlmqTest),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmqParams {
    pub llmq_type: LlmqType,
    pub name: String,
    /// Members selected per quorum.
    pub size: usize,
    /// Fewest valid members for a commitment to be accepted.
    pub min_size: usize,
    /// Signature shares needed to recover a signature.
    pub threshold: usize,
    /// A new quorum starts every `dkg_interval` blocks.
    pub dkg_interval: i32,
    pub dkg_phase_blocks: i32,
    pub dkg_mining_window_start: i32,
    pub dkg_mining_window_end: i32,
    pub dkg_bad_votes_threshold: usize,
    /// Quorums of this type that can sign at any time.
    pub signing_active_quorum_count: usize,
    /// Older quorums to stay connected to.
    pub keep_old_connections: usize,
    pub recovery_members: usize,
}

impl LlmqParams {
    pub fn llmq_50_60() -> Self {
        Self {
            llmq_type: LlmqType::Llmq50_60,
            name: "llmq_50_60".to_string(),
            size: 50,
            min_size: 40,
            threshold: 30,
            dkg_interval: 24,
            dkg_phase_blocks: 2,
            dkg_mining_window_start: 10,
            dkg_mining_window_end: 18,
            dkg_bad_votes_threshold: 40,
            signing_active_quorum_count: 24,
            keep_old_connections: 25,
            recovery_members: 25,
        }
    }

    pub fn llmq_400_60() -> Self {
        Self {
            llmq_type: LlmqType::Llmq400_60,
            name: "llmq_400_60".to_string(),
            size: 400,
            min_size: 300,
            threshold: 240,
            dkg_interval: 288,
            dkg_phase_blocks: 4,
            dkg_mining_window_start: 20,
            dkg_mining_window_end: 28,
            dkg_bad_votes_threshold: 300,
            signing_active_quorum_count: 4,
            keep_old_connections: 5,
            recovery_members: 100,
        }
    }

    pub fn llmq_400_85() -> Self {
        Self {
            llmq_type: LlmqType::Llmq400_85,
            name: "llmq_400_85".to_string(),
            size: 400,
            min_size: 350,
            threshold: 340,
            dkg_interval: 576,
            dkg_phase_blocks: 4,
            dkg_mining_window_start: 20,
            dkg_mining_window_end: 48,
            dkg_bad_votes_threshold: 300,
            signing_active_quorum_count: 4,
            keep_old_connections: 5,
            recovery_members: 100,
        }
    }

    /// Three-member quorum for regression tests.
    pub fn llmq_test() -> Self {
        Self {
            llmq_type: LlmqType::LlmqTest,
            name: "llmq_test".to_string(),
            size: 3,
            min_size: 2,
            threshold: 2,
            dkg_interval: 24,
            dkg_phase_blocks: 2,
            dkg_mining_window_start: 10,
            dkg_mining_window_end: 18,
            dkg_bad_votes_threshold: 2,
            signing_active_quorum_count: 4,
            keep_old_connections: 5,
            recovery_members: 3,
        }
    }

    /// Height of the quorum base block for a commitment mined at `height`.
    pub fn quorum_base_height(&self, height: i32) -> i32 {
        height - height.rem_euclid(self.dkg_interval.max(1))
    }

    /// Whether a registry at `height` may still serve as a quorum base for a
    /// chain whose tip is at `tip_height`.
    pub fn keeps_base_list(&self, height: i32, tip_height: i32) -> bool {
        let interval = self.dkg_interval.max(1);
        let window = i64::from(interval) * (self.keep_old_connections as i64 + 1);
        height.rem_euclid(interval) == 0 && i64::from(height) + window >= i64::from(tip_height)
    }
}
