//! # Registry Cache
//!
//! Recent registries and deltas keyed by block hash (never by height: two
//! forks may share a height).
//!
//! Retention, relative to the height `h` of the newest connected block:
//!
//! - deltas are kept for `snapshot_period * disk_snapshots` blocks
//! - lists older than that window are dropped
//! - lists that may still serve as a quorum base are kept
//! - the previous tip's list is dropped once a new tip exists
//! - other lists at DKG-interval heights are dropped (no quorum uses them)

use crate::config::RegistryConfig;
use crate::domain::{Registry, RegistryDelta};
use shared_types::{BlockRef, Hash, Height};
use std::collections::HashMap;

pub(crate) struct CachedDelta {
    pub forward: RegistryDelta,
    /// Only known for blocks connected by this process.
    pub inverse: Option<RegistryDelta>,
}

#[derive(Default)]
pub(crate) struct RegistryCache {
    pub lists: HashMap<Hash, Registry>,
    pub deltas: HashMap<Hash, CachedDelta>,
    pub tip: Option<BlockRef>,
}

impl RegistryCache {
    fn is_quorum_base(config: &RegistryConfig, height: Height, tip_height: Height) -> bool {
        config
            .llmqs
            .iter()
            .any(|params| params.keeps_base_list(height, tip_height))
    }

    /// Whether a freshly reconstructed list is worth caching.
    pub fn should_keep(&self, list: &Registry, config: &RegistryConfig) -> bool {
        match self.tip {
            Some(tip) if tip.hash == *list.block_hash() => true,
            Some(tip) => Self::is_quorum_base(config, list.height(), tip.height),
            None => false,
        }
    }

    /// Evicts entries that fell out of the retention window. Returns the
    /// number of lists and deltas removed.
    pub fn cleanup(&mut self, height: Height, config: &RegistryConfig) -> (usize, usize) {
        let window = i64::try_from(config.delta_cache_size()).unwrap_or(i64::MAX);
        let expired = |h: Height| i64::from(h).saturating_add(window) < i64::from(height);
        let prev_tip = self.tip.map(|t| t.prev_hash);

        let lists_before = self.lists.len();
        self.lists.retain(|hash, list| {
            if expired(list.height()) {
                return false;
            }
            if Self::is_quorum_base(config, list.height(), height) {
                return true;
            }
            if prev_tip == Some(*hash) {
                return false;
            }
            !config
                .llmqs
                .iter()
                .any(|p| list.height().rem_euclid(p.dkg_interval.max(1)) == 0)
        });

        let deltas_before = self.deltas.len();
        self.deltas.retain(|_, delta| !expired(delta.forward.height));

        (
            lists_before - self.lists.len(),
            deltas_before - self.deltas.len(),
        )
    }
}
