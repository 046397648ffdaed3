//! # Quorum Member Cache
//!
//! Sortition for a given quorum type and base block always yields the same
//! members, so results are memoized per type in an LRU keyed by the base
//! block hash. Keying by hash keeps the cache valid across reorgs.
//!
//! The per-type LRUs are created on first use. One mutex guards the whole
//! map and is never held while members are being computed.

use crate::domain::{LlmqParams, LlmqType, ProviderRecord, RegistryResult};
use lru::LruCache;
use parking_lot::Mutex;
use shared_types::Hash;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

pub type QuorumMembers = Arc<Vec<ProviderRecord>>;

#[derive(Default)]
pub struct QuorumMemberCache {
    by_type: Mutex<HashMap<LlmqType, LruCache<Hash, QuorumMembers>>>,
}

impl QuorumMemberCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Room for every quorum that can sign plus the one being formed.
    fn capacity(params: &LlmqParams) -> NonZeroUsize {
        NonZeroUsize::new(params.signing_active_quorum_count + 1).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn get(&self, llmq_type: LlmqType, base_block_hash: &Hash) -> Option<QuorumMembers> {
        self.by_type
            .lock()
            .get_mut(&llmq_type)
            .and_then(|lru| lru.get(base_block_hash).cloned())
    }

    pub fn insert(&self, params: &LlmqParams, base_block_hash: Hash, members: QuorumMembers) {
        let mut by_type = self.by_type.lock();
        by_type
            .entry(params.llmq_type)
            .or_insert_with(|| LruCache::new(Self::capacity(params)))
            .put(base_block_hash, members);
    }

    /// Cached members, or the result of `compute` (which is then cached).
    /// Concurrent misses may both compute; the results are identical.
    pub fn get_or_compute<F>(
        &self,
        params: &LlmqParams,
        base_block_hash: &Hash,
        compute: F,
    ) -> RegistryResult<QuorumMembers>
    where
        F: FnOnce() -> RegistryResult<Vec<ProviderRecord>>,
    {
        if let Some(members) = self.get(params.llmq_type, base_block_hash) {
            return Ok(members);
        }
        let members = Arc::new(compute()?);
        self.insert(params, *base_block_hash, Arc::clone(&members));
        Ok(members)
    }

    pub fn len(&self, llmq_type: LlmqType) -> usize {
        self.by_type.lock().get(&llmq_type).map_or(0, |lru| lru.len())
    }

    pub fn clear(&self) {
        self.by_type.lock().clear();
    }
}
