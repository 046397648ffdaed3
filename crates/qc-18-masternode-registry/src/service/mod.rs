//! # Registry Manager
//!
//! Advances the registry block by block and answers "what was the provider
//! set at block X" for any recent block.
//!
//! ## Connect
//!
//! The parent's registry plus the block's provider transactions give the
//! new registry. Its forward delta is written to disk for every block, a
//! full snapshot every `snapshot_period` blocks, and both the list and the
//! forward/inverse deltas are cached by block hash.
//!
//! ## Disconnect
//!
//! The cached inverse delta turns the block's registry back into its
//! parent's. The result is checked against the forward delta; a mismatch is
//! corruption. Without a cached inverse, the parent's registry is rebuilt
//! from the nearest snapshot.
//!
//! ## Locking
//!
//! One mutex guards the caches. It is taken per lookup or update and never
//! held across store I/O or sortition. Connect and disconnect are
//! serialized by the caller.

mod block_processor;
mod cache;
mod quorum_members;

#[cfg(test)]
mod tests;

pub use quorum_members::{QuorumMemberCache, QuorumMembers};

use crate::adapters::RegistryStore;
use crate::config::RegistryConfig;
use crate::domain::{
    quorum_modifier, ErrorClass, LlmqParams, LlmqType, ProviderRecord, ProviderState, Registry,
    RegistryDelta, RegistryError, RegistryResult, UniqueProperty,
};
use crate::ports::{ChainView, CoinView, KeyValueStore, MasternodeRegistryApi, RegistryListener};
use cache::{CachedDelta, RegistryCache};
use parking_lot::Mutex;
use shared_types::{Block, BlockRef, Hash, Height, ZERO_HASH};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Dependencies for RegistryManager
pub struct RegistryDependencies<KV, C> {
    pub kv_store: KV,
    pub chain: Arc<C>,
    pub listener: Arc<dyn RegistryListener>,
    pub config: RegistryConfig,
}

pub struct RegistryManager<KV, C>
where
    KV: KeyValueStore,
    C: ChainView,
{
    config: RegistryConfig,
    store: RegistryStore<KV>,
    chain: Arc<C>,
    listener: Arc<dyn RegistryListener>,
    cache: Mutex<RegistryCache>,
    quorum_members: QuorumMemberCache,
}

impl<KV, C> RegistryManager<KV, C>
where
    KV: KeyValueStore,
    C: ChainView,
{
    /// Fails if the configuration cannot drive consensus.
    pub fn new(deps: RegistryDependencies<KV, C>) -> RegistryResult<Self> {
        deps.config.validate()?;
        Ok(Self {
            config: deps.config,
            store: RegistryStore::new(deps.kv_store),
            chain: deps.chain,
            listener: deps.listener,
            cache: Mutex::new(RegistryCache::default()),
            quorum_members: QuorumMemberCache::new(),
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn store(&self) -> &RegistryStore<KV> {
        &self.store
    }

    /// Points the tip at the best block recorded on disk, if the chain
    /// still knows it.
    pub fn restore_tip(&self) -> RegistryResult<Option<BlockRef>> {
        let Some((hash, height)) = self.store.best_block()? else {
            return Ok(None);
        };
        let tip = self.chain.block(&hash);
        match tip {
            Some(tip) => {
                self.cache.lock().tip = Some(tip);
                info!("[qc-18] restored registry tip at height {}", height);
            }
            None => warn!(
                "[qc-18] stored best block {} at height {} unknown to the chain",
                hex::encode(hash),
                height
            ),
        }
        Ok(tip)
    }

    /// Connects `block`: builds, persists and caches its registry.
    pub fn process_block(
        &self,
        block: &Block,
        coins: &dyn CoinView,
        debug_logs: bool,
    ) -> RegistryResult<()> {
        let height = block.height;
        if height < self.config.activation_height {
            return Ok(());
        }

        let prev = self.parent_of(&block.block_ref())?;
        let old = self.get_list_for_block(&prev)?;
        let mut list = self.build_new_list_from_block(block, &prev, &old, coins, debug_logs)?;
        list.set_block(block.hash, height);

        let delta = old.build_diff(&list);
        let inverse = list.build_diff(&old);

        let with_snapshot = self.config.is_snapshot_height(height) || old.height() == -1;
        self.store.put_block_data(&list, &delta, with_snapshot)?;
        if with_snapshot {
            info!(
                "[qc-18] wrote registry snapshot at height {} ({} providers)",
                height,
                list.all_count()
            );
            self.store.prune(self.config.disk_snapshots)?;
        }

        let (lists_evicted, deltas_evicted) = {
            let mut cache = self.cache.lock();
            cache.lists.insert(block.hash, list);
            cache.deltas.insert(
                block.hash,
                CachedDelta {
                    forward: delta.clone(),
                    inverse: Some(inverse),
                },
            );
            cache.tip = Some(block.block_ref());
            cache.cleanup(height, &self.config)
        };
        if lists_evicted + deltas_evicted > 0 {
            debug!(
                "[qc-18] evicted {} lists and {} deltas at height {}",
                lists_evicted, deltas_evicted, height
            );
        }

        if delta.has_changes() {
            self.listener.registry_updated(false, &old, &delta);
        }
        Ok(())
    }

    /// Disconnects `block`, making its parent's registry the tip.
    pub fn undo_block(&self, block: &Block) -> RegistryResult<()> {
        if block.height < self.config.activation_height {
            return Ok(());
        }

        let current_ref = block.block_ref();
        let prev = self.parent_of(&current_ref)?;
        let cached = self
            .cache
            .lock()
            .deltas
            .get(&block.hash)
            .map(|d| (d.forward.clone(), d.inverse.clone()));
        let current = self.get_list_for_block(&current_ref)?;

        let (prev_list, inverse) = match cached {
            Some((forward, Some(inverse))) => {
                let prev_list = current
                    .apply_diff(&inverse)
                    .map_err(|e| self.corruption(&block.hash, e))?;
                if prev_list.build_diff(&current) != forward {
                    error!(
                        "[qc-18] undo of block {} does not reproduce its delta",
                        hex::encode(block.hash)
                    );
                    return Err(RegistryError::DeltaMismatch(hex::encode(block.hash)));
                }
                (prev_list, inverse)
            }
            _ => {
                warn!(
                    "[qc-18] no cached inverse for block {}, rebuilding parent registry",
                    hex::encode(block.hash)
                );
                let prev_list = self.get_list_for_block(&prev)?;
                let inverse = current.build_diff(&prev_list);
                (prev_list, inverse)
            }
        };

        self.store.set_best_block(&prev.hash, prev.height)?;
        {
            let mut cache = self.cache.lock();
            cache.lists.remove(&block.hash);
            cache.deltas.remove(&block.hash);
            cache.lists.insert(prev.hash, prev_list);
            cache.tip = Some(prev);
        }
        info!(
            "[qc-18] undid block {} at height {}",
            hex::encode(block.hash),
            block.height
        );

        if inverse.has_changes() {
            self.listener.registry_updated(true, &current, &inverse);
        }
        Ok(())
    }

    /// Registry as of `block`.
    ///
    /// Walks back to the nearest cached list or stored snapshot, then
    /// replays the deltas in between. Below the activation height the
    /// registry is empty.
    pub fn get_list_for_block(&self, block: &BlockRef) -> RegistryResult<Registry> {
        let mut pending: Vec<RegistryDelta> = Vec::new();
        let mut cursor = *block;

        let mut list = loop {
            if cursor.height < self.config.activation_height {
                break Registry::new(cursor.hash, -1);
            }
            if let Some(list) = self.cache.lock().lists.get(&cursor.hash).cloned() {
                break list;
            }
            if let Some(list) = self.store.get_snapshot(&cursor.hash)? {
                self.cache.lock().lists.insert(cursor.hash, list.clone());
                break list;
            }

            let cached = self
                .cache
                .lock()
                .deltas
                .get(&cursor.hash)
                .map(|d| d.forward.clone());
            let delta = match cached {
                Some(delta) => delta,
                None => {
                    let Some(delta) = self.store.get_delta(&cursor.hash)? else {
                        return Err(RegistryError::ListNotFound {
                            hash: hex::encode(cursor.hash),
                            height: cursor.height,
                        });
                    };
                    self.cache.lock().deltas.insert(
                        cursor.hash,
                        CachedDelta {
                            forward: delta.clone(),
                            inverse: None,
                        },
                    );
                    delta
                }
            };
            pending.push(delta);
            cursor = self.parent_of(&cursor)?;
        };

        if !pending.is_empty() {
            debug!(
                "[qc-18] replaying {} deltas onto registry at height {}",
                pending.len(),
                list.height()
            );
        }
        for delta in pending.iter().rev() {
            list = list
                .apply_diff(delta)
                .map_err(|e| self.corruption(&delta.block_hash, e))?;
        }

        let mut cache = self.cache.lock();
        if cache.should_keep(&list, &self.config) {
            cache
                .lists
                .entry(*list.block_hash())
                .or_insert_with(|| list.clone());
        }
        Ok(list)
    }

    pub fn updated_block_tip(&self, tip: &BlockRef) {
        self.cache.lock().tip = Some(*tip);
    }

    pub fn tip(&self) -> Option<BlockRef> {
        self.cache.lock().tip
    }

    /// Registry at the current tip; empty before the first block.
    pub fn list_at_chain_tip(&self) -> RegistryResult<Registry> {
        match self.tip() {
            Some(tip) => self.get_list_for_block(&tip),
            None => Ok(Registry::default()),
        }
    }

    /// Whether payments and quorums follow the registry at `height`
    /// (the tip when `None`).
    pub fn is_enforced(&self, height: Option<Height>) -> bool {
        // enforcement may start at block 1, so an unknown tip counts as 1
        let height = height.unwrap_or_else(|| self.tip().map_or(1, |t| t.height));
        height >= self.config.enforcement_height
    }

    /// Members of the `llmq_type` quorum based on `base_block`. Disabled
    /// quorum types have no members.
    pub fn quorum_members(
        &self,
        llmq_type: LlmqType,
        base_block: &BlockRef,
    ) -> RegistryResult<QuorumMembers> {
        match self.config.llmq(llmq_type) {
            Some(params) => self.quorum_members_for(params, base_block),
            None => Ok(Arc::new(Vec::new())),
        }
    }

    pub fn quorum_member_cache(&self) -> &QuorumMemberCache {
        &self.quorum_members
    }

    fn quorum_members_for(
        &self,
        params: &LlmqParams,
        base_block: &BlockRef,
    ) -> RegistryResult<QuorumMembers> {
        self.quorum_members
            .get_or_compute(params, &base_block.hash, || {
                let list = self.get_list_for_block(base_block)?;
                let modifier = quorum_modifier(params.llmq_type, &base_block.hash);
                Ok(list.calculate_quorum(params.size, &modifier))
            })
    }

    /// Index entry of the parent of `block`. Parents below the activation
    /// height need not be known to the chain view.
    fn parent_of(&self, block: &BlockRef) -> RegistryResult<BlockRef> {
        let height = block.height - 1;
        if height < self.config.activation_height {
            return Ok(BlockRef::new(block.prev_hash, height, ZERO_HASH));
        }
        self.chain
            .block(&block.prev_hash)
            .ok_or_else(|| RegistryError::ListNotFound {
                hash: hex::encode(block.prev_hash),
                height,
            })
    }

    /// Stored or cached data that fails to replay is corrupt, whatever the
    /// underlying error.
    fn corruption(&self, block_hash: &Hash, err: RegistryError) -> RegistryError {
        if err.class() == ErrorClass::Validation {
            error!(
                "[qc-18] stored delta for block {} does not apply: {}",
                hex::encode(block_hash),
                err
            );
            RegistryError::DeltaMismatch(hex::encode(block_hash))
        } else {
            err
        }
    }
}

impl<KV, C> MasternodeRegistryApi for RegistryManager<KV, C>
where
    KV: KeyValueStore,
    C: ChainView,
{
    fn process_block(&self, block: &Block, coins: &dyn CoinView, debug_logs: bool) -> RegistryResult<()> {
        RegistryManager::process_block(self, block, coins, debug_logs)
    }

    fn undo_block(&self, block: &Block) -> RegistryResult<()> {
        RegistryManager::undo_block(self, block)
    }

    fn get_list_for_block(&self, block: &BlockRef) -> RegistryResult<Registry> {
        RegistryManager::get_list_for_block(self, block)
    }

    fn list_at_chain_tip(&self) -> RegistryResult<Registry> {
        RegistryManager::list_at_chain_tip(self)
    }

    fn updated_block_tip(&self, tip: &BlockRef) {
        RegistryManager::updated_block_tip(self, tip)
    }

    fn is_enforced(&self, height: Option<Height>) -> bool {
        RegistryManager::is_enforced(self, height)
    }

    fn quorum_members(
        &self,
        llmq_type: LlmqType,
        base_block: &BlockRef,
    ) -> RegistryResult<Arc<Vec<ProviderRecord>>> {
        RegistryManager::quorum_members(self, llmq_type, base_block)
    }
}
