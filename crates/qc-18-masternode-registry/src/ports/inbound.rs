//! Driving ports (Inbound API)
//!
//! What the validation layer and the quorum subsystems call.

use crate::domain::{LlmqType, ProviderRecord, Registry, RegistryResult};
use crate::ports::chain::CoinView;
use shared_types::{Block, BlockRef, Height};
use std::sync::Arc;

/// Primary masternode registry API.
///
/// Block connect and disconnect must be serialized by the caller (the chain
/// lock); reads may run concurrently with them.
pub trait MasternodeRegistryApi: Send + Sync {
    /// Derive, persist and cache the registry for a newly connected block.
    ///
    /// Consensus violations are returned as `Validation` errors carrying
    /// the reject reason; the block must then be rejected.
    fn process_block(&self, block: &Block, coins: &dyn CoinView, debug_logs: bool) -> RegistryResult<()>;

    /// Roll the registry back over a disconnected block.
    fn undo_block(&self, block: &Block) -> RegistryResult<()>;

    /// Registry as of `block`, independent of any cache state.
    fn get_list_for_block(&self, block: &BlockRef) -> RegistryResult<Registry>;

    fn list_at_chain_tip(&self) -> RegistryResult<Registry>;

    fn updated_block_tip(&self, tip: &BlockRef);

    /// `None` means "at the current tip".
    fn is_enforced(&self, height: Option<Height>) -> bool;

    /// Ordered members of the quorum of `llmq_type` based on `base_block`.
    fn quorum_members(
        &self,
        llmq_type: LlmqType,
        base_block: &BlockRef,
    ) -> RegistryResult<Arc<Vec<ProviderRecord>>>;
}
