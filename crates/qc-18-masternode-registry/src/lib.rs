//! # Masternode Registry (qc-18)
//!
//! Deterministic registry of service providers ("masternodes") and the
//! quorum sortition built on it. Every node derives the same registry and
//! the same quorum memberships from chain data alone, so everything in the
//! domain layer is consensus code.
//!
//! ## Architecture
//!
//! ```text
//!  validation ──process_block / undo_block──→ RegistryManager ──→ RegistryStore ──→ KeyValueStore
//!                                                  │                (snapshots, deltas, crc32)
//!                                                  ├──→ ChainView / CoinView
//!                                                  └──→ RegistryListener (registry_updated)
//!  DKG / LLMQ ──quorum_members──────────────→ QuorumMemberCache ──→ Registry::calculate_quorum
//! ```
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Uniqueness | Address, owner/voting key, operator key and collateral claimed by one provider at most |
//! | 2 | Counter monotonicity | `total_registered` never decreases along a chain; internal ids are never reused |
//! | 3 | Ban freeze | A banned provider's penalty is frozen until revived |
//! | 4 | Exact diff | `a.apply_diff(&a.build_diff(&b)) == b` |
//! | 5 | Reversibility | Applying the inverse delta restores the parent registry |
//! | 6 | Determinism | Sortition depends only on registry contents and the seed |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - state, deltas, records, registry, PoSe, payees, quorums
//! - `codec/` - consensus binary encoding of snapshots and deltas
//! - `ports/` - inbound API, storage and chain SPIs, listener
//! - `adapters/` - in-memory and RocksDB stores, checksummed registry store
//! - `service/` - manager, block processing, caches
//! - `config` - chain parameters
//!
//! ## Usage
//!
//! ```ignore
//! use qc_18_masternode_registry::{
//!     InMemoryKVStore, NoopListener, RegistryConfig, RegistryDependencies, RegistryManager,
//! };
//!
//! let manager = RegistryManager::new(RegistryDependencies {
//!     kv_store: InMemoryKVStore::new(),
//!     chain,
//!     listener: Arc::new(NoopListener),
//!     config: RegistryConfig::default(),
//! })?;
//!
//! manager.process_block(&block, &coins, false)?;
//! let members = manager.quorum_members(LlmqType::Llmq50_60, &base_block)?;
//! ```

pub mod adapters;
pub mod codec;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export main types
pub use adapters::{InMemoryChainIndex, InMemoryCoinView, InMemoryKVStore, RegistryStore};
pub use config::RegistryConfig;
pub use domain::{
    ErrorClass, LlmqParams, LlmqType, ProviderRecord, ProviderState, ProviderStateDelta, Registry,
    RegistryDelta, RegistryError, RegistryResult, RevocationReason, UniqueProperty,
};
pub use ports::{
    ChainView, CoinView, KeyValueStore, MasternodeRegistryApi, NoopListener, RegistryListener,
};
pub use service::{QuorumMemberCache, RegistryDependencies, RegistryManager};
