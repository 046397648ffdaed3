//! Adapters layer for the masternode registry
//!
//! - `InMemoryKVStore`: ordered in-memory `KeyValueStore`
//! - `RocksDbStore`: durable `KeyValueStore` (`rocksdb` feature)
//! - `RegistryStore`: checksummed snapshots and deltas over any store
//! - `InMemoryChainIndex` / `InMemoryCoinView`: chain views for tests and tools

pub mod memory_chain;
pub mod memory_kv;
pub mod registry_store;
#[cfg(feature = "rocksdb")]
pub mod rocksdb;

pub use memory_chain::{InMemoryChainIndex, InMemoryCoinView};
pub use memory_kv::InMemoryKVStore;
pub use registry_store::RegistryStore;
#[cfg(feature = "rocksdb")]
pub use self::rocksdb::{RocksDbConfig, RocksDbStore};
