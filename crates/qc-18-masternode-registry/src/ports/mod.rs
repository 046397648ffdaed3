//! Ports layer for the masternode registry
//!
//! Driving port:
//! - `MasternodeRegistryApi`: block connect/disconnect and list queries
//!
//! Driven ports (implemented by the host):
//! - `KeyValueStore`: persistence
//! - `ChainView` / `CoinView`: block index and UTXO lookups
//!
//! Outbound notifications:
//! - `RegistryListener`: told about every registry change

pub mod chain;
pub mod events;
pub mod inbound;
pub mod storage;

pub use chain::{ChainView, CoinView};
pub use events::{NoopListener, RegistryListener};
pub use inbound::MasternodeRegistryApi;
pub use storage::{BatchOperation, KVStoreError, KeyValueStore};
