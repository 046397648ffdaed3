//! # Shared Types Crate
//!
//! Chain primitives consumed by the masternode registry.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: blocks, transactions and provider payloads
//!   are defined once here and consumed read-only by the registry.
//! - **Opaque Cryptography**: keys are carried as raw bytes. Signature
//!   schemes are never evaluated here; only hashing is provided.

pub mod entities;
pub mod hashing;
pub mod transactions;

pub use entities::*;
pub use hashing::{sha256, sha256d, HashWriter};
pub use transactions::*;
