//! Error types for the masternode registry.
//!
//! Every error maps to one [`ErrorClass`], which tells the block-processing
//! layer what to do with it:
//!
//! - `Validation`: reject the block. Retrying cannot change the outcome.
//! - `NotFound`: recover locally (fall back to replay, return empty).
//! - `Corruption`: halt block processing; the node must resync.
//! - `Storage`: the surrounding block operation failed.
//! - `Config`: the registry was started with unusable parameters.

use crate::codec::DecodeError;
use shared_types::{Hash, Height};

/// Coarse classification of a [`RegistryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    NotFound,
    Corruption,
    Storage,
    Config,
}

/// Registry error types.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("unique property {property} already claimed by {owner}")]
    DuplicateUniqueProperty { property: &'static str, owner: String },

    #[error("internal id {0} already assigned")]
    DuplicateInternalId(u64),

    #[error("cannot decrease penalty of banned provider {0}")]
    DecreaseBanned(String),

    #[error("malformed delta: {0}")]
    MalformedDelta(String),

    /// A block violates a provider or quorum consensus rule.
    #[error("invalid block {block}: {reason}")]
    InvalidBlock { block: String, reason: &'static str },

    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("unknown internal id: {0}")]
    UnknownInternalId(u64),

    #[error("no registry available for block {hash} at height {height}")]
    ListNotFound { hash: String, height: Height },

    #[error("unique index inconsistent: {0}")]
    InconsistentUniqueIndex(String),

    #[error("stored data for {key} failed checksum")]
    ChecksumMismatch { key: String },

    #[error("corrupt registry data: {0}")]
    Decode(#[from] DecodeError),

    #[error("reconstructed registry at {0} disagrees with cached delta")]
    DeltaMismatch(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("invalid registry config: {0}")]
    InvalidConfig(String),
}

impl RegistryError {
    pub fn class(&self) -> ErrorClass {
        match self {
            RegistryError::DuplicateUniqueProperty { .. }
            | RegistryError::DuplicateInternalId(_)
            | RegistryError::DecreaseBanned(_)
            | RegistryError::MalformedDelta(_)
            | RegistryError::InvalidBlock { .. } => ErrorClass::Validation,
            RegistryError::UnknownProvider(_)
            | RegistryError::UnknownInternalId(_)
            | RegistryError::ListNotFound { .. } => ErrorClass::NotFound,
            RegistryError::InconsistentUniqueIndex(_)
            | RegistryError::ChecksumMismatch { .. }
            | RegistryError::Decode(_)
            | RegistryError::DeltaMismatch(_) => ErrorClass::Corruption,
            RegistryError::Storage(_) => ErrorClass::Storage,
            RegistryError::InvalidConfig(_) => ErrorClass::Config,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.class() == ErrorClass::Corruption
    }

    pub(crate) fn unknown_provider(hash: &Hash) -> Self {
        RegistryError::UnknownProvider(hex::encode(hash))
    }

    pub(crate) fn invalid_block(block: &Hash, reason: &'static str) -> Self {
        RegistryError::InvalidBlock {
            block: hex::encode(block),
            reason,
        }
    }

    /// Consensus reject reason, if this is a block-level rule violation.
    pub fn reject_reason(&self) -> Option<&'static str> {
        match self {
            RegistryError::InvalidBlock { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
