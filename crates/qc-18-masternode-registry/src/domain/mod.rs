//! Domain layer for the masternode registry
//!
//! Pure, storage-agnostic logic:
//! - state / state_delta: per-provider state and its field-masked diff
//! - record / unique: provider identity and uniqueness claims
//! - registry / registry_delta: the versioned provider set and its diff algebra
//! - pose: penalty and ban state machine
//! - payees / quorum: payment order and quorum sortition
//! - llmq: quorum type parameters

mod errors;
mod llmq;
mod payees;
mod pose;
mod quorum;
mod record;
mod registry;
mod registry_delta;
mod state;
mod state_delta;
mod unique;

#[cfg(test)]
pub(crate) mod test_utils;

pub use errors::*;
pub use llmq::*;
pub use pose::*;
pub use quorum::*;
pub use record::*;
pub use registry::*;
pub use registry_delta::*;
pub use state::*;
pub use state_delta::*;
pub use unique::UniqueProperty;
