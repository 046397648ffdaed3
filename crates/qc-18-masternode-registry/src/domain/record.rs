//! # Provider Record
//!
//! Immutable identity of a provider paired with a shared reference to its
//! current state. Updating a provider swaps the `Arc`; older registry
//! versions keep pointing at the previous state.

use super::state::ProviderState;
use crate::codec::{Decodable, DecodeError, Decoder, Encodable, Encoder};
use shared_types::{Hash, OutPoint};
use std::fmt;
use std::sync::Arc;

/// Upper bound of `operator_reward` (100.00%).
pub const MAX_OPERATOR_REWARD: u16 = 10_000;

#[derive(Clone, PartialEq, Eq)]
pub struct ProviderRecord {
    /// Hash of the registering transaction.
    pub pro_tx_hash: Hash,
    /// Dense id assigned at registration, never reused.
    pub internal_id: u64,
    pub collateral: OutPoint,
    /// Operator share of the payout, in hundredths of a percent.
    pub operator_reward: u16,
    pub state: Arc<ProviderState>,
}

impl ProviderRecord {
    pub fn new(
        pro_tx_hash: Hash,
        internal_id: u64,
        collateral: OutPoint,
        operator_reward: u16,
        state: ProviderState,
    ) -> Self {
        Self {
            pro_tx_hash,
            internal_id,
            collateral,
            operator_reward,
            state: Arc::new(state),
        }
    }

    /// Same identity, different state.
    pub fn with_state(&self, state: Arc<ProviderState>) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }

    pub fn is_banned(&self) -> bool {
        self.state.is_banned()
    }

    pub fn is_valid(&self) -> bool {
        !self.state.is_banned()
    }
}

impl fmt::Debug for ProviderRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRecord")
            .field("pro_tx_hash", &hex::encode(self.pro_tx_hash))
            .field("internal_id", &self.internal_id)
            .field("collateral", &self.collateral)
            .field("operator_reward", &self.operator_reward)
            .field("state", &self.state)
            .finish()
    }
}

impl Encodable for ProviderRecord {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_bytes(&self.pro_tx_hash);
        enc.write_varint(self.internal_id);
        self.collateral.encode(enc);
        enc.write_u16(self.operator_reward);
        self.state.encode(enc);
    }
}

impl Decodable for ProviderRecord {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        let pro_tx_hash = dec.read_array()?;
        let internal_id = dec.read_varint()?;
        let collateral = OutPoint::decode(dec)?;
        let operator_reward = dec.read_u16()?;
        if operator_reward > MAX_OPERATOR_REWARD {
            return Err(DecodeError::OutOfRange("operator reward"));
        }
        let state = ProviderState::decode(dec)?;
        Ok(ProviderRecord::new(
            pro_tx_hash,
            internal_id,
            collateral,
            operator_reward,
            state,
        ))
    }
}
