//! # Blocks, Transactions and Special Payloads
//!
//! Provider lifecycle is driven by special transactions carried in blocks:
//!
//! - `ProRegTx` registers a provider
//! - `ProUpServTx` updates its service address and operator payout
//! - `ProUpRegTx` rotates operator/voting keys and the payout script
//! - `ProUpRevTx` revokes the operator
//! - `CommitmentTxPayload` carries final quorum commitments
//!
//! Transaction ids are supplied by the chain layer and consumed opaquely.

use crate::entities::{Amount, BlsPublicKey, Hash, Height, KeyId, OutPoint, Script, TxOut};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Provider registration payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProRegTx {
    /// External collateral, or `(ZERO_HASH, n)` meaning output `n` of the
    /// registering transaction itself.
    pub collateral: OutPoint,
    pub service_addr: Option<SocketAddr>,
    pub owner_key: KeyId,
    pub operator_key: BlsPublicKey,
    pub voting_key: KeyId,
    /// Operator share of the payout, in hundredths of a percent.
    pub operator_reward: u16,
    pub payout_script: Script,
}

/// Service update payload, signed by the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProUpServTx {
    pub pro_tx_hash: Hash,
    pub service_addr: Option<SocketAddr>,
    pub operator_payout_script: Script,
}

/// Registrar update payload, signed by the owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProUpRegTx {
    pub pro_tx_hash: Hash,
    pub operator_key: BlsPublicKey,
    pub voting_key: KeyId,
    pub payout_script: Script,
}

/// Operator revocation payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProUpRevTx {
    pub pro_tx_hash: Hash,
    pub reason: u16,
}

/// A final commitment of a DKG session, already validated upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalCommitment {
    pub llmq_type: u8,
    /// Hash of the quorum base block.
    pub quorum_hash: Hash,
    pub signers: Vec<bool>,
    pub valid_members: Vec<bool>,
    pub quorum_public_key: BlsPublicKey,
}

impl FinalCommitment {
    /// A null commitment records that no quorum was formed.
    pub fn is_null(&self) -> bool {
        !self.signers.iter().any(|s| *s)
            && !self.valid_members.iter().any(|v| *v)
            && !self.quorum_public_key.is_valid()
    }

    pub fn count_valid_members(&self) -> usize {
        self.valid_members.iter().filter(|v| **v).count()
    }
}

/// Coinbase payload carrying the commitments mined in a block.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommitmentTxPayload {
    /// Height of the block carrying the payload.
    pub height: Height,
    pub commitments: Vec<FinalCommitment>,
}

/// Special transaction payloads understood by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecialPayload {
    ProviderRegister(ProRegTx),
    ProviderUpdateService(ProUpServTx),
    ProviderUpdateRegistrar(ProUpRegTx),
    ProviderRevoke(ProUpRevTx),
    QuorumCommitment(CommitmentTxPayload),
}

/// A transaction input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIn {
    pub prevout: OutPoint,
}

/// A transaction as seen by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub txid: Hash,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub payload: Option<SpecialPayload>,
}

impl Transaction {
    /// True if this is a registration whose collateral is its own output `n`
    /// holding exactly `collateral_amount`.
    pub fn is_pro_tx_with_collateral(&self, n: u32, collateral_amount: Amount) -> bool {
        let Some(SpecialPayload::ProviderRegister(pro_tx)) = &self.payload else {
            return false;
        };
        if !crate::entities::is_null_hash(&pro_tx.collateral.txid) {
            return false;
        }
        if pro_tx.collateral.vout != n {
            return false;
        }
        self.outputs
            .get(n as usize)
            .is_some_and(|out| out.value == collateral_amount)
    }
}

/// A block as seen by the registry. `transactions[0]` is the coinbase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub hash: Hash,
    pub prev_hash: Hash,
    pub height: Height,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn block_ref(&self) -> crate::entities::BlockRef {
        crate::entities::BlockRef::new(self.hash, self.height, self.prev_hash)
    }
}
