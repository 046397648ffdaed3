//! # Provider State
//!
//! The mutable attributes of one provider. A `ProviderState` is never changed
//! once it is referenced by a published registry: updates build a new value
//! and swap the record's `Arc`.

use serde::{Deserialize, Serialize};
use shared_types::{
    sha256, BlsPublicKey, Hash, Height, KeyId, ProRegTx, Script, ZERO_HASH,
};
use std::net::SocketAddr;

/// Revocation reason codes carried by `ProUpRevTx`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum RevocationReason {
    NotSpecified = 0,
    TerminationOfService = 1,
    CompromisedKeys = 2,
    ChangeOfKeys = 3,
}

impl RevocationReason {
    pub const MAX: u16 = RevocationReason::ChangeOfKeys as u16;

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(Self::NotSpecified),
            1 => Some(Self::TerminationOfService),
            2 => Some(Self::CompromisedKeys),
            3 => Some(Self::ChangeOfKeys),
            _ => None,
        }
    }
}

/// Per-provider mutable state.
///
/// `pose_ban_height != -1` if and only if the provider is banned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderState {
    pub registered_height: Height,
    pub last_paid_height: Height,
    pub pose_penalty: i32,
    pub pose_revived_height: Height,
    pub pose_ban_height: Height,
    pub revocation_reason: u16,
    /// Hash of the block that confirmed the registration, zero until confirmed.
    pub confirmed_hash: Hash,
    /// `sha256(pro_tx_hash || confirmed_hash)`.
    pub confirmed_hash_with_pro_tx: Hash,
    pub owner_key: KeyId,
    pub operator_key: BlsPublicKey,
    pub voting_key: KeyId,
    pub service_addr: Option<SocketAddr>,
    pub payout_script: Script,
    pub operator_payout_script: Script,
    pub collateral_height: Height,
}

impl Default for ProviderState {
    fn default() -> Self {
        Self {
            registered_height: -1,
            last_paid_height: 0,
            pose_penalty: 0,
            pose_revived_height: -1,
            pose_ban_height: -1,
            revocation_reason: RevocationReason::NotSpecified as u16,
            confirmed_hash: ZERO_HASH,
            confirmed_hash_with_pro_tx: ZERO_HASH,
            owner_key: KeyId::default(),
            operator_key: BlsPublicKey::default(),
            voting_key: KeyId::default(),
            service_addr: None,
            payout_script: Script::default(),
            operator_payout_script: Script::default(),
            collateral_height: -1,
        }
    }
}

impl ProviderState {
    /// Initial state described by a registration payload.
    pub fn from_registration(pro_tx: &ProRegTx) -> Self {
        Self {
            owner_key: pro_tx.owner_key,
            operator_key: pro_tx.operator_key,
            voting_key: pro_tx.voting_key,
            service_addr: pro_tx.service_addr,
            payout_script: pro_tx.payout_script.clone(),
            ..Self::default()
        }
    }

    pub fn is_banned(&self) -> bool {
        self.pose_ban_height != -1
    }

    /// Sets the ban height unless already banned.
    pub fn ban_if_not_banned(&mut self, height: Height) {
        if !self.is_banned() {
            self.pose_ban_height = height;
        }
    }

    /// Clears penalty and ban, recording the revival height.
    pub fn revive(&mut self, height: Height) {
        self.pose_penalty = 0;
        self.pose_ban_height = -1;
        self.pose_revived_height = height;
    }

    /// Drops everything the operator controls.
    pub fn reset_operator_fields(&mut self) {
        self.operator_key = BlsPublicKey::default();
        self.service_addr = None;
        self.operator_payout_script = Script::default();
        self.revocation_reason = RevocationReason::NotSpecified as u16;
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed_hash != ZERO_HASH
    }

    pub fn update_confirmed_hash(&mut self, pro_tx_hash: &Hash, confirmed_hash: Hash) {
        self.confirmed_hash = confirmed_hash;
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(pro_tx_hash);
        buf[32..].copy_from_slice(&confirmed_hash);
        self.confirmed_hash_with_pro_tx = sha256(&buf);
    }

    /// All operator, owner and voting keys are present.
    pub fn has_all_keys(&self) -> bool {
        self.operator_key.is_valid() && !self.voting_key.is_null() && !self.owner_key.is_null()
    }
}
