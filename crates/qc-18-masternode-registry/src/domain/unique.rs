//! Unique provider properties.
//!
//! Collateral, service address, owner/voting key ids and the operator key
//! must each be claimed by at most one provider. Claims are stored in the
//! registry under a content hash of the tagged value, with a reference count
//! because one provider may claim the same value twice (owner key used as
//! voting key).

use super::state::ProviderState;
use crate::codec::{Encodable, Encoder};
use shared_types::{sha256d, BlsPublicKey, Hash, KeyId, OutPoint};
use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueProperty {
    Collateral(OutPoint),
    Address(SocketAddr),
    /// Owner and voting key ids share one namespace.
    KeyId(KeyId),
    /// Only the key bytes count; the scheme tag does not.
    OperatorKey(BlsPublicKey),
}

impl UniqueProperty {
    /// Index key of this value in the uniqueness map.
    pub fn key(&self) -> Hash {
        let mut enc = Encoder::with_capacity(64);
        match self {
            UniqueProperty::Collateral(outpoint) => {
                enc.write_u8(0);
                outpoint.encode(&mut enc);
            }
            UniqueProperty::Address(addr) => {
                enc.write_u8(1);
                Some(*addr).encode(&mut enc);
            }
            UniqueProperty::KeyId(key) => {
                enc.write_u8(2);
                key.encode(&mut enc);
            }
            UniqueProperty::OperatorKey(key) => {
                enc.write_u8(3);
                enc.write_bytes(&key.bytes);
            }
        }
        sha256d(&enc.into_bytes())
    }

    pub fn name(&self) -> &'static str {
        match self {
            UniqueProperty::Collateral(_) => "collateral",
            UniqueProperty::Address(_) => "service address",
            UniqueProperty::KeyId(_) => "key id",
            UniqueProperty::OperatorKey(_) => "operator key",
        }
    }
}

/// Non-null unique values held in a state, in a fixed order.
///
/// Null values are never claimed, a null owner key included.
pub(crate) fn state_properties(state: &ProviderState) -> Vec<UniqueProperty> {
    let mut props = Vec::with_capacity(4);
    if let Some(addr) = state.service_addr {
        props.push(UniqueProperty::Address(addr));
    }
    if !state.owner_key.is_null() {
        props.push(UniqueProperty::KeyId(state.owner_key));
    }
    if !state.voting_key.is_null() {
        props.push(UniqueProperty::KeyId(state.voting_key));
    }
    if state.operator_key.is_valid() {
        props.push(UniqueProperty::OperatorKey(state.operator_key));
    }
    props
}

/// Claims to release and to take when a state changes, field by field.
/// Unchanged fields contribute nothing.
pub(crate) fn changed_properties(
    old: &ProviderState,
    new: &ProviderState,
) -> Vec<(Option<UniqueProperty>, Option<UniqueProperty>)> {
    let mut changes = Vec::new();
    if old.service_addr != new.service_addr {
        changes.push((
            old.service_addr.map(UniqueProperty::Address),
            new.service_addr.map(UniqueProperty::Address),
        ));
    }
    let key_id = |k: KeyId| (!k.is_null()).then_some(UniqueProperty::KeyId(k));
    if old.owner_key != new.owner_key {
        changes.push((key_id(old.owner_key), key_id(new.owner_key)));
    }
    if old.voting_key != new.voting_key {
        changes.push((key_id(old.voting_key), key_id(new.voting_key)));
    }
    if old.operator_key.bytes != new.operator_key.bytes {
        let op = |k: BlsPublicKey| k.is_valid().then_some(UniqueProperty::OperatorKey(k));
        changes.push((op(old.operator_key), op(new.operator_key)));
    }
    changes
}
