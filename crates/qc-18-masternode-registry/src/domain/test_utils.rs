//! Builders shared by the domain unit tests.

use super::record::ProviderRecord;
use super::registry::Registry;
use super::state::ProviderState;
use shared_types::{BlsPublicKey, BlsScheme, Hash, KeyId, OutPoint, Script};
use std::net::SocketAddr;

pub(crate) fn hash(n: u8) -> Hash {
    [n; 32]
}

pub(crate) fn key_id(n: u8) -> KeyId {
    KeyId([n; 20])
}

pub(crate) fn operator(n: u8) -> BlsPublicKey {
    BlsPublicKey::new([n; 48], BlsScheme::Basic)
}

pub(crate) fn addr(n: u8) -> SocketAddr {
    SocketAddr::from(([10, 0, 0, n], 9999))
}

/// Registered at height 1, owner key doubling as voting key.
pub(crate) fn state(n: u8) -> ProviderState {
    ProviderState {
        registered_height: 1,
        collateral_height: 1,
        owner_key: key_id(n),
        voting_key: key_id(n),
        operator_key: operator(n),
        service_addr: Some(addr(n)),
        payout_script: Script::new(vec![0x51, n]),
        ..ProviderState::default()
    }
}

pub(crate) fn record(n: u8, internal_id: u64) -> ProviderRecord {
    ProviderRecord::new(hash(n), internal_id, OutPoint::new(hash(n), 1), 0, state(n))
}

/// Providers `1..=count` with internal ids `0..count` at height 100.
pub(crate) fn registry_with(count: u8) -> Registry {
    let mut registry = Registry::new([0xEE; 32], 100);
    for n in 1..=count {
        registry
            .add_record(record(n, u64::from(n) - 1), true)
            .expect("test records are unique");
    }
    registry
}
