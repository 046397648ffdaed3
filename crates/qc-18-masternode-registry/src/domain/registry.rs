//! # Registry
//!
//! The provider set at one block. Three persistent maps are kept in step:
//!
//! - `records`: pro_tx_hash -> record
//! - `internal_ids`: internal id -> pro_tx_hash
//! - `unique`: property key -> (owner, refcount)
//!
//! `Registry::clone` is O(1). Published registries are only read; new
//! versions are produced by cloning and calling the mutating methods below,
//! each of which is atomic: on error the registry is left untouched.

use super::errors::{RegistryError, RegistryResult};
use super::record::ProviderRecord;
use super::state::ProviderState;
use super::state_delta::ProviderStateDelta;
use super::unique::{changed_properties, state_properties, UniqueProperty};
use crate::codec::{Decodable, DecodeError, Decoder, Encodable, Encoder};
use im::OrdMap;
use shared_types::{BlsPublicKey, Hash, Height, OutPoint, ZERO_HASH};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;

/// One claim in the uniqueness map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct UniqueClaim {
    owner: Hash,
    refs: u32,
}

type UniqueMap = OrdMap<Hash, UniqueClaim>;

#[derive(Clone, PartialEq, Eq)]
pub struct Registry {
    block_hash: Hash,
    height: Height,
    total_registered: u64,
    records: OrdMap<Hash, ProviderRecord>,
    internal_ids: OrdMap<u64, Hash>,
    unique: UniqueMap,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(ZERO_HASH, -1)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("block_hash", &hex::encode(self.block_hash))
            .field("height", &self.height)
            .field("total_registered", &self.total_registered)
            .field("records", &self.records.len())
            .finish()
    }
}

impl Registry {
    /// An empty registry at the given block.
    pub fn new(block_hash: Hash, height: Height) -> Self {
        Self {
            block_hash,
            height,
            total_registered: 0,
            records: OrdMap::new(),
            internal_ids: OrdMap::new(),
            unique: OrdMap::new(),
        }
    }

    pub fn block_hash(&self) -> &Hash {
        &self.block_hash
    }

    pub fn height(&self) -> Height {
        self.height
    }

    pub fn set_block(&mut self, block_hash: Hash, height: Height) {
        self.block_hash = block_hash;
        self.height = height;
    }

    pub fn total_registered(&self) -> u64 {
        self.total_registered
    }

    pub(crate) fn set_total_registered(&mut self, total: u64) {
        self.total_registered = total;
    }

    pub fn all_count(&self) -> usize {
        self.records.len()
    }

    pub fn valid_count(&self) -> usize {
        self.iter_valid().count()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in `pro_tx_hash` order.
    pub fn iter(&self) -> impl Iterator<Item = &ProviderRecord> + '_ {
        self.records.values()
    }

    /// Records that are not PoSe-banned.
    pub fn iter_valid(&self) -> impl Iterator<Item = &ProviderRecord> + '_ {
        self.records.values().filter(|r| Self::is_valid(r))
    }

    pub fn is_valid(record: &ProviderRecord) -> bool {
        !record.state.is_banned()
    }

    pub fn is_banned(record: &ProviderRecord) -> bool {
        record.state.is_banned()
    }

    pub fn contains(&self, pro_tx_hash: &Hash) -> bool {
        self.records.contains_key(pro_tx_hash)
    }

    pub fn get(&self, pro_tx_hash: &Hash) -> Option<&ProviderRecord> {
        self.records.get(pro_tx_hash)
    }

    pub fn get_valid(&self, pro_tx_hash: &Hash) -> Option<&ProviderRecord> {
        self.get(pro_tx_hash).filter(|r| Self::is_valid(r))
    }

    pub fn get_by_internal_id(&self, internal_id: u64) -> Option<&ProviderRecord> {
        self.internal_ids
            .get(&internal_id)
            .and_then(|hash| self.records.get(hash))
    }

    pub fn get_by_collateral(&self, collateral: &OutPoint) -> Option<&ProviderRecord> {
        self.unique_property_owner(&UniqueProperty::Collateral(*collateral))
            .filter(|r| r.collateral == *collateral)
    }

    pub fn get_valid_by_collateral(&self, collateral: &OutPoint) -> Option<&ProviderRecord> {
        self.get_by_collateral(collateral)
            .filter(|r| Self::is_valid(r))
    }

    pub fn get_by_service(&self, addr: &SocketAddr) -> Option<&ProviderRecord> {
        self.unique_property_owner(&UniqueProperty::Address(*addr))
    }

    pub fn get_by_operator_key(&self, key: &BlsPublicKey) -> Option<&ProviderRecord> {
        self.unique_property_owner(&UniqueProperty::OperatorKey(*key))
    }

    pub fn has_unique_property(&self, property: &UniqueProperty) -> bool {
        self.unique.contains_key(&property.key())
    }

    /// The record currently claiming `property`.
    pub fn unique_property_owner(&self, property: &UniqueProperty) -> Option<&ProviderRecord> {
        self.unique
            .get(&property.key())
            .and_then(|claim| self.records.get(&claim.owner))
    }

    /// Inserts a record and claims its unique properties.
    ///
    /// A record whose `pro_tx_hash` is already present is ignored. With
    /// `bump_counter`, the total-registered counter is raised past the
    /// record's internal id.
    pub fn add_record(&mut self, record: ProviderRecord, bump_counter: bool) -> RegistryResult<()> {
        let hash = record.pro_tx_hash;
        if self.records.contains_key(&hash) {
            debug!(
                "[qc-18] ignoring duplicate add of provider {}",
                hex::encode(hash)
            );
            return Ok(());
        }
        if self.internal_ids.contains_key(&record.internal_id) {
            return Err(RegistryError::DuplicateInternalId(record.internal_id));
        }

        let mut unique = self.unique.clone();
        add_unique(&mut unique, &hash, &UniqueProperty::Collateral(record.collateral))?;
        for property in state_properties(&record.state) {
            add_unique(&mut unique, &hash, &property)?;
        }

        self.unique = unique;
        self.internal_ids.insert(record.internal_id, hash);
        if bump_counter {
            self.total_registered = self.total_registered.max(record.internal_id + 1);
        }
        self.records.insert(hash, record);
        Ok(())
    }

    /// Replaces a record's state, moving unique claims for every changed
    /// field: the old value is released before the new one is claimed.
    pub fn update_record(&mut self, pro_tx_hash: &Hash, new_state: ProviderState) -> RegistryResult<()> {
        let old = self
            .records
            .get(pro_tx_hash)
            .cloned()
            .ok_or_else(|| RegistryError::unknown_provider(pro_tx_hash))?;

        let mut unique = self.unique.clone();
        for (release, claim) in changed_properties(&old.state, &new_state) {
            if let Some(property) = release {
                delete_unique(&mut unique, pro_tx_hash, &property)?;
            }
            if let Some(property) = claim {
                add_unique(&mut unique, pro_tx_hash, &property)?;
            }
        }

        self.unique = unique;
        self.records
            .insert(*pro_tx_hash, old.with_state(Arc::new(new_state)));
        Ok(())
    }

    pub fn update_record_with_delta(
        &mut self,
        pro_tx_hash: &Hash,
        delta: &ProviderStateDelta,
    ) -> RegistryResult<()> {
        let old = self
            .records
            .get(pro_tx_hash)
            .ok_or_else(|| RegistryError::unknown_provider(pro_tx_hash))?;
        let new_state = delta.applied(&old.state);
        self.update_record(pro_tx_hash, new_state)
    }

    /// Replaces several states at once. Every released claim is dropped
    /// before any new claim is taken, so providers may trade unique values
    /// within one batch.
    pub fn update_records(&mut self, updates: Vec<(Hash, ProviderState)>) -> RegistryResult<()> {
        let mut olds = Vec::with_capacity(updates.len());
        for (hash, _) in &updates {
            let old = self
                .records
                .get(hash)
                .cloned()
                .ok_or_else(|| RegistryError::unknown_provider(hash))?;
            olds.push(old);
        }

        let mut unique = self.unique.clone();
        let changes: Vec<_> = olds
            .iter()
            .zip(&updates)
            .map(|(old, (_, new))| changed_properties(&old.state, new))
            .collect();
        for ((hash, _), change) in updates.iter().zip(&changes) {
            for property in change.iter().filter_map(|(release, _)| release.as_ref()) {
                delete_unique(&mut unique, hash, property)?;
            }
        }
        for ((hash, _), change) in updates.iter().zip(&changes) {
            for property in change.iter().filter_map(|(_, claim)| claim.as_ref()) {
                add_unique(&mut unique, hash, property)?;
            }
        }

        self.unique = unique;
        for (old, (hash, new)) in olds.into_iter().zip(updates) {
            self.records.insert(hash, old.with_state(Arc::new(new)));
        }
        Ok(())
    }

    /// Deletes a record and releases its unique claims.
    pub fn remove_record(&mut self, pro_tx_hash: &Hash) -> RegistryResult<()> {
        let old = self
            .records
            .get(pro_tx_hash)
            .cloned()
            .ok_or_else(|| RegistryError::unknown_provider(pro_tx_hash))?;

        let mut unique = self.unique.clone();
        delete_unique(&mut unique, pro_tx_hash, &UniqueProperty::Collateral(old.collateral))?;
        for property in state_properties(&old.state) {
            delete_unique(&mut unique, pro_tx_hash, &property)?;
        }

        self.unique = unique;
        self.internal_ids.remove(&old.internal_id);
        self.records.remove(pro_tx_hash);
        Ok(())
    }

    /// Decodes a full snapshot, rebuilding the auxiliary maps.
    pub fn from_snapshot_bytes(bytes: &[u8]) -> RegistryResult<Self> {
        let mut dec = Decoder::new(bytes);
        let registry = Self::decode_snapshot(&mut dec)?;
        dec.finish()?;
        Ok(registry)
    }

    fn decode_snapshot(dec: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        let block_hash = Hash::decode(dec)?;
        let height = dec.read_i32()?;
        let total_registered = dec.read_u64()?;
        let count = dec.read_len(1)?;

        let mut registry = Registry::new(block_hash, height);
        registry.total_registered = total_registered;
        for _ in 0..count {
            let record = ProviderRecord::decode(dec)?;
            if record.internal_id >= total_registered {
                return Err(DecodeError::Inconsistent("internal id beyond total registered"));
            }
            if registry.contains(&record.pro_tx_hash) {
                return Err(DecodeError::Inconsistent("duplicate provider"));
            }
            registry
                .add_record(record, false)
                .map_err(|_| DecodeError::Inconsistent("conflicting unique property"))?;
        }
        Ok(registry)
    }
}

impl Encodable for Registry {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_bytes(&self.block_hash);
        enc.write_i32(self.height);
        enc.write_u64(self.total_registered);
        enc.write_compact_size(self.records.len() as u64);
        for record in self.records.values() {
            record.encode(enc);
        }
    }
}

fn add_unique(unique: &mut UniqueMap, owner: &Hash, property: &UniqueProperty) -> RegistryResult<()> {
    let key = property.key();
    match unique.get(&key).copied() {
        Some(claim) if claim.owner != *owner => Err(RegistryError::DuplicateUniqueProperty {
            property: property.name(),
            owner: hex::encode(claim.owner),
        }),
        Some(claim) => {
            unique.insert(
                key,
                UniqueClaim {
                    owner: *owner,
                    refs: claim.refs + 1,
                },
            );
            Ok(())
        }
        None => {
            unique.insert(key, UniqueClaim { owner: *owner, refs: 1 });
            Ok(())
        }
    }
}

fn delete_unique(unique: &mut UniqueMap, owner: &Hash, property: &UniqueProperty) -> RegistryResult<()> {
    let key = property.key();
    match unique.get(&key).copied() {
        Some(claim) if claim.owner == *owner => {
            if claim.refs <= 1 {
                unique.remove(&key);
            } else {
                unique.insert(
                    key,
                    UniqueClaim {
                        owner: *owner,
                        refs: claim.refs - 1,
                    },
                );
            }
            Ok(())
        }
        _ => Err(RegistryError::InconsistentUniqueIndex(format!(
            "{} of {} not claimed by it",
            property.name(),
            hex::encode(owner)
        ))),
    }
}
