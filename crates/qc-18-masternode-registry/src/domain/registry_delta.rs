//! # Registry Delta
//!
//! Difference between two registry versions: records added, per-record state
//! deltas keyed by internal id, and internal ids removed.
//!
//! `from.apply_diff(&from.build_diff(&to))` is value-equal to `to`, and
//! `delta.invert(&from)` undoes `delta`.

use super::errors::{RegistryError, RegistryResult};
use super::record::ProviderRecord;
use super::registry::Registry;
use super::state_delta::ProviderStateDelta;
use crate::codec::{Decodable, DecodeError, Decoder, Encodable, Encoder};
use shared_types::{Hash, Height};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryDelta {
    /// Block the target registry belongs to. Not part of the encoding.
    pub block_hash: Hash,
    /// Height of the target registry. Not part of the encoding.
    pub height: Height,
    /// Total-registered counter of the target. Not part of the encoding.
    pub total_registered: u64,
    /// Sorted by internal id.
    pub added: Vec<ProviderRecord>,
    pub updated: BTreeMap<u64, ProviderStateDelta>,
    pub removed: BTreeSet<u64>,
}

impl RegistryDelta {
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.updated.is_empty() || !self.removed.is_empty()
    }

    /// Delta that turns `base.apply_diff(self)` back into `base`.
    pub fn invert(&self, base: &Registry) -> RegistryResult<RegistryDelta> {
        let target = base.apply_diff(self)?;
        Ok(target.build_diff(base))
    }

    /// Decodes the body and attaches the target's metadata.
    pub fn decode_for_block(
        bytes: &[u8],
        block_hash: Hash,
        height: Height,
        total_registered: u64,
    ) -> Result<Self, DecodeError> {
        let mut delta = Self::from_bytes(bytes)?;
        delta.block_hash = block_hash;
        delta.height = height;
        delta.total_registered = total_registered;
        Ok(delta)
    }
}

impl Registry {
    /// Structural difference from `self` to `to`.
    pub fn build_diff(&self, to: &Registry) -> RegistryDelta {
        let mut delta = RegistryDelta {
            block_hash: *to.block_hash(),
            height: to.height(),
            total_registered: to.total_registered(),
            ..RegistryDelta::default()
        };

        for to_record in to.iter() {
            match self.get(&to_record.pro_tx_hash) {
                None => delta.added.push(to_record.clone()),
                Some(from_record) if from_record.state != to_record.state => {
                    let state_delta = ProviderStateDelta::compute(&from_record.state, &to_record.state);
                    if !state_delta.is_empty() {
                        delta.updated.insert(to_record.internal_id, state_delta);
                    }
                }
                Some(_) => {}
            }
        }
        for from_record in self.iter() {
            if !to.contains(&from_record.pro_tx_hash) {
                delta.removed.insert(from_record.internal_id);
            }
        }
        delta.added.sort_by_key(|r| r.internal_id);
        delta
    }

    /// New registry with `delta` applied: removals, then all updates as one
    /// batch, then additions in internal-id order. The counter is taken from the delta,
    /// which lets an inverse delta rewind it.
    pub fn apply_diff(&self, delta: &RegistryDelta) -> RegistryResult<Registry> {
        let mut result = self.clone();
        result.set_block(delta.block_hash, delta.height);

        for id in &delta.removed {
            let hash = self.internal_hash(*id)?;
            result.remove_record(&hash)?;
        }
        let mut updates = Vec::with_capacity(delta.updated.len());
        for (id, state_delta) in &delta.updated {
            let hash = self.internal_hash(*id)?;
            let current = result.get(&hash).ok_or_else(|| {
                RegistryError::MalformedDelta(format!("update of removed internal id {id}"))
            })?;
            updates.push((hash, state_delta.applied(&current.state)));
        }
        result.update_records(updates)?;

        let mut added: Vec<&ProviderRecord> = delta.added.iter().collect();
        added.sort_by_key(|r| r.internal_id);
        for record in added {
            if result.contains(&record.pro_tx_hash) {
                return Err(RegistryError::MalformedDelta(format!(
                    "provider {} added twice",
                    hex::encode(record.pro_tx_hash)
                )));
            }
            if record.internal_id >= delta.total_registered {
                return Err(RegistryError::MalformedDelta(format!(
                    "internal id {} beyond total registered {}",
                    record.internal_id, delta.total_registered
                )));
            }
            result.add_record(record.clone(), false)?;
        }
        result.set_total_registered(delta.total_registered);
        Ok(result)
    }

    fn internal_hash(&self, internal_id: u64) -> RegistryResult<Hash> {
        self.get_by_internal_id(internal_id)
            .map(|r| r.pro_tx_hash)
            .ok_or_else(|| RegistryError::MalformedDelta(format!("unknown internal id {internal_id}")))
    }
}

impl Encodable for RegistryDelta {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_compact_size(self.added.len() as u64);
        for record in &self.added {
            record.encode(enc);
        }
        enc.write_compact_size(self.updated.len() as u64);
        for (id, state_delta) in &self.updated {
            enc.write_varint(*id);
            state_delta.encode(enc);
        }
        enc.write_compact_size(self.removed.len() as u64);
        for id in &self.removed {
            enc.write_varint(*id);
        }
    }
}

impl Decodable for RegistryDelta {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        let mut delta = RegistryDelta {
            height: -1,
            ..RegistryDelta::default()
        };

        let added = dec.read_len(1)?;
        for _ in 0..added {
            delta.added.push(ProviderRecord::decode(dec)?);
        }
        let updated = dec.read_len(2)?;
        for _ in 0..updated {
            let id = dec.read_varint()?;
            let state_delta = ProviderStateDelta::decode(dec)?;
            if delta.updated.insert(id, state_delta).is_some() {
                return Err(DecodeError::Inconsistent("duplicate updated id"));
            }
        }
        let removed = dec.read_len(1)?;
        for _ in 0..removed {
            if !delta.removed.insert(dec.read_varint()?) {
                return Err(DecodeError::Inconsistent("duplicate removed id"));
            }
        }
        Ok(delta)
    }
}
