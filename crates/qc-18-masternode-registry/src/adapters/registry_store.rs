//! # Registry Store
//!
//! Persists registry snapshots and per-block deltas on top of any
//! [`KeyValueStore`].
//!
//! ## Layout
//!
//! | Key | Value |
//! |-----|-------|
//! | `dmn_S1` + block hash | snapshot bytes, crc32 |
//! | `dmn_D1` + block hash | height (i32), total registered (u64), delta bytes, crc32 |
//! | `dmn_SI` + height + block hash | empty (snapshot height index) |
//! | `dmn_DI` + height + block hash | empty (delta height index) |
//! | `dmn_B` | best block hash, height |
//!
//! Heights in index keys are big-endian with the sign bit flipped so that
//! byte order matches numeric order. Every block's data goes out in one
//! atomic batch; a checksum mismatch on read is reported as corruption.

use crate::codec::{Decoder, Encodable, Encoder};
use crate::domain::{Registry, RegistryDelta, RegistryError, RegistryResult};
use crate::ports::storage::{BatchOperation, KVStoreError, KeyValueStore};
use parking_lot::Mutex;
use shared_types::{Hash, Height};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyPrefix {
    Snapshot,
    Delta,
    SnapshotIndex,
    DeltaIndex,
    BestBlock,
}

impl KeyPrefix {
    fn as_bytes(self) -> &'static [u8] {
        match self {
            KeyPrefix::Snapshot => b"dmn_S1",
            KeyPrefix::Delta => b"dmn_D1",
            KeyPrefix::SnapshotIndex => b"dmn_SI",
            KeyPrefix::DeltaIndex => b"dmn_DI",
            KeyPrefix::BestBlock => b"dmn_B",
        }
    }

    fn key(self, block_hash: &Hash) -> Vec<u8> {
        let mut key = self.as_bytes().to_vec();
        key.extend_from_slice(block_hash);
        key
    }

    fn index_key(self, height: Height, block_hash: &Hash) -> Vec<u8> {
        let mut key = self.as_bytes().to_vec();
        key.extend_from_slice(&sortable_height(height));
        key.extend_from_slice(block_hash);
        key
    }
}

fn sortable_height(height: Height) -> [u8; 4] {
    ((height as u32) ^ 0x8000_0000).to_be_bytes()
}

fn height_from_sortable(bytes: [u8; 4]) -> Height {
    (u32::from_be_bytes(bytes) ^ 0x8000_0000) as Height
}

fn storage_error(e: KVStoreError) -> RegistryError {
    RegistryError::Storage(e.to_string())
}

fn seal(mut payload: Vec<u8>) -> Vec<u8> {
    let checksum = crc32fast::hash(&payload);
    payload.extend_from_slice(&checksum.to_le_bytes());
    payload
}

/// Strips and verifies the trailing checksum.
fn unseal<'a>(key: &[u8], value: &'a [u8]) -> RegistryResult<&'a [u8]> {
    let corrupt = || RegistryError::ChecksumMismatch {
        key: hex::encode(key),
    };
    if value.len() < 4 {
        return Err(corrupt());
    }
    let (payload, tail) = value.split_at(value.len() - 4);
    let mut stored = [0u8; 4];
    stored.copy_from_slice(tail);
    if crc32fast::hash(payload) != u32::from_le_bytes(stored) {
        return Err(corrupt());
    }
    Ok(payload)
}

/// Index entry parsed back out of a height index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct IndexEntry {
    height: Height,
    block_hash: Hash,
}

/// Snapshot and delta persistence for the registry manager.
pub struct RegistryStore<KV: KeyValueStore> {
    kv: Mutex<KV>,
}

impl<KV: KeyValueStore> RegistryStore<KV> {
    pub fn new(kv: KV) -> Self {
        Self { kv: Mutex::new(kv) }
    }

    /// Writes the delta that produced `list` and, when asked, the full
    /// snapshot of `list`. Also moves the best-block marker to `list`.
    pub fn put_block_data(
        &self,
        list: &Registry,
        delta: &RegistryDelta,
        with_snapshot: bool,
    ) -> RegistryResult<()> {
        let block_hash = *list.block_hash();
        let height = list.height();

        let mut payload = Encoder::new();
        payload.write_i32(height);
        payload.write_u64(delta.total_registered);
        delta.encode(&mut payload);

        let mut ops = vec![
            BatchOperation::put(KeyPrefix::Delta.key(&block_hash), seal(payload.into_bytes())),
            BatchOperation::put(KeyPrefix::DeltaIndex.index_key(height, &block_hash), Vec::new()),
            BatchOperation::put(KeyPrefix::BestBlock.as_bytes(), best_block_value(&block_hash, height)),
        ];
        if with_snapshot {
            ops.push(BatchOperation::put(
                KeyPrefix::Snapshot.key(&block_hash),
                seal(list.to_bytes()),
            ));
            ops.push(BatchOperation::put(
                KeyPrefix::SnapshotIndex.index_key(height, &block_hash),
                Vec::new(),
            ));
        }

        self.kv.lock().atomic_batch_write(ops).map_err(storage_error)?;
        tracing::trace!(
            "[qc-18] stored block data at height {} (snapshot: {})",
            height,
            with_snapshot
        );
        Ok(())
    }

    /// Writes a standalone snapshot without touching the best-block marker.
    pub fn put_snapshot(&self, list: &Registry) -> RegistryResult<()> {
        let block_hash = *list.block_hash();
        self.kv
            .lock()
            .atomic_batch_write(vec![
                BatchOperation::put(KeyPrefix::Snapshot.key(&block_hash), seal(list.to_bytes())),
                BatchOperation::put(
                    KeyPrefix::SnapshotIndex.index_key(list.height(), &block_hash),
                    Vec::new(),
                ),
            ])
            .map_err(storage_error)
    }

    pub fn get_snapshot(&self, block_hash: &Hash) -> RegistryResult<Option<Registry>> {
        let key = KeyPrefix::Snapshot.key(block_hash);
        let Some(value) = self.kv.lock().get(&key).map_err(storage_error)? else {
            return Ok(None);
        };
        let payload = unseal(&key, &value)?;
        Registry::from_snapshot_bytes(payload).map(Some)
    }

    pub fn has_snapshot(&self, block_hash: &Hash) -> RegistryResult<bool> {
        self.kv
            .lock()
            .exists(&KeyPrefix::Snapshot.key(block_hash))
            .map_err(storage_error)
    }

    /// The forward delta that produced the list at `block_hash`.
    pub fn get_delta(&self, block_hash: &Hash) -> RegistryResult<Option<RegistryDelta>> {
        let key = KeyPrefix::Delta.key(block_hash);
        let Some(value) = self.kv.lock().get(&key).map_err(storage_error)? else {
            return Ok(None);
        };
        let payload = unseal(&key, &value)?;
        let mut dec = Decoder::new(payload);
        let height = dec.read_i32()?;
        let total_registered = dec.read_u64()?;
        let body = dec.read_bytes(dec.remaining())?;
        let delta = RegistryDelta::decode_for_block(body, *block_hash, height, total_registered)?;
        Ok(Some(delta))
    }

    pub fn best_block(&self) -> RegistryResult<Option<(Hash, Height)>> {
        let key = KeyPrefix::BestBlock.as_bytes();
        let Some(value) = self.kv.lock().get(key).map_err(storage_error)? else {
            return Ok(None);
        };
        let payload = unseal(key, &value)?;
        let mut dec = Decoder::new(payload);
        let hash: Hash = dec.read_array()?;
        let height = dec.read_i32()?;
        dec.finish()?;
        Ok(Some((hash, height)))
    }

    pub fn set_best_block(&self, block_hash: &Hash, height: Height) -> RegistryResult<()> {
        self.kv
            .lock()
            .put(KeyPrefix::BestBlock.as_bytes(), &best_block_value(block_hash, height))
            .map_err(storage_error)
    }

    /// Keeps the `keep` newest snapshots and every delta at or above the
    /// oldest kept snapshot. Returns the number of entries removed.
    pub fn prune(&self, keep: usize) -> RegistryResult<usize> {
        let mut kv = self.kv.lock();
        let snapshots = scan_index(&*kv, KeyPrefix::SnapshotIndex)?;
        if snapshots.len() <= keep {
            return Ok(0);
        }

        let split = snapshots.len() - keep;
        let Some(oldest_kept) = snapshots.get(split).map(|e| e.height) else {
            return Ok(0);
        };

        let mut ops = Vec::new();
        for entry in &snapshots[..split] {
            ops.push(BatchOperation::delete(KeyPrefix::Snapshot.key(&entry.block_hash)));
            ops.push(BatchOperation::delete(
                KeyPrefix::SnapshotIndex.index_key(entry.height, &entry.block_hash),
            ));
        }
        for entry in scan_index(&*kv, KeyPrefix::DeltaIndex)?
            .into_iter()
            .take_while(|e| e.height < oldest_kept)
        {
            ops.push(BatchOperation::delete(KeyPrefix::Delta.key(&entry.block_hash)));
            ops.push(BatchOperation::delete(
                KeyPrefix::DeltaIndex.index_key(entry.height, &entry.block_hash),
            ));
        }

        let removed = ops.len() / 2;
        kv.atomic_batch_write(ops).map_err(storage_error)?;
        tracing::debug!(
            "[qc-18] pruned {} registry entries below height {}",
            removed,
            oldest_kept
        );
        Ok(removed)
    }

    /// Heights of the stored snapshots, oldest first.
    pub fn snapshot_heights(&self) -> RegistryResult<Vec<Height>> {
        let kv = self.kv.lock();
        Ok(scan_index(&*kv, KeyPrefix::SnapshotIndex)?
            .into_iter()
            .map(|e| e.height)
            .collect())
    }

    /// Runs `f` against the underlying store.
    pub fn with_kv<R>(&self, f: impl FnOnce(&mut KV) -> R) -> R {
        f(&mut self.kv.lock())
    }
}

fn best_block_value(block_hash: &Hash, height: Height) -> Vec<u8> {
    let mut enc = Encoder::with_capacity(40);
    enc.write_bytes(block_hash);
    enc.write_i32(height);
    seal(enc.into_bytes())
}

/// Sorted entries of a height index.
fn scan_index<KV: KeyValueStore>(kv: &KV, prefix: KeyPrefix) -> RegistryResult<Vec<IndexEntry>> {
    let prefix_len = prefix.as_bytes().len();
    let mut entries = Vec::new();
    for (key, _) in kv.prefix_scan(prefix.as_bytes()).map_err(storage_error)? {
        let rest = &key[prefix_len..];
        if rest.len() != 4 + 32 {
            return Err(RegistryError::ChecksumMismatch {
                key: hex::encode(&key),
            });
        }
        let mut height = [0u8; 4];
        height.copy_from_slice(&rest[..4]);
        let mut block_hash = [0u8; 32];
        block_hash.copy_from_slice(&rest[4..]);
        entries.push(IndexEntry {
            height: height_from_sortable(height),
            block_hash,
        });
    }
    entries.sort();
    Ok(entries)
}
