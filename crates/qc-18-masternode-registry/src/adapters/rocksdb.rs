//! # RocksDB Registry Backend
//!
//! Durable `KeyValueStore` for snapshots and deltas. Everything lives in one
//! column family (`evo`) so the registry can share a database with other
//! node data without key collisions.
//!
//! Registry writes are one batch per block, so `sync_writes` trades a
//! little connect latency for crash safety of the delta log.

use crate::ports::storage::{BatchOperation, KVStoreError, KeyValueStore};
use parking_lot::RwLock;
use rocksdb::{
    BlockBasedOptions, Cache, ColumnFamilyDescriptor, DBCompressionType, Direction, IteratorMode,
    Options, WriteBatch, WriteOptions, DB,
};
use std::path::Path;
use std::sync::Arc;

/// Column family holding all registry keys.
pub const CF_EVO: &str = "evo";

#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    pub path: String,
    /// Block cache size in bytes.
    pub block_cache_size: usize,
    pub write_buffer_size: usize,
    /// fsync every batch.
    pub sync_writes: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "./data/evodb".to_string(),
            block_cache_size: 64 * 1024 * 1024,
            write_buffer_size: 16 * 1024 * 1024,
            sync_writes: true,
        }
    }
}

impl RocksDbConfig {
    /// Small buffers, no fsync.
    pub fn for_testing(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 4 * 1024 * 1024,
            write_buffer_size: 1024 * 1024,
            sync_writes: false,
        }
    }
}

fn io_error(op: &str, e: rocksdb::Error) -> KVStoreError {
    KVStoreError::IOError {
        message: format!("RocksDB {} failed: {}", op, e),
    }
}

pub struct RocksDbStore {
    db: Arc<RwLock<DB>>,
    config: RocksDbConfig,
}

impl RocksDbStore {
    pub fn open(config: RocksDbConfig) -> Result<Self, KVStoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_write_buffer_size(config.write_buffer_size);

        let mut block_opts = BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        block_opts.set_block_cache(&Cache::new_lru_cache(config.block_cache_size));

        let mut cf_opts = Options::default();
        cf_opts.set_compression_type(DBCompressionType::Snappy);
        cf_opts.set_block_based_table_factory(&block_opts);

        let db = DB::open_cf_descriptors(
            &opts,
            &config.path,
            vec![ColumnFamilyDescriptor::new(CF_EVO, cf_opts)],
        )
        .map_err(|e| io_error("open", e))?;

        Ok(Self {
            db: Arc::new(RwLock::new(db)),
            config,
        })
    }

    pub fn open_default(path: impl AsRef<Path>) -> Result<Self, KVStoreError> {
        Self::open(RocksDbConfig {
            path: path.as_ref().to_string_lossy().to_string(),
            ..Default::default()
        })
    }

    fn write_options(&self) -> WriteOptions {
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);
        write_opts
    }
}

macro_rules! with_cf {
    ($db:expr, $cf:ident => $body:expr) => {{
        let $cf = $db.cf_handle(CF_EVO).ok_or_else(|| KVStoreError::IOError {
            message: format!("missing column family {}", CF_EVO),
        })?;
        $body
    }};
}

impl KeyValueStore for RocksDbStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        let db = self.db.read();
        with_cf!(db, cf => db.get_cf(cf, key).map_err(|e| io_error("get", e)))
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        let opts = self.write_options();
        let db = self.db.write();
        with_cf!(db, cf => db.put_cf_opt(cf, key, value, &opts).map_err(|e| io_error("put", e)))
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), KVStoreError> {
        let opts = self.write_options();
        let db = self.db.write();
        with_cf!(db, cf => db.delete_cf_opt(cf, key, &opts).map_err(|e| io_error("delete", e)))
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        let opts = self.write_options();
        let db = self.db.write();
        with_cf!(db, cf => {
            let mut batch = WriteBatch::default();
            for op in operations {
                match op {
                    BatchOperation::Put { key, value } => batch.put_cf(cf, key, value),
                    BatchOperation::Delete { key } => batch.delete_cf(cf, key),
                }
            }
            db.write_opt(batch, &opts).map_err(|e| io_error("batch write", e))
        })
    }

    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        let db = self.db.read();
        with_cf!(db, cf => db
            .get_pinned_cf(cf, key)
            .map(|v| v.is_some())
            .map_err(|e| io_error("exists", e)))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KVStoreError> {
        let db = self.db.read();
        with_cf!(db, cf => {
            let mut results = Vec::new();
            for item in db.iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward)) {
                let (key, value) = item.map_err(|e| io_error("iterate", e))?;
                if !key.starts_with(prefix) {
                    break;
                }
                results.push((key.to_vec(), value.to_vec()));
            }
            Ok(results)
        })
    }
}
