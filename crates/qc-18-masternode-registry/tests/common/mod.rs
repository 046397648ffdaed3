//! Shared fixtures for the registry integration tests.

#![allow(dead_code)]

use qc_18_masternode_registry::{
    InMemoryChainIndex, InMemoryCoinView, InMemoryKVStore, NoopListener, ProviderRecord,
    ProviderState, Registry, RegistryConfig, RegistryDependencies, RegistryManager,
    RegistryResult,
};
use shared_types::{
    sha256, Block, BlockRef, BlsPublicKey, BlsScheme, Hash, Height, KeyId, OutPoint, ProRegTx,
    ProUpServTx, Script, SpecialPayload, Transaction, TxIn, TxOut, ZERO_HASH,
};
use std::net::SocketAddr;
use std::sync::Arc;

pub const COLLATERAL: i64 = 1000;

pub type TestManager = RegistryManager<InMemoryKVStore, InMemoryChainIndex>;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("qc_18_masternode_registry=debug")
        .with_test_writer()
        .try_init();
}

pub fn config() -> RegistryConfig {
    RegistryConfig::regtest().with_collateral_amount(COLLATERAL)
}

pub fn block_hash(prev: &Hash, height: Height, fork: u8) -> Hash {
    let mut buf = prev.to_vec();
    buf.extend_from_slice(&height.to_le_bytes());
    buf.push(fork);
    sha256(&buf)
}

pub fn addr(n: u8) -> SocketAddr {
    SocketAddr::from(([10, 2, 0, n], 19999))
}

pub fn operator(n: u8) -> BlsPublicKey {
    BlsPublicKey::new([n; 48], BlsScheme::Basic)
}

pub fn coinbase(height: Height, fork: u8) -> Transaction {
    let mut seed = height.to_le_bytes().to_vec();
    seed.push(fork);
    Transaction {
        txid: sha256(&seed),
        inputs: vec![],
        outputs: vec![],
        payload: None,
    }
}

/// Registration of provider `n` with the collateral in output 0.
pub fn register(n: u8) -> Transaction {
    Transaction {
        txid: [n; 32],
        inputs: vec![],
        outputs: vec![TxOut {
            value: COLLATERAL,
            script_pubkey: Script::default(),
        }],
        payload: Some(SpecialPayload::ProviderRegister(ProRegTx {
            collateral: OutPoint::new(ZERO_HASH, 0),
            service_addr: Some(addr(n)),
            owner_key: KeyId([n; 20]),
            operator_key: operator(n),
            voting_key: KeyId([n; 20]),
            operator_reward: 0,
            payout_script: Script::new(vec![0x76, n]),
        })),
    }
}

pub fn update_service(n: u8, slot: u8) -> Transaction {
    Transaction {
        txid: [0x80 | slot; 32],
        inputs: vec![],
        outputs: vec![],
        payload: Some(SpecialPayload::ProviderUpdateService(ProUpServTx {
            pro_tx_hash: [n; 32],
            service_addr: Some(addr(slot)),
            operator_payout_script: Script::default(),
        })),
    }
}

pub fn spend_collateral(n: u8) -> Transaction {
    Transaction {
        txid: [0xF0 ^ n; 32],
        inputs: vec![TxIn {
            prevout: OutPoint::new([n; 32], 0),
        }],
        outputs: vec![],
        payload: None,
    }
}

/// A chain driven block by block through a registry manager.
pub struct TestChain {
    pub manager: TestManager,
    pub chain: Arc<InMemoryChainIndex>,
    pub coins: InMemoryCoinView,
    /// Active chain, genesis first.
    pub blocks: Vec<Block>,
}

impl TestChain {
    pub fn new(config: RegistryConfig) -> Self {
        let chain = Arc::new(InMemoryChainIndex::new());
        let genesis = Block {
            hash: block_hash(&ZERO_HASH, 0, 0),
            prev_hash: ZERO_HASH,
            height: 0,
            transactions: vec![coinbase(0, 0)],
        };
        chain.insert(genesis.block_ref());
        let manager = RegistryManager::new(RegistryDependencies {
            kv_store: InMemoryKVStore::new(),
            chain: Arc::clone(&chain),
            listener: Arc::new(NoopListener),
            config,
        })
        .unwrap();
        Self {
            manager,
            chain,
            coins: InMemoryCoinView::new(),
            blocks: vec![genesis],
        }
    }

    pub fn tip(&self) -> &Block {
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn tip_ref(&self) -> BlockRef {
        self.tip().block_ref()
    }

    pub fn build(&self, txs: Vec<Transaction>, fork: u8) -> Block {
        let prev = self.tip();
        let height = prev.height + 1;
        let mut transactions = vec![coinbase(height, fork)];
        transactions.extend(txs);
        Block {
            hash: block_hash(&prev.hash, height, fork),
            prev_hash: prev.hash,
            height,
            transactions,
        }
    }

    pub fn connect(&mut self, block: Block) -> RegistryResult<()> {
        self.chain.insert(block.block_ref());
        self.manager.process_block(&block, &self.coins, false)?;
        self.blocks.push(block);
        Ok(())
    }

    pub fn mine(&mut self, txs: Vec<Transaction>, fork: u8) -> RegistryResult<Block> {
        let block = self.build(txs, fork);
        self.connect(block.clone())?;
        Ok(block)
    }

    pub fn mine_empty(&mut self, count: usize, fork: u8) {
        for _ in 0..count {
            self.mine(vec![], fork).unwrap();
        }
    }

    /// Disconnects the top `count` blocks, returning them oldest first.
    pub fn rewind(&mut self, count: usize) -> Vec<Block> {
        let mut undone = Vec::with_capacity(count);
        for _ in 0..count {
            let block = self.blocks.pop().unwrap();
            self.manager.undo_block(&block).unwrap();
            undone.push(block);
        }
        undone.reverse();
        undone
    }

    pub fn list(&self) -> Registry {
        self.manager.list_at_chain_tip().unwrap()
    }

    /// A second manager reading a copy of this chain's store, with cold caches.
    pub fn reopen(&self) -> TestManager {
        let kv = self.manager.store().with_kv(|kv| kv.clone());
        RegistryManager::new(RegistryDependencies {
            kv_store: kv,
            chain: Arc::clone(&self.chain),
            listener: Arc::new(NoopListener),
            config: self.manager.config().clone(),
        })
        .unwrap()
    }
}

/// Provider record for registry-level tests. `tag` seeds the identity,
/// `slot` the address and keys, so equal slots collide.
pub fn record(tag: u8, slot: u8, internal_id: u64) -> ProviderRecord {
    let state = ProviderState {
        registered_height: 1,
        owner_key: KeyId([slot; 20]),
        operator_key: operator(slot.wrapping_add(1)),
        voting_key: KeyId([slot; 20]),
        service_addr: Some(addr(slot)),
        payout_script: Script::new(vec![0x76, tag]),
        ..ProviderState::default()
    };
    ProviderRecord::new(
        sha256(&[tag]),
        internal_id,
        OutPoint::new(sha256(&[tag, 0xCC]), 0),
        0,
        state,
    )
}
