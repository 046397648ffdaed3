//! In-memory chain index and UTXO view.

use crate::ports::chain::{ChainView, CoinView};
use parking_lot::RwLock;
use shared_types::{BlockRef, Coin, Hash, OutPoint};
use std::collections::HashMap;

/// Block index holding every block it was told about, forks included.
#[derive(Debug, Default)]
pub struct InMemoryChainIndex {
    blocks: RwLock<HashMap<Hash, BlockRef>>,
}

impl InMemoryChainIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, block: BlockRef) {
        self.blocks.write().insert(block.hash, block);
    }
}

impl ChainView for InMemoryChainIndex {
    fn block(&self, hash: &Hash) -> Option<BlockRef> {
        self.blocks.read().get(hash).copied()
    }
}

/// Fixed set of unspent coins.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCoinView {
    coins: HashMap<OutPoint, Coin>,
}

impl InMemoryCoinView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_coin(&mut self, outpoint: OutPoint, coin: Coin) {
        self.coins.insert(outpoint, coin);
    }

    pub fn spend(&mut self, outpoint: &OutPoint) {
        self.coins.remove(outpoint);
    }
}

impl CoinView for InMemoryCoinView {
    fn coin(&self, outpoint: &OutPoint) -> Option<Coin> {
        self.coins.get(outpoint).cloned()
    }
}
