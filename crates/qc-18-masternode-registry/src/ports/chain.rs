//! # Chain Ports (Driven)
//!
//! Read-only views of the chain supplied by the validation layer.

use shared_types::{BlockRef, Coin, Hash, Height, OutPoint};

/// Block index navigation.
pub trait ChainView: Send + Sync {
    /// Index entry of a known block.
    fn block(&self, hash: &Hash) -> Option<BlockRef>;

    /// Ancestor of `block` at `height` (the block itself at its own height).
    fn ancestor(&self, block: &BlockRef, height: Height) -> Option<BlockRef> {
        if height > block.height || height < 0 {
            return None;
        }
        let mut current = *block;
        while current.height > height {
            current = self.block(&current.prev_hash)?;
        }
        Some(current)
    }
}

/// UTXO view at the parent of the block being connected.
pub trait CoinView {
    /// The unspent coin at `outpoint`, if any.
    fn coin(&self, outpoint: &OutPoint) -> Option<Coin>;
}
