//! SHA-256 helpers.

use crate::entities::Hash;
use sha2::{Digest, Sha256};

/// Single SHA-256.
pub fn sha256(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}

/// Double SHA-256, the chain's standard object hash.
pub fn sha256d(data: &[u8]) -> Hash {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

/// Incremental hasher over several byte slices.
#[derive(Default, Clone)]
pub struct HashWriter {
    inner: Sha256,
}

impl HashWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(mut self, data: &[u8]) -> Self {
        self.inner.update(data);
        self
    }

    /// Finish with a single SHA-256.
    pub fn finish(self) -> Hash {
        self.inner.finalize().into()
    }

    /// Finish with a double SHA-256.
    pub fn finish_double(self) -> Hash {
        Sha256::digest(self.inner.finalize()).into()
    }
}
