//! # Core Chain Entities
//!
//! ## Clusters
//!
//! - **Identity**: `Hash`, `OutPoint`, `KeyId`, `BlsPublicKey`
//! - **Value**: `Amount`, `Script`, `TxOut`, `Coin`
//! - **Chain**: `BlockRef` (block index entry)

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use std::fmt;

// Re-export U256 from primitive-types for use across all subsystems
pub use primitive_types::U256;

/// A 32-byte hash (SHA-256 based).
pub type Hash = [u8; 32];

/// The all-zero hash, used as the "null" value.
pub const ZERO_HASH: Hash = [0u8; 32];

/// Monetary amount in base units.
pub type Amount = i64;

/// Block height. `-1` is used as the "unset" sentinel throughout.
pub type Height = i32;

/// Returns true if the hash is all zeroes.
pub fn is_null_hash(hash: &Hash) -> bool {
    hash.iter().all(|b| *b == 0)
}

/// Reference to a transaction output.
///
/// Ordering compares `txid` bytewise, then `vout`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: Hash,
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: Hash, vout: u32) -> Self {
        Self { txid, vout }
    }

    /// The null outpoint (zero txid, `vout == u32::MAX`).
    pub fn null() -> Self {
        Self {
            txid: ZERO_HASH,
            vout: u32::MAX,
        }
    }

    pub fn is_null(&self) -> bool {
        is_null_hash(&self.txid) && self.vout == u32::MAX
    }
}

impl Default for OutPoint {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Debug for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", hex::encode(self.txid), self.vout)
    }
}

/// A 20-byte key identifier (hash of a public key).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct KeyId(pub [u8; 20]);

impl KeyId {
    pub fn is_null(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyId({})", hex::encode(self.0))
    }
}

/// Encoding scheme of a BLS public key.
///
/// Keys registered before the scheme upgrade keep the legacy encoding.
/// The byte tag is what goes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlsScheme {
    Legacy = 1,
    Basic = 2,
}

impl BlsScheme {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(BlsScheme::Legacy),
            2 => Some(BlsScheme::Basic),
            _ => None,
        }
    }
}

/// Length of a serialized BLS public key.
pub const BLS_PUBLIC_KEY_SIZE: usize = 48;

/// A BLS public key carried as opaque bytes.
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlsPublicKey {
    #[serde_as(as = "Bytes")]
    pub bytes: [u8; BLS_PUBLIC_KEY_SIZE],
    pub scheme: BlsScheme,
}

impl BlsPublicKey {
    pub fn new(bytes: [u8; BLS_PUBLIC_KEY_SIZE], scheme: BlsScheme) -> Self {
        Self { bytes, scheme }
    }

    /// A key is valid when it is not all zeroes.
    pub fn is_valid(&self) -> bool {
        self.bytes.iter().any(|b| *b != 0)
    }
}

impl Default for BlsPublicKey {
    fn default() -> Self {
        Self {
            bytes: [0u8; BLS_PUBLIC_KEY_SIZE],
            scheme: BlsScheme::Basic,
        }
    }
}

impl fmt::Debug for BlsPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlsPublicKey({:?}, {})", self.scheme, hex::encode(self.bytes))
    }
}

/// Output locking script, opaque to the registry.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Script(pub Vec<u8>);

impl Script {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", hex::encode(&self.0))
    }
}

/// A transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    pub value: Amount,
    pub script_pubkey: Script,
}

/// An unspent output as reported by the UTXO view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub output: TxOut,
    /// Height of the block that created the output.
    pub height: Height,
}

/// Block index entry: identity and position of a block in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockRef {
    pub hash: Hash,
    pub height: Height,
    /// Parent hash; `ZERO_HASH` for genesis.
    pub prev_hash: Hash,
}

impl BlockRef {
    pub fn new(hash: Hash, height: Height, prev_hash: Hash) -> Self {
        Self {
            hash,
            height,
            prev_hash,
        }
    }
}
