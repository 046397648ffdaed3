//! # Consensus Binary Codec
//!
//! Snapshots and deltas are persisted in the chain's consensus encoding:
//!
//! - fixed-width integers, little-endian
//! - `CompactSize` length prefixes for sequences
//! - MSB base-128 `VarInt` for internal ids and field masks
//!
//! Layouts are byte-exact and shared with every other node, so nothing here
//! goes through a generic serializer.

mod chain;
mod wire;

pub use wire::{Decoder, Encoder, MAX_COMPACT_SIZE};

/// Codec failures. Always surfaced as corruption by the registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("non-canonical compact size")]
    NonCanonicalCompactSize,

    #[error("compact size {0} exceeds limit")]
    SizeTooLarge(u64),

    #[error("varint overflows u64")]
    VarIntOverflow,

    #[error("unknown provider state fields: {0:#x}")]
    UnknownStateFields(u64),

    #[error("unknown bls key scheme tag {0}")]
    UnknownKeyScheme(u8),

    #[error("value out of range: {0}")]
    OutOfRange(&'static str),

    #[error("inconsistent snapshot: {0}")]
    Inconsistent(&'static str),

    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),
}

/// Types with a consensus encoding.
pub trait Encodable {
    fn encode(&self, enc: &mut Encoder);

    fn to_bytes(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        self.encode(&mut enc);
        enc.into_bytes()
    }
}

/// Types decodable from their consensus encoding.
pub trait Decodable: Sized {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, DecodeError>;

    /// Decode a value that must span the whole buffer.
    fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut dec = Decoder::new(bytes);
        let value = Self::decode(&mut dec)?;
        dec.finish()?;
        Ok(value)
    }
}
