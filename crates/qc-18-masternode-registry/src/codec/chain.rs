//! Encodings of the chain primitives carried in provider state.

use super::{Decodable, DecodeError, Decoder, Encodable, Encoder};
use shared_types::{BlsPublicKey, BlsScheme, Hash, KeyId, OutPoint, Script, BLS_PUBLIC_KEY_SIZE};
use std::net::{IpAddr, Ipv6Addr, SocketAddr};

impl Encodable for i32 {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_i32(*self);
    }
}

impl Decodable for i32 {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        dec.read_i32()
    }
}

impl Encodable for u16 {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_u16(*self);
    }
}

impl Decodable for u16 {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        dec.read_u16()
    }
}

impl Encodable for Hash {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_bytes(self);
    }
}

impl Decodable for Hash {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        dec.read_array()
    }
}

impl Encodable for KeyId {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_bytes(&self.0);
    }
}

impl Decodable for KeyId {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        Ok(KeyId(dec.read_array()?))
    }
}

impl Encodable for OutPoint {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_bytes(&self.txid);
        enc.write_u32(self.vout);
    }
}

impl Decodable for OutPoint {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        let txid = dec.read_array()?;
        let vout = dec.read_u32()?;
        Ok(OutPoint::new(txid, vout))
    }
}

impl Encodable for Script {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_var_bytes(self.as_bytes());
    }
}

impl Decodable for Script {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        Ok(Script(dec.read_var_bytes()?))
    }
}

// Scheme tag first: readers pick legacy or basic key encoding from it.
impl Encodable for BlsPublicKey {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_u8(self.scheme.tag());
        enc.write_bytes(&self.bytes);
    }
}

impl Decodable for BlsPublicKey {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        let tag = dec.read_u8()?;
        let scheme = BlsScheme::from_tag(tag).ok_or(DecodeError::UnknownKeyScheme(tag))?;
        let bytes: [u8; BLS_PUBLIC_KEY_SIZE] = dec.read_array()?;
        Ok(BlsPublicKey::new(bytes, scheme))
    }
}

/// 16-byte IPv6 address (IPv4 mapped) followed by a big-endian port.
/// All zeroes encodes "no address", so `[::]:0` reads back as `None`.
/// Block processing never admits an unspecified ip or a zero port.
impl Encodable for Option<SocketAddr> {
    fn encode(&self, enc: &mut Encoder) {
        match self {
            None => {
                enc.write_bytes(&[0u8; 16]);
                enc.write_bytes(&[0u8; 2]);
            }
            Some(addr) => {
                let ip = match addr.ip() {
                    IpAddr::V4(v4) => v4.to_ipv6_mapped(),
                    IpAddr::V6(v6) => v6,
                };
                enc.write_bytes(&ip.octets());
                enc.write_bytes(&addr.port().to_be_bytes());
            }
        }
    }
}

impl Decodable for Option<SocketAddr> {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        let octets: [u8; 16] = dec.read_array()?;
        let port = u16::from_be_bytes(dec.read_array()?);
        let ip = Ipv6Addr::from(octets);
        if ip.is_unspecified() && port == 0 {
            return Ok(None);
        }
        let ip = match ip.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(ip),
        };
        Ok(Some(SocketAddr::new(ip, port)))
    }
}
