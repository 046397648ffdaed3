use super::DecodeError;

/// Largest sequence length accepted by the decoder.
pub const MAX_COMPACT_SIZE: u64 = 0x0200_0000;

/// Append-only byte writer.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Bitcoin `CompactSize`.
    pub fn write_compact_size(&mut self, n: u64) {
        if n < 253 {
            self.write_u8(n as u8);
        } else if n <= 0xFFFF {
            self.write_u8(253);
            self.write_u16(n as u16);
        } else if n <= 0xFFFF_FFFF {
            self.write_u8(254);
            self.write_u32(n as u32);
        } else {
            self.write_u8(255);
            self.write_u64(n);
        }
    }

    /// MSB base-128 varint where each continuation byte carries an implicit +1,
    /// so every value has exactly one encoding.
    pub fn write_varint(&mut self, mut n: u64) {
        let mut tmp = [0u8; 10];
        let mut len = 0;
        loop {
            tmp[len] = (n & 0x7F) as u8 | if len > 0 { 0x80 } else { 0x00 };
            if n <= 0x7F {
                break;
            }
            n = (n >> 7) - 1;
            len += 1;
        }
        for i in (0..=len).rev() {
            self.buf.push(tmp[i]);
        }
    }

    /// Length-prefixed byte string.
    pub fn write_var_bytes(&mut self, bytes: &[u8]) {
        self.write_compact_size(bytes.len() as u64);
        self.write_bytes(bytes);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over an encoded buffer.
#[derive(Debug)]
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::UnexpectedEof {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Bitcoin `CompactSize`; rejects non-minimal forms and oversized lengths.
    pub fn read_compact_size(&mut self) -> Result<u64, DecodeError> {
        let n = match self.read_u8()? {
            253 => {
                let v = u64::from(self.read_u16()?);
                if v < 253 {
                    return Err(DecodeError::NonCanonicalCompactSize);
                }
                v
            }
            254 => {
                let v = u64::from(self.read_u32()?);
                if v <= 0xFFFF {
                    return Err(DecodeError::NonCanonicalCompactSize);
                }
                v
            }
            255 => {
                let v = self.read_u64()?;
                if v <= 0xFFFF_FFFF {
                    return Err(DecodeError::NonCanonicalCompactSize);
                }
                v
            }
            small => u64::from(small),
        };
        if n > MAX_COMPACT_SIZE {
            return Err(DecodeError::SizeTooLarge(n));
        }
        Ok(n)
    }

    /// Reads a sequence length, bounded by what the buffer could still hold
    /// with `min_item_size` bytes per element.
    pub fn read_len(&mut self, min_item_size: usize) -> Result<usize, DecodeError> {
        let n = self.read_compact_size()? as usize;
        if n.saturating_mul(min_item_size.max(1)) > self.remaining() {
            return Err(DecodeError::UnexpectedEof {
                needed: n.saturating_mul(min_item_size.max(1)),
                remaining: self.remaining(),
            });
        }
        Ok(n)
    }

    pub fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let mut n: u64 = 0;
        loop {
            let byte = self.read_u8()?;
            if n > (u64::MAX >> 7) {
                return Err(DecodeError::VarIntOverflow);
            }
            n = (n << 7) | u64::from(byte & 0x7F);
            if byte & 0x80 != 0 {
                if n == u64::MAX {
                    return Err(DecodeError::VarIntOverflow);
                }
                n += 1;
            } else {
                return Ok(n);
            }
        }
    }

    pub fn read_var_bytes(&mut self) -> Result<Vec<u8>, DecodeError> {
        let len = self.read_len(1)?;
        Ok(self.read_bytes(len)?.to_vec())
    }

    /// Fails if input remains.
    pub fn finish(&self) -> Result<(), DecodeError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(DecodeError::TrailingBytes(n)),
        }
    }
}
