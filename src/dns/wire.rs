//! Byte-cursor reader/writer for the parts of the wire format that aren't
//! the fixed bit-packed header: names (with compression pointers),
//! questions, and resource records all need an absolute position into the
//! whole packet, which a bit-oriented reader doesn't give us, so this
//! walks the buffer directly.

use super::name::Name;
use super::{DnsCodecError, DnsResult};

pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8], pos: usize) -> Self {
        Reader { buf, pos }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    pub fn read_u8(&mut self) -> DnsResult<u8> {
        if self.remaining() < 1 {
            return Err(DnsCodecError::Truncated);
        }
        let v = self.buf[self.pos];
        self.pos += 1;
        Ok(v)
    }

    pub fn read_u16(&mut self) -> DnsResult<u16> {
        if self.remaining() < 2 {
            return Err(DnsCodecError::Truncated);
        }
        let v = u16::from_be_bytes([self.buf[self.pos], self.buf[self.pos + 1]]);
        self.pos += 2;
        Ok(v)
    }

    pub fn read_u32(&mut self) -> DnsResult<u32> {
        if self.remaining() < 4 {
            return Err(DnsCodecError::Truncated);
        }
        let v = u32::from_be_bytes(self.buf[self.pos..self.pos + 4].try_into().unwrap());
        self.pos += 4;
        Ok(v)
    }

    pub fn read_bytes(&mut self, n: usize) -> DnsResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(DnsCodecError::Truncated);
        }
        let v = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(v)
    }

    /// Read a domain name starting at the cursor, following at most one
    /// level of compression-pointer indirection chains, with a jump-count
    /// guard against pointer loops.
    pub fn read_name(&mut self) -> DnsResult<Name> {
        let mut labels = Vec::new();
        let mut cursor = self.pos;
        let mut jumped = false;
        let mut jumps = 0usize;

        loop {
            if cursor >= self.buf.len() {
                return Err(DnsCodecError::Truncated);
            }
            let len = self.buf[cursor];
            if len == 0 {
                cursor += 1;
                if !jumped {
                    self.pos = cursor;
                }
                break;
            }
            if len & 0xC0 == 0xC0 {
                if cursor + 1 >= self.buf.len() {
                    return Err(DnsCodecError::Truncated);
                }
                let pointer =
                    (((len as u16) & 0x3F) << 8) | self.buf[cursor + 1] as u16;
                if !jumped {
                    self.pos = cursor + 2;
                }
                jumps += 1;
                if jumps > 64 || pointer as usize >= self.buf.len() {
                    return Err(DnsCodecError::BadCompressionPointer);
                }
                cursor = pointer as usize;
                jumped = true;
                continue;
            }
            if len > 63 {
                return Err(DnsCodecError::LabelTooLong);
            }
            let start = cursor + 1;
            let end = start + len as usize;
            if end > self.buf.len() {
                return Err(DnsCodecError::Truncated);
            }
            let label = std::str::from_utf8(&self.buf[start..end])
                .map_err(|_| DnsCodecError::InvalidLabel)?;
            labels.push(label.to_string());
            cursor = end;
        }

        if labels.len() > 127 {
            return Err(DnsCodecError::NameTooLong);
        }
        Ok(Name::from_labels(&labels))
    }
}

pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new(buf: Vec<u8>) -> Self {
        Writer { buf }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes a name uncompressed. Compression on write is not required by
    /// this server's wire contract (only decoding compressed upstream
    /// replies is), and skipping it keeps synthesized responses simple.
    pub fn write_name(&mut self, name: &Name) -> DnsResult<()> {
        for label in name.labels() {
            if label.len() > 63 {
                return Err(DnsCodecError::LabelTooLong);
            }
            self.write_u8(label.len() as u8);
            self.write_bytes(label.as_bytes());
        }
        self.write_u8(0);
        Ok(())
    }
}
