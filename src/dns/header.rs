use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter};

use super::types::{OpCode, RCode};
use super::{DnsCodecError, DnsResult};

/// The fixed 12-byte DNS header. Bit-packed per RFC 1035 §4.1.1.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Header {
    pub id: u16,
    pub qr: bool,
    pub opcode: OpCode,
    pub aa: bool,
    pub tc: bool,
    pub rd: bool,
    pub ra: bool,
    pub z: u8,
    pub rcode: RCode,
    pub qdcount: u16,
    pub ancount: u16,
    pub nscount: u16,
    pub arcount: u16,
}

impl Default for OpCode {
    fn default() -> Self {
        OpCode::Query
    }
}

impl Default for RCode {
    fn default() -> Self {
        RCode::NoError
    }
}

impl Header {
    pub fn write(&self, writer: &mut BitWriter<&mut Vec<u8>, BigEndian>) -> DnsResult<()> {
        writer
            .write_var::<u16>(16, self.id)
            .map_err(|_| DnsCodecError::Truncated)?;
        writer
            .write_var::<u8>(1, self.qr as u8)
            .map_err(|_| DnsCodecError::Truncated)?;
        writer
            .write_var::<u8>(4, self.opcode.into())
            .map_err(|_| DnsCodecError::Truncated)?;
        writer
            .write_var::<u8>(1, self.aa as u8)
            .map_err(|_| DnsCodecError::Truncated)?;
        writer
            .write_var::<u8>(1, self.tc as u8)
            .map_err(|_| DnsCodecError::Truncated)?;
        writer
            .write_var::<u8>(1, self.rd as u8)
            .map_err(|_| DnsCodecError::Truncated)?;
        writer
            .write_var::<u8>(1, self.ra as u8)
            .map_err(|_| DnsCodecError::Truncated)?;
        writer
            .write_var::<u8>(3, self.z)
            .map_err(|_| DnsCodecError::Truncated)?;
        writer
            .write_var::<u8>(4, self.rcode.into())
            .map_err(|_| DnsCodecError::Truncated)?;
        writer
            .write_var::<u16>(16, self.qdcount)
            .map_err(|_| DnsCodecError::Truncated)?;
        writer
            .write_var::<u16>(16, self.ancount)
            .map_err(|_| DnsCodecError::Truncated)?;
        writer
            .write_var::<u16>(16, self.nscount)
            .map_err(|_| DnsCodecError::Truncated)?;
        writer
            .write_var::<u16>(16, self.arcount)
            .map_err(|_| DnsCodecError::Truncated)?;
        Ok(())
    }

    pub fn read(reader: &mut BitReader<&[u8], BigEndian>) -> DnsResult<Self> {
        let id = reader.read_var::<u16>(16).map_err(|_| DnsCodecError::Truncated)?;
        let qr = reader.read_var::<u8>(1).map_err(|_| DnsCodecError::Truncated)? == 1;
        let opcode = OpCode::from(reader.read_var::<u8>(4).map_err(|_| DnsCodecError::Truncated)?);
        let aa = reader.read_var::<u8>(1).map_err(|_| DnsCodecError::Truncated)? == 1;
        let tc = reader.read_var::<u8>(1).map_err(|_| DnsCodecError::Truncated)? == 1;
        let rd = reader.read_var::<u8>(1).map_err(|_| DnsCodecError::Truncated)? == 1;
        let ra = reader.read_var::<u8>(1).map_err(|_| DnsCodecError::Truncated)? == 1;
        let z = reader.read_var::<u8>(3).map_err(|_| DnsCodecError::Truncated)?;
        let rcode = RCode::from(reader.read_var::<u8>(4).map_err(|_| DnsCodecError::Truncated)?);
        let qdcount = reader.read_var::<u16>(16).map_err(|_| DnsCodecError::Truncated)?;
        let ancount = reader.read_var::<u16>(16).map_err(|_| DnsCodecError::Truncated)?;
        let nscount = reader.read_var::<u16>(16).map_err(|_| DnsCodecError::Truncated)?;
        let arcount = reader.read_var::<u16>(16).map_err(|_| DnsCodecError::Truncated)?;
        Ok(Header {
            id,
            qr,
            opcode,
            aa,
            tc,
            rd,
            ra,
            z,
            rcode,
            qdcount,
            ancount,
            nscount,
            arcount,
        })
    }
}
