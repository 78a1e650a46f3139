use std::net::{Ipv4Addr, Ipv6Addr};

use super::types::{QueryClass, QueryType};
use super::wire::{Reader, Writer};
use super::{DnsCodecError, DnsResult, Name};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    CName(Name),
    Ns(Name),
    Ptr(Name),
    Mx { preference: u16, exchange: Name },
    Txt(Vec<Vec<u8>>),
    Soa {
        mname: Name,
        rname: Name,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum: u32,
    },
    Srv {
        priority: u16,
        weight: u16,
        port: u16,
        target: Name,
    },
    Raw(Vec<u8>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceRecord {
    pub name: Name,
    pub rtype: QueryType,
    pub rclass: QueryClass,
    pub ttl: u32,
    pub rdata: RData,
}

impl ResourceRecord {
    pub(super) fn read(reader: &mut Reader) -> DnsResult<Self> {
        let name = reader.read_name()?;
        let rtype = QueryType::from(reader.read_u16()?);
        let rclass = QueryClass::from(reader.read_u16()?);
        let ttl = reader.read_u32()?;
        let rdlength = reader.read_u16()? as usize;
        let rdata_start = reader.position();
        let rdata = Self::read_rdata(reader, rtype, rdlength)?;
        // Some parsers (MX/SOA/SRV with compressed embedded names) can
        // legitimately consume fewer or more bytes than rdlength claims;
        // pin the cursor to the declared boundary so the next record
        // starts in the right place regardless.
        let consumed = reader.position().saturating_sub(rdata_start);
        if consumed < rdlength {
            reader.read_bytes(rdlength - consumed)?;
        }
        Ok(ResourceRecord {
            name,
            rtype,
            rclass,
            ttl,
            rdata,
        })
    }

    fn read_rdata(reader: &mut Reader, rtype: QueryType, rdlength: usize) -> DnsResult<RData> {
        Ok(match rtype {
            QueryType::A => {
                let bytes = reader.read_bytes(4)?;
                RData::A(Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]))
            }
            QueryType::Aaaa => {
                let bytes = reader.read_bytes(16)?;
                let octets: [u8; 16] = bytes.try_into().map_err(|_| DnsCodecError::Truncated)?;
                RData::Aaaa(Ipv6Addr::from(octets))
            }
            QueryType::CName => RData::CName(reader.read_name()?),
            QueryType::NS => RData::Ns(reader.read_name()?),
            QueryType::Ptr => RData::Ptr(reader.read_name()?),
            QueryType::Mx => {
                let preference = reader.read_u16()?;
                let exchange = reader.read_name()?;
                RData::Mx {
                    preference,
                    exchange,
                }
            }
            QueryType::Soa => {
                let mname = reader.read_name()?;
                let rname = reader.read_name()?;
                let serial = reader.read_u32()?;
                let refresh = reader.read_u32()?;
                let retry = reader.read_u32()?;
                let expire = reader.read_u32()?;
                let minimum = reader.read_u32()?;
                RData::Soa {
                    mname,
                    rname,
                    serial,
                    refresh,
                    retry,
                    expire,
                    minimum,
                }
            }
            QueryType::Srv => {
                let priority = reader.read_u16()?;
                let weight = reader.read_u16()?;
                let port = reader.read_u16()?;
                let target = reader.read_name()?;
                RData::Srv {
                    priority,
                    weight,
                    port,
                    target,
                }
            }
            QueryType::Txt => {
                let mut strings = Vec::new();
                let mut read = 0usize;
                while read < rdlength {
                    let len = reader.read_u8()? as usize;
                    strings.push(reader.read_bytes(len)?.to_vec());
                    read += 1 + len;
                }
                RData::Txt(strings)
            }
            QueryType::Other(_) => RData::Raw(reader.read_bytes(rdlength)?.to_vec()),
        })
    }

    pub(super) fn write(&self, writer: &mut Writer) -> DnsResult<()> {
        writer.write_name(&self.name)?;
        writer.write_u16(self.rtype.into());
        writer.write_u16(self.rclass.into());
        writer.write_u32(self.ttl);

        let mut rdata_writer = Writer::new(Vec::new());
        match &self.rdata {
            RData::A(addr) => rdata_writer.write_bytes(&addr.octets()),
            RData::Aaaa(addr) => rdata_writer.write_bytes(&addr.octets()),
            RData::CName(name) | RData::Ns(name) | RData::Ptr(name) => {
                rdata_writer.write_name(name)?
            }
            RData::Mx {
                preference,
                exchange,
            } => {
                rdata_writer.write_u16(*preference);
                rdata_writer.write_name(exchange)?;
            }
            RData::Soa {
                mname,
                rname,
                serial,
                refresh,
                retry,
                expire,
                minimum,
            } => {
                rdata_writer.write_name(mname)?;
                rdata_writer.write_name(rname)?;
                rdata_writer.write_u32(*serial);
                rdata_writer.write_u32(*refresh);
                rdata_writer.write_u32(*retry);
                rdata_writer.write_u32(*expire);
                rdata_writer.write_u32(*minimum);
            }
            RData::Srv {
                priority,
                weight,
                port,
                target,
            } => {
                rdata_writer.write_u16(*priority);
                rdata_writer.write_u16(*weight);
                rdata_writer.write_u16(*port);
                rdata_writer.write_name(target)?;
            }
            RData::Txt(strings) => {
                for s in strings {
                    rdata_writer.write_u8(s.len() as u8);
                    rdata_writer.write_bytes(s);
                }
            }
            RData::Raw(bytes) => rdata_writer.write_bytes(bytes),
        }
        let rdata_bytes = rdata_writer.into_inner();
        writer.write_u16(rdata_bytes.len() as u16);
        writer.write_bytes(&rdata_bytes);
        Ok(())
    }

    /// The minimum-across-answers TTL the cache uses to derive a clamped
    /// expiry; this is the TTL of a single record.
    pub fn ttl(&self) -> u32 {
        self.ttl
    }
}
