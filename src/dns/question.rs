use super::types::{QueryClass, QueryType};
use super::wire::{Reader, Writer};
use super::{DnsResult, Name};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Question {
    pub name: Name,
    pub qtype: QueryType,
    pub qclass: QueryClass,
}

impl Question {
    pub(super) fn read(reader: &mut Reader) -> DnsResult<Self> {
        let name = reader.read_name()?;
        let qtype = QueryType::from(reader.read_u16()?);
        let qclass = QueryClass::from(reader.read_u16()?);
        Ok(Question {
            name,
            qtype,
            qclass,
        })
    }

    pub(super) fn write(&self, writer: &mut Writer) -> DnsResult<()> {
        writer.write_name(&self.name)?;
        writer.write_u16(self.qtype.into());
        writer.write_u16(self.qclass.into());
        Ok(())
    }
}
