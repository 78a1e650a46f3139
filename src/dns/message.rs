use bitstream_io::{BigEndian, BitReader, BitWriter};

use super::header::Header;
use super::question::Question;
use super::record::ResourceRecord;
use super::types::RCode;
use super::wire::{Reader, Writer};
use super::{DnsCodecError, DnsResult};

/// A full DNS message: header plus the four sections. This is the unit the
/// cache stores (parsed, not raw bytes — see the design note on cache
/// response mutation) and the unit the server sends on the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Message {
    pub header: Header,
    pub questions: Vec<Question>,
    pub answers: Vec<ResourceRecord>,
    pub authorities: Vec<ResourceRecord>,
    pub additionals: Vec<ResourceRecord>,
}

impl Message {
    pub fn decode(buf: &[u8]) -> DnsResult<Self> {
        let mut header_reader = BitReader::endian(buf, BigEndian);
        let header = Header::read(&mut header_reader)?;

        let mut reader = Reader::new(buf, 12);
        let mut questions = Vec::with_capacity(header.qdcount as usize);
        for _ in 0..header.qdcount {
            questions.push(Question::read(&mut reader)?);
        }
        let mut answers = Vec::with_capacity(header.ancount as usize);
        for _ in 0..header.ancount {
            answers.push(ResourceRecord::read(&mut reader)?);
        }
        let mut authorities = Vec::with_capacity(header.nscount as usize);
        for _ in 0..header.nscount {
            authorities.push(ResourceRecord::read(&mut reader)?);
        }
        let mut additionals = Vec::with_capacity(header.arcount as usize);
        for _ in 0..header.arcount {
            additionals.push(ResourceRecord::read(&mut reader)?);
        }

        Ok(Message {
            header,
            questions,
            answers,
            authorities,
            additionals,
        })
    }

    pub fn encode(&self) -> DnsResult<Vec<u8>> {
        let mut header = self.header.clone();
        header.qdcount = self.questions.len() as u16;
        header.ancount = self.answers.len() as u16;
        header.nscount = self.authorities.len() as u16;
        header.arcount = self.additionals.len() as u16;

        let mut header_bytes: Vec<u8> = Vec::with_capacity(12);
        {
            let mut bit_writer = BitWriter::endian(&mut header_bytes, BigEndian);
            header.write(&mut bit_writer)?;
        }

        let mut writer = Writer::new(header_bytes);
        for q in &self.questions {
            q.write(&mut writer)?;
        }
        for r in self.answers.iter().chain(&self.authorities).chain(&self.additionals) {
            r.write(&mut writer)?;
        }
        Ok(writer.into_inner())
    }

    /// Exactly one question, as the server's per-query handler requires.
    pub fn single_question(&self) -> DnsResult<&Question> {
        if self.questions.len() != 1 {
            return Err(DnsCodecError::NotSingleQuestion(self.questions.len()));
        }
        Ok(&self.questions[0])
    }

    /// Build a reply whose id and question section come from `query`,
    /// splicing in `self`'s answer/authority/additional sections and
    /// flags. The cached message's own id must never leak into the
    /// reply — that's the one invariant this function exists to hold.
    pub fn respond_to(&self, query: &Message) -> Message {
        let mut header = self.header.clone();
        header.id = query.header.id;
        Message {
            header,
            questions: query.questions.clone(),
            answers: self.answers.clone(),
            authorities: self.authorities.clone(),
            additionals: self.additionals.clone(),
        }
    }

    /// A synthetic reply carrying `rcode` and no records, addressed back
    /// to `query`'s id and question — used for the NXDOMAIN sinkhole
    /// reply and the SERVFAIL upstream-failure reply.
    pub fn synthetic_reply(query: &Message, rcode: RCode) -> Message {
        let mut header = Header {
            id: query.header.id,
            qr: true,
            opcode: query.header.opcode,
            rd: query.header.rd,
            ra: true,
            rcode,
            ..Header::default()
        };
        header.qdcount = query.questions.len() as u16;
        Message {
            header,
            questions: query.questions.clone(),
            answers: Vec::new(),
            authorities: Vec::new(),
            additionals: Vec::new(),
        }
    }

    pub fn is_cacheable(&self) -> bool {
        matches!(self.header.rcode, RCode::NoError) && !self.answers.is_empty()
    }

    /// Minimum TTL across the answer section; `None` if there are no
    /// answers (in which case the response is not cacheable at all).
    pub fn min_answer_ttl(&self) -> Option<u32> {
        self.answers.iter().map(ResourceRecord::ttl).min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::{Name, QueryClass, QueryType, RData};

    fn sample_query(id: u16, name: &str) -> Message {
        Message {
            header: Header {
                id,
                qr: false,
                rd: true,
                qdcount: 1,
                ..Header::default()
            },
            questions: vec![Question {
                name: Name::from(name),
                qtype: QueryType::A,
                qclass: QueryClass::In,
            }],
            ..Message::default()
        }
    }

    #[test]
    fn round_trips_a_record() {
        let mut msg = sample_query(0x1234, "example.org");
        msg.header.qr = true;
        msg.answers.push(ResourceRecord {
            name: Name::from("example.org"),
            rtype: QueryType::A,
            rclass: QueryClass::In,
            ttl: 3600,
            rdata: RData::A("93.184.216.34".parse().unwrap()),
        });
        let bytes = msg.encode().unwrap();
        let decoded = Message::decode(&bytes).unwrap();
        assert_eq!(decoded.header.id, 0x1234);
        assert_eq!(decoded.answers.len(), 1);
        assert_eq!(decoded.answers[0].name.as_str(), "example.org");
    }

    #[test]
    fn respond_to_rewrites_txn_id_and_question() {
        let cached = {
            let mut m = sample_query(0x1111, "example.org");
            m.header.qr = true;
            m.answers.push(ResourceRecord {
                name: Name::from("example.org"),
                rtype: QueryType::A,
                rclass: QueryClass::In,
                ttl: 300,
                rdata: RData::A("1.2.3.4".parse().unwrap()),
            });
            m
        };
        let fresh_query = sample_query(0x9ABC, "example.org");

        let reply = cached.respond_to(&fresh_query);
        assert_eq!(reply.header.id, 0x9ABC);
        assert_eq!(reply.questions, fresh_query.questions);
        assert_eq!(reply.answers, cached.answers);
    }

    #[test]
    fn synthetic_nxdomain_preserves_id_and_question() {
        let query = sample_query(0x4242, "ads.example.com");
        let reply = Message::synthetic_reply(&query, RCode::NameError);
        assert_eq!(reply.header.id, 0x4242);
        assert!(matches!(reply.header.rcode, RCode::NameError));
        assert!(reply.answers.is_empty());
        assert_eq!(reply.questions, query.questions);
    }
}
