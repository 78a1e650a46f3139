/// IANA RR type of a question or record. Treated as an opaque tag by the
/// cache and matcher; the wire layer decodes the handful of types needed
/// to round-trip real upstream traffic and keeps everything else as `Other`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueryType {
    A,
    NS,
    CName,
    Soa,
    Ptr,
    Mx,
    Txt,
    Aaaa,
    Srv,
    Other(u16),
}

impl From<u16> for QueryType {
    fn from(v: u16) -> Self {
        match v {
            1 => QueryType::A,
            2 => QueryType::NS,
            5 => QueryType::CName,
            6 => QueryType::Soa,
            12 => QueryType::Ptr,
            15 => QueryType::Mx,
            16 => QueryType::Txt,
            28 => QueryType::Aaaa,
            33 => QueryType::Srv,
            other => QueryType::Other(other),
        }
    }
}

impl From<QueryType> for u16 {
    fn from(v: QueryType) -> Self {
        match v {
            QueryType::A => 1,
            QueryType::NS => 2,
            QueryType::CName => 5,
            QueryType::Soa => 6,
            QueryType::Ptr => 12,
            QueryType::Mx => 15,
            QueryType::Txt => 16,
            QueryType::Aaaa => 28,
            QueryType::Srv => 33,
            QueryType::Other(v) => v,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueryClass {
    In,
    Any,
    Other(u16),
}

impl From<u16> for QueryClass {
    fn from(v: u16) -> Self {
        match v {
            1 => QueryClass::In,
            255 => QueryClass::Any,
            other => QueryClass::Other(other),
        }
    }
}

impl From<QueryClass> for u16 {
    fn from(v: QueryClass) -> Self {
        match v {
            QueryClass::In => 1,
            QueryClass::Any => 255,
            QueryClass::Other(v) => v,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpCode {
    Query,
    IQuery,
    Status,
    Other(u8),
}

impl From<u8> for OpCode {
    fn from(v: u8) -> Self {
        match v {
            0 => OpCode::Query,
            1 => OpCode::IQuery,
            2 => OpCode::Status,
            other => OpCode::Other(other),
        }
    }
}

impl From<OpCode> for u8 {
    fn from(v: OpCode) -> Self {
        match v {
            OpCode::Query => 0,
            OpCode::IQuery => 1,
            OpCode::Status => 2,
            OpCode::Other(v) => v,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RCode {
    NoError,
    FormatError,
    ServerFailure,
    NameError,
    NotImplemented,
    Refused,
    Other(u8),
}

impl From<u8> for RCode {
    fn from(v: u8) -> Self {
        match v {
            0 => RCode::NoError,
            1 => RCode::FormatError,
            2 => RCode::ServerFailure,
            3 => RCode::NameError,
            4 => RCode::NotImplemented,
            5 => RCode::Refused,
            other => RCode::Other(other),
        }
    }
}

impl From<RCode> for u8 {
    fn from(v: RCode) -> Self {
        match v {
            RCode::NoError => 0,
            RCode::FormatError => 1,
            RCode::ServerFailure => 2,
            RCode::NameError => 3,
            RCode::NotImplemented => 4,
            RCode::Refused => 5,
            RCode::Other(v) => v,
        }
    }
}
