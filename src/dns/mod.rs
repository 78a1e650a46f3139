//! Wire-format DNS types: header, question, resource record, and the
//! full message, plus the normalized [`Name`] used as a matcher/cache key.

mod header;
mod message;
mod name;
mod question;
mod record;
mod types;
mod wire;

pub use header::Header;
pub use message::Message;
pub use name::Name;
pub use question::Question;
pub use record::{RData, ResourceRecord};
pub use types::{OpCode, QueryClass, QueryType, RCode};

use thiserror::Error;

/// Failures that can occur while encoding or decoding the wire format.
/// Distinct from [`crate::error::HeimdallError`] so that the codec has no
/// dependency on the rest of the crate; `HeimdallError` wraps this type.
#[derive(Debug, Error)]
pub enum DnsCodecError {
    #[error("unexpected end of packet")]
    Truncated,
    #[error("label exceeds 63 bytes")]
    LabelTooLong,
    #[error("name exceeds 253 bytes")]
    NameTooLong,
    #[error("name contains non-UTF8 or invalid label bytes")]
    InvalidLabel,
    #[error("compression pointer loop or out-of-bounds jump")]
    BadCompressionPointer,
    #[error("message must contain exactly one question, found {0}")]
    NotSingleQuestion(usize),
}

pub type DnsResult<T> = Result<T, DnsCodecError>;
