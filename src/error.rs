use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use crate::dns::DnsCodecError;

/// Crate-wide error type. Per-query handling in [`crate::server`] matches
/// on the relevant variants to decide reply/counter/log; the rest
/// (config, fetch, merge) largely just gets logged at its call site.
#[derive(Debug, Error)]
pub enum HeimdallError {
    #[error("malformed query: {0}")]
    MalformedQuery(#[from] DnsCodecError),

    #[error("upstream query to {upstream} timed out")]
    UpstreamTimeout { upstream: SocketAddr },

    #[error("network error reaching upstream {upstream}: {source}")]
    UpstreamNetwork {
        upstream: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("upstream {upstream} returned a malformed reply: {reason}")]
    UpstreamMalformedReply { upstream: SocketAddr, reason: String },

    #[error("upstream reply txn-id {got:#06x} did not match query id {expected:#06x}")]
    UpstreamIdMismatch { expected: u16, got: u16 },

    #[error("failed to send reply to {addr}: {source}")]
    SendError {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("fetching source '{id}' from {url} failed: {reason}")]
    SourceFetch {
        id: String,
        url: String,
        reason: String,
    },

    #[error("merge failed: {0}")]
    Merge(String),

    #[error("host DNS redirect failed: {0}")]
    HostDnsRedirect(String),

    #[error("config file {path} could not be read or parsed: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, HeimdallError>;
