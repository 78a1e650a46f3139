pub mod blocklist;
pub mod cache;
pub mod config;
pub mod dns;
pub mod error;
pub mod host_dns;
pub mod matcher;
pub mod query_log;
pub mod server;
pub mod upstream;

pub use error::{HeimdallError, Result};
