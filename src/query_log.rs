//! Per-query logging collaborator. Decoupled from the server loop as a
//! trait so a database-backed sink (per §4.9/`enable_database`) can be
//! swapped in without the resolver caring which sink is active.

use std::net::IpAddr;
use std::time::Duration;

use crate::dns::QueryType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryResult {
    Allowed,
    Blocked,
    Cached,
    Failed,
}

pub trait QueryLogSink: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    fn log_query(
        &self,
        name: &str,
        qtype: QueryType,
        client_ip: IpAddr,
        result: QueryResult,
        response_millis: Duration,
        cached: bool,
    );
}

/// Structured `tracing` output, one event per query at `debug` level so
/// it doesn't flood a production log at `info`.
#[derive(Debug, Default)]
pub struct TracingQueryLog;

impl QueryLogSink for TracingQueryLog {
    fn log_query(
        &self,
        name: &str,
        qtype: QueryType,
        client_ip: IpAddr,
        result: QueryResult,
        response_millis: Duration,
        cached: bool,
    ) {
        tracing::debug!(
            name,
            qtype = ?qtype,
            client = %client_ip,
            result = ?result,
            millis = response_millis.as_secs_f64() * 1000.0,
            cached,
            "query"
        );
    }
}
