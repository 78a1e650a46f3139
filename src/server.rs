//! The UDP server loop: a single receiving task owns the socket, and each
//! datagram is handled on its own spawned task gated by a semaphore that
//! bounds concurrent in-flight queries. A query that can't acquire a
//! permit is dropped rather than queued — backpressure favors freshness
//! over completeness for a resolver sitting in front of live traffic.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::net::UdpSocket;
use tokio::sync::{broadcast, Semaphore};

use crate::cache::DnsCache;
use crate::dns::{Message, RCode};
use crate::error::Result;
use crate::host_dns::HostDnsRedirect;
use crate::matcher::Matcher;
use crate::query_log::{QueryLogSink, QueryResult};
use crate::upstream::UpstreamClient;

#[derive(Debug, Default)]
pub struct ServerStats {
    total: AtomicU64,
    blocked: AtomicU64,
    allowed: AtomicU64,
    cached: AtomicU64,
    failed: AtomicU64,
    upstream: AtomicU64,
    sum_response_millis: AtomicU64,
    start_time: std::sync::OnceLock<Instant>,
    last_query_millis_since_start: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
pub struct ServerStatsSnapshot {
    pub total: u64,
    pub blocked: u64,
    pub allowed: u64,
    pub cached: u64,
    pub failed: u64,
    pub upstream: u64,
    pub avg_response_millis: f64,
    pub uptime: Duration,
}

impl ServerStats {
    pub fn mark_started(&self) {
        let _ = self.start_time.set(Instant::now());
    }

    fn record(&self, result: QueryResult, elapsed: Duration) {
        self.total.fetch_add(1, Ordering::Relaxed);
        self.sum_response_millis
            .fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
        match result {
            QueryResult::Allowed => self.allowed.fetch_add(1, Ordering::Relaxed),
            QueryResult::Blocked => self.blocked.fetch_add(1, Ordering::Relaxed),
            QueryResult::Cached => self.cached.fetch_add(1, Ordering::Relaxed),
            QueryResult::Failed => self.failed.fetch_add(1, Ordering::Relaxed),
        };
        if let Some(start) = self.start_time.get() {
            self.last_query_millis_since_start
                .store(start.elapsed().as_millis() as u64, Ordering::Relaxed);
        }
    }

    fn record_upstream_query(&self) {
        self.upstream.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ServerStatsSnapshot {
        let total = self.total.load(Ordering::Relaxed);
        let sum = self.sum_response_millis.load(Ordering::Relaxed);
        ServerStatsSnapshot {
            total,
            blocked: self.blocked.load(Ordering::Relaxed),
            allowed: self.allowed.load(Ordering::Relaxed),
            cached: self.cached.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            upstream: self.upstream.load(Ordering::Relaxed),
            avg_response_millis: if total > 0 { sum as f64 / total as f64 } else { 0.0 },
            uptime: self
                .start_time
                .get()
                .map(|s| s.elapsed())
                .unwrap_or_default(),
        }
    }
}

pub struct ServerHandles {
    pub matcher: Arc<Matcher>,
    pub cache: Arc<DnsCache>,
    pub enable_cache: bool,
    pub upstream: Arc<UpstreamClient>,
    pub stats: Arc<ServerStats>,
    pub query_log: Arc<dyn QueryLogSink>,
    pub host_dns: Arc<dyn HostDnsRedirect>,
}

/// Binds `bind_addr` and serves until `shutdown_rx` fires. `max_workers`
/// bounds the number of queries being resolved concurrently; the socket
/// read loop itself is never blocked by a full worker pool, it simply
/// drops the datagram.
pub async fn run_udp_server(
    bind_addr: SocketAddr,
    handles: ServerHandles,
    max_workers: usize,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()> {
    let socket = Arc::new(
        UdpSocket::bind(bind_addr)
            .await
            .map_err(|source| crate::error::HeimdallError::Io {
                path: std::path::PathBuf::from(format!("udp:{bind_addr}")),
                source,
            })?,
    );
    tracing::info!(addr = %bind_addr, "DNS server listening");

    handles.stats.mark_started();
    if !handles.host_dns.save_and_redirect_to_local() {
        tracing::warn!("failed to redirect host DNS to local server, continuing anyway");
    }

    let semaphore = Arc::new(Semaphore::new(max_workers));
    let handles = Arc::new(handles);
    let mut buf = [0u8; 512];

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                tracing::info!("shutdown signal received, draining in-flight queries");
                break;
            }
            result = socket.recv_from(&mut buf) => {
                let (len, client_addr) = match result {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::warn!(error = %e, "UDP recv error");
                        continue;
                    }
                };

                let permit = match semaphore.clone().try_acquire_owned() {
                    Ok(permit) => permit,
                    Err(_) => {
                        tracing::warn!(client = %client_addr, "max concurrent queries reached, dropping query");
                        continue;
                    }
                };

                let datagram = buf[..len].to_vec();
                let socket = Arc::clone(&socket);
                let handles = Arc::clone(&handles);

                tokio::spawn(async move {
                    let _permit = permit;
                    handle_datagram(&socket, client_addr, &datagram, &handles).await;
                });
            }
        }
    }

    // Wait for the semaphore to fully drain rather than forcibly
    // cancelling in-flight workers.
    let _ = semaphore.acquire_many(max_workers as u32).await;
    if !handles.host_dns.restore_original() {
        tracing::warn!("failed to restore original host DNS settings");
    }
    tracing::info!("DNS server stopped");
    Ok(())
}

async fn handle_datagram(
    socket: &UdpSocket,
    client_addr: SocketAddr,
    datagram: &[u8],
    handles: &ServerHandles,
) {
    let start = Instant::now();

    let query = match Message::decode(datagram) {
        Ok(q) => q,
        Err(e) => {
            tracing::debug!(client = %client_addr, error = %e, "dropping malformed query");
            handles.stats.record(QueryResult::Failed, start.elapsed());
            return;
        }
    };

    let question = match query.single_question() {
        Ok(q) => q.clone(),
        Err(e) => {
            tracing::debug!(client = %client_addr, error = %e, "dropping query");
            handles.stats.record(QueryResult::Failed, start.elapsed());
            return;
        }
    };

    let (reply, result, cached) = resolve(&query, &question, handles).await;

    handles.stats.record(result, start.elapsed());
    handles.query_log.log_query(
        question.name.as_str(),
        question.qtype,
        client_addr.ip(),
        result,
        start.elapsed(),
        cached,
    );

    match reply.encode() {
        Ok(bytes) => {
            if let Err(source) = socket.send_to(&bytes, client_addr).await {
                tracing::warn!(client = %client_addr, error = %source, "failed to send reply");
            }
        }
        Err(e) => tracing::warn!(client = %client_addr, error = %e, "failed to encode reply"),
    }
}

async fn resolve(
    query: &Message,
    question: &crate::dns::Question,
    handles: &ServerHandles,
) -> (Message, QueryResult, bool) {
    if handles.matcher.is_blocked(&question.name) {
        let reply = Message::synthetic_reply(query, RCode::NameError);
        return (reply, QueryResult::Blocked, false);
    }

    if handles.enable_cache {
        if let Some(cached) = handles.cache.get(&question.name, question.qtype) {
            let reply = cached.respond_to(query);
            return (reply, QueryResult::Cached, true);
        }
    }

    handles.stats.record_upstream_query();
    match handles.upstream.query(query).await {
        Ok(reply) => {
            if handles.enable_cache {
                handles.cache.store(&question.name, question.qtype, &reply);
            }
            (reply, QueryResult::Allowed, false)
        }
        Err(e) => {
            tracing::warn!(name = %question.name, error = %e, "upstream query failed");
            let reply = Message::synthetic_reply(query, RCode::ServerFailure);
            (reply, QueryResult::Failed, false)
        }
    }
}
