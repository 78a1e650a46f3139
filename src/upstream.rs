//! Single-shot UDP query to the configured upstream resolver. No retries
//! at this layer — the server decides whether and how to react to a
//! failure.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::dns::Message;
use crate::error::{HeimdallError, Result};

pub struct UpstreamClient {
    pub upstream: SocketAddr,
    pub timeout: Duration,
}

impl UpstreamClient {
    pub fn new(upstream: SocketAddr, timeout: Duration) -> Self {
        UpstreamClient { upstream, timeout }
    }

    /// Sends `query` to the upstream and waits for a reply whose txn-id
    /// matches, up to `self.timeout`. Truncated replies are accepted
    /// as-is; this layer does not retry over TCP.
    pub async fn query(&self, query: &Message) -> Result<Message> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|source| HeimdallError::UpstreamNetwork {
                upstream: self.upstream,
                source,
            })?;

        let request_bytes = query.encode()?;

        socket
            .send_to(&request_bytes, self.upstream)
            .await
            .map_err(|source| HeimdallError::UpstreamNetwork {
                upstream: self.upstream,
                source,
            })?;

        let mut buf = [0u8; 512];
        let recv = timeout(self.timeout, socket.recv_from(&mut buf))
            .await
            .map_err(|_| HeimdallError::UpstreamTimeout {
                upstream: self.upstream,
            })?;

        let (n, _from) = recv.map_err(|source| HeimdallError::UpstreamNetwork {
            upstream: self.upstream,
            source,
        })?;

        let reply =
            Message::decode(&buf[..n]).map_err(|e| HeimdallError::UpstreamMalformedReply {
                upstream: self.upstream,
                reason: e.to_string(),
            })?;

        if reply.header.id != query.header.id {
            return Err(HeimdallError::UpstreamIdMismatch {
                expected: query.header.id,
                got: reply.header.id,
            });
        }

        Ok(reply)
    }
}
