//! UDP transport owning one socket per peer.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::net::UdpSocket;

use super::Transport;
use crate::error::{Error, Result};
use crate::util::bind_udp_socket;

/// Largest datagram accepted from a peer.
const MAX_DATAGRAM: usize = 65535;

/// UDP transport bound to an ephemeral local port and talking to one peer.
#[derive(Clone)]
pub struct UdpTransport {
    inner: Arc<UdpInner>,
}

struct UdpInner {
    socket: UdpSocket,
    peer: SocketAddr,
    local: SocketAddr,
}

impl UdpTransport {
    /// Bind an ephemeral socket of the peer's address family.
    pub async fn connect(peer: SocketAddr) -> Result<Self> {
        let bind: SocketAddr = if peer.is_ipv6() {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        };
        let io_err = |source| Error::Io {
            target: Some(peer),
            source,
        };
        let socket = bind_udp_socket(bind, None).await.map_err(io_err)?;
        let local = socket.local_addr().map_err(io_err)?;
        tracing::debug!(target: "snmp_mib_agent::transport", { snmp.target = %peer, snmp.local = %local }, "udp transport ready");
        Ok(Self {
            inner: Arc::new(UdpInner {
                socket,
                peer,
                local,
            }),
        })
    }
}

impl Transport for UdpTransport {
    async fn send(&self, data: &[u8]) -> Result<()> {
        self.inner
            .socket
            .send_to(data, self.inner.peer)
            .await
            .map_err(|source| Error::Io {
                target: Some(self.inner.peer),
                source,
            })?;
        Ok(())
    }

    async fn recv(&self, request_id: i32, timeout: Duration) -> Result<Bytes> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            let received =
                tokio::time::timeout_at(deadline, self.inner.socket.recv_from(&mut buf)).await;
            let (len, source) = match received {
                Ok(Ok(r)) => r,
                Ok(Err(source)) => {
                    return Err(Error::Io {
                        target: Some(self.inner.peer),
                        source,
                    });
                }
                Err(_) => {
                    return Err(Error::Timeout {
                        target: Some(self.inner.peer),
                        elapsed: timeout,
                        request_id,
                        retries: 0,
                    });
                }
            };
            if source != self.inner.peer {
                tracing::debug!(target: "snmp_mib_agent::transport", { snmp.source = %source, snmp.target = %self.inner.peer }, "ignoring datagram from unexpected source");
                continue;
            }
            buf.truncate(len);
            return Ok(Bytes::from(buf));
        }
    }

    fn peer_addr(&self) -> SocketAddr {
        self.inner.peer
    }

    fn local_addr(&self) -> SocketAddr {
        self.inner.local
    }
}
