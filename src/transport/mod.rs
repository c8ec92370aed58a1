//! Client-side transport abstraction.
//!
//! The proxy's [`Client`](crate::client::Client) talks to its remote agent
//! through a [`Transport`]. Only UDP is provided; the trait is the seam tests
//! and embedders use to substitute their own.

mod udp;

pub use udp::UdpTransport;

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;

use crate::error::Result;

/// Datagram exchange with one peer.
///
/// Implementations are cheap to clone (they share their socket), so a client
/// can be handed to several proxies.
pub trait Transport: Send + Sync + Clone {
    /// Send one request datagram to the peer.
    fn send(&self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Wait up to `timeout` for the next datagram from the peer.
    ///
    /// `request_id` is only used for error context; correlation happens in
    /// the client. Expiry is reported as [`Error::Timeout`](crate::Error::Timeout).
    fn recv(
        &self,
        request_id: i32,
        timeout: Duration,
    ) -> impl Future<Output = Result<Bytes>> + Send;

    fn peer_addr(&self) -> SocketAddr;

    fn local_addr(&self) -> SocketAddr;
}
