//! Minimal SNMPv1/v2c client.
//!
//! Enough of a manager to back a [`Proxy`](crate::mib::Proxy): single-OID
//! Get and GetNext with timeouts, retries and request-ID correlation.
//!
//! ```rust,no_run
//! use snmp_mib_agent::{Client, oid};
//! use std::time::Duration;
//!
//! # async fn example() -> snmp_mib_agent::Result<()> {
//! let client = Client::v2c("192.0.2.10:161")
//!     .community(b"public")
//!     .timeout(Duration::from_secs(2))
//!     .connect()
//!     .await?;
//! let descr = client.get(&oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)).await?;
//! println!("{}", descr);
//! # Ok(())
//! # }
//! ```

mod builder;

pub use builder::ClientBuilder;

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::message::CommunityMessage;
use crate::mib::{BoxFuture, RemoteAgent};
use crate::oid::Oid;
use crate::pdu::{Pdu, PduType};
use crate::transport::{Transport, UdpTransport};
use crate::varbind::VarBind;
use crate::version::Version;

/// Settings a client was built with.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub version: Version,
    pub community: Bytes,
    /// Time to wait for each attempt.
    pub timeout: Duration,
    /// Extra attempts after the first times out.
    pub retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            version: Version::V2c,
            community: Bytes::from_static(b"public"),
            timeout: Duration::from_secs(5),
            retries: 3,
        }
    }
}

/// SNMP client bound to one agent.
///
/// Cloning is cheap and clones share the transport and request-ID counter.
pub struct Client<T: Transport = UdpTransport> {
    inner: Arc<ClientInner<T>>,
}

struct ClientInner<T> {
    transport: T,
    config: ClientConfig,
    next_request_id: AtomicI32,
}

impl<T: Transport> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Client<UdpTransport> {
    /// Start building a client for `target` (`host:port`).
    pub fn builder(target: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(target)
    }

    pub fn v1(target: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(target).version(Version::V1)
    }

    pub fn v2c(target: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(target).version(Version::V2c)
    }
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport,
                config,
                next_request_id: AtomicI32::new(1),
            }),
        }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.inner.transport.peer_addr()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Positive request IDs, wrapping back to 1.
    fn request_id(&self) -> i32 {
        let id = self
            .inner
            .next_request_id
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |id| {
                Some(id.checked_add(1).unwrap_or(1))
            })
            .unwrap_or(1);
        id.max(1)
    }

    /// Get one OID.
    pub async fn get(&self, oid: &Oid) -> Result<VarBind> {
        let pdu = Pdu::get_request(self.request_id(), std::slice::from_ref(oid));
        self.single(pdu).await
    }

    /// GetNext from one OID.
    pub async fn get_next(&self, oid: &Oid) -> Result<VarBind> {
        let pdu = Pdu::get_next_request(self.request_id(), std::slice::from_ref(oid));
        self.single(pdu).await
    }

    async fn single(&self, pdu: Pdu) -> Result<VarBind> {
        let peer = self.peer_addr();
        let mut response = self.request(pdu).await?;

        if response.is_error() {
            let index = response.error_index.max(0) as u32;
            let oid = index
                .checked_sub(1)
                .and_then(|i| response.varbinds.get(i as usize))
                .map(|vb| vb.oid.clone());
            return Err(Error::Snmp {
                target: Some(peer),
                status: response.error_status(),
                index,
                oid,
            });
        }

        if response.varbinds.len() != 1 {
            tracing::debug!(target: "snmp_mib_agent::client", { snmp.target = %peer, count = response.varbinds.len() }, "expected exactly one varbind");
            return Err(Error::MalformedResponse { target: Some(peer) });
        }
        Ok(response.varbinds.swap_remove(0))
    }

    /// Send `pdu` and wait for the matching Response, retrying on timeout.
    async fn request(&self, pdu: Pdu) -> Result<Pdu> {
        let config = &self.inner.config;
        let peer = self.peer_addr();
        let request_id = pdu.request_id;
        let data = CommunityMessage::new(config.version, config.community.clone(), pdu).encode();
        let start = Instant::now();

        for attempt in 0..=config.retries {
            if attempt > 0 {
                tracing::debug!(target: "snmp_mib_agent::client", { snmp.target = %peer, snmp.request_id = request_id, attempt }, "retrying");
            }
            self.inner.transport.send(&data).await?;

            let deadline = tokio::time::Instant::now() + config.timeout;
            loop {
                let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
                let bytes = match self.inner.transport.recv(request_id, remaining).await {
                    Ok(bytes) => bytes,
                    Err(Error::Timeout { .. }) => break,
                    Err(err) => return Err(err),
                };

                let response = match CommunityMessage::decode(bytes) {
                    Ok(msg) => msg.pdu,
                    Err(err) => {
                        tracing::debug!(target: "snmp_mib_agent::client", { snmp.target = %peer, error = %err }, "discarding undecodable response");
                        continue;
                    }
                };
                if response.request_id != request_id {
                    let err = Error::RequestIdMismatch {
                        expected: request_id,
                        actual: response.request_id,
                    };
                    tracing::debug!(target: "snmp_mib_agent::client", { snmp.target = %peer, error = %err }, "discarding stale response");
                    continue;
                }
                if response.pdu_type != PduType::Response {
                    return Err(Error::MalformedResponse { target: Some(peer) });
                }
                return Ok(response);
            }
        }

        tracing::debug!(target: "snmp_mib_agent::client", { snmp.target = %peer, snmp.request_id = request_id, retries = config.retries }, "request timed out");
        Err(Error::Timeout {
            target: Some(peer),
            elapsed: start.elapsed(),
            request_id,
            retries: config.retries,
        })
    }
}

impl<T: Transport + 'static> RemoteAgent for Client<T> {
    fn get<'a>(&'a self, oid: &'a Oid) -> BoxFuture<'a, Result<VarBind>> {
        Box::pin(Client::get(self, oid))
    }

    fn get_next<'a>(&'a self, oid: &'a Oid) -> BoxFuture<'a, Result<VarBind>> {
        Box::pin(Client::get_next(self, oid))
    }
}
