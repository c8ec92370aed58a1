//! Client construction.

use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use bytes::Bytes;

use super::{Client, ClientConfig};
use crate::error::{Error, Result};
use crate::transport::{Transport, UdpTransport};
use crate::version::Version;

/// Builder for [`Client`].
///
/// Created via [`Client::builder()`], [`Client::v1()`] or [`Client::v2c()`].
pub struct ClientBuilder {
    target: String,
    config: ClientConfig,
}

impl ClientBuilder {
    pub(crate) fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            config: ClientConfig::default(),
        }
    }

    pub fn version(mut self, version: Version) -> Self {
        self.config.version = version;
        self
    }

    /// Set the community string (default `public`).
    pub fn community(mut self, community: &[u8]) -> Self {
        self.config.community = Bytes::copy_from_slice(community);
        self
    }

    /// Per-attempt timeout (default 5 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Retries after a timed-out attempt (default 3).
    pub fn retries(mut self, retries: u32) -> Self {
        self.config.retries = retries;
        self
    }

    fn resolve_target(&self) -> Result<SocketAddr> {
        let unresolved = || Error::Io {
            target: None,
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("could not resolve address '{}'", self.target),
            ),
        };
        self.target
            .to_socket_addrs()
            .map_err(|source| Error::Io {
                target: None,
                source,
            })?
            .next()
            .ok_or_else(unresolved)
    }

    /// Resolve the target and bind a UDP transport.
    pub async fn connect(self) -> Result<Client<UdpTransport>> {
        let addr = self.resolve_target()?;
        let transport = UdpTransport::connect(addr).await?;
        Ok(self.build(transport))
    }

    /// Build a client over a caller-supplied transport.
    pub fn build<T: Transport>(self, transport: T) -> Client<T> {
        Client::new(transport, self.config)
    }
}
