//! SNMP agent serving a [`MibNode`] over UDP.
//!
//! The agent owns its MIB tree. Plugins, constant values and proxies are
//! registered on it before [`Agent::run`] starts the serving loop; requests
//! are answered one at a time, so plugin producers never run concurrently.
//!
//! # Example
//!
//! ```rust,no_run
//! use snmp_mib_agent::{Agent, oid};
//!
//! # async fn example() -> snmp_mib_agent::Result<()> {
//! let mut agent = Agent::builder()
//!     .bind("0.0.0.0:1161")
//!     .community("public")
//!     .build()
//!     .await?;
//!
//! agent.add_plugin(oid!(1, 3, 6, 1, 4, 1, 99999, 1), || Ok(vec![1, 1, 2, 3, 5, 8, 13]))?;
//! agent.add_proxy(oid!(1, 3, 6, 1, 4, 1, 99999, 2), "10.0.0.2", 161).await?;
//!
//! let token = agent.cancel_token();
//! tokio::spawn(async move {
//!     tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
//!     token.cancel();
//! });
//! agent.run().await
//! # }
//! ```

mod builder;
mod community;
mod dispatch;
mod system;

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use tracing::instrument::WithSubscriber;

use crate::client::Client;
use crate::error::{Error, ErrorStatus, Result};
use crate::message::CommunityMessage;
use crate::mib::{Entry, MibNode, Plugin, PluginData, PluginError, PluginOutput, Proxy, RemoteAgent};
use crate::oid::Oid;
use crate::util::host_port;

pub use builder::AgentBuilder;
pub use community::CommunityPolicy;
pub use system::{SYSTEM_OID, SystemInfo};

/// Default UDP port for SNMP agents.
pub const DEFAULT_PORT: u16 = 161;

/// Default largest datagram accepted or sent.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 8000;

/// Every SNMP entity must accept messages of at least this size (RFC 3417).
pub const MIN_MAX_MESSAGE_SIZE: usize = 484;

/// An SNMP v1/v2c agent.
///
/// Created with [`Agent::builder()`].
pub struct Agent {
    socket: UdpSocket,
    local_addr: SocketAddr,
    tree: MibNode,
    communities: CommunityPolicy,
    max_message_size: usize,
    plugin_failure_backoff: Option<Duration>,
    cancel: CancellationToken,
    log_dispatch: Option<tracing::Dispatch>,
}

impl Agent {
    pub fn builder() -> AgentBuilder {
        AgentBuilder::new()
    }

    /// Address the agent socket is bound to.
    ///
    /// Useful after binding port 0 to learn the assigned port.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// A token that stops [`Agent::run`] when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop the serving loop after the request in flight, if any.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn tree(&self) -> &MibNode {
        &self.tree
    }

    /// Direct access to the MIB tree, for registering raw [`Entry`] values.
    pub fn tree_mut(&mut self) -> &mut MibNode {
        &mut self.tree
    }

    /// Register a plugin whose producer computes the subtree under `oid`.
    ///
    /// The producer runs on demand and its result is cached for the
    /// duration it asks for. See [`Plugin`].
    pub fn add_plugin<F, O>(&mut self, oid: Oid, producer: F) -> Result<()>
    where
        F: FnMut() -> std::result::Result<O, PluginError> + Send + 'static,
        O: Into<PluginOutput>,
    {
        let plugin = Plugin::new(oid.clone(), producer);
        self.register_plugin(oid, plugin)
    }

    /// Register a fixed value or subtree under `oid`.
    pub fn add_value(&mut self, oid: Oid, data: impl Into<PluginData>) -> Result<()> {
        let plugin = Plugin::constant(oid.clone(), data);
        self.register_plugin(oid, plugin)
    }

    fn register_plugin(&mut self, oid: Oid, mut plugin: Plugin) -> Result<()> {
        if let Some(backoff) = self.plugin_failure_backoff {
            plugin = plugin.with_failure_backoff(backoff);
        }
        self.tree.register(&oid, Entry::Plugin(plugin))?;
        tracing::info!(target: "snmp_mib_agent::agent", { snmp.oid = %oid }, "plugin registered");
        Ok(())
    }

    /// Forward the subtree under `oid` to the SNMPv2c agent at `host:port`,
    /// using community `public`.
    pub async fn add_proxy(&mut self, oid: Oid, host: &str, port: u16) -> Result<()> {
        let target = host_port(host, port);
        let client = Client::v2c(target.as_str()).connect().await?;
        self.add_proxy_client(oid, target, client)
    }

    /// Forward the subtree under `oid` to an already configured remote agent.
    ///
    /// `target` names the remote in logs and errors.
    pub fn add_proxy_client(
        &mut self,
        oid: Oid,
        target: impl Into<Box<str>>,
        remote: impl RemoteAgent + 'static,
    ) -> Result<()> {
        let proxy = Proxy::new(oid.clone(), target, remote);
        let target = proxy.target().to_owned();
        self.tree.register(&oid, Entry::Proxy(proxy))?;
        tracing::info!(target: "snmp_mib_agent::agent", { snmp.oid = %oid, snmp.target = %target }, "proxy registered");
        Ok(())
    }

    /// Serve requests until the cancel token fires.
    ///
    /// Per-datagram failures are logged and never end the loop.
    pub async fn run(&mut self) -> Result<()> {
        match self.log_dispatch.clone() {
            Some(dispatch) => self.serve().with_subscriber(dispatch).await,
            None => self.serve().await,
        }
    }

    async fn serve(&mut self) -> Result<()> {
        let mut buf = vec![0u8; self.max_message_size];
        tracing::info!(
            target: "snmp_mib_agent::agent",
            { snmp.local_addr = %self.local_addr },
            "agent listening"
        );

        let mut recv_errors = 0u32;
        loop {
            let received = tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!(target: "snmp_mib_agent::agent", "agent shutting down");
                    return Ok(());
                }
                received = self.socket.recv_from(&mut buf) => received,
            };

            let (len, source) = match received {
                Ok(received) => {
                    recv_errors = 0;
                    received
                }
                Err(e) => {
                    recv_errors = recv_errors.saturating_add(1);
                    let pause = recv_error_backoff(recv_errors);
                    if recv_errors == 1 {
                        tracing::warn!(target: "snmp_mib_agent::agent", error = %e, "agent recv error");
                    } else {
                        tracing::debug!(target: "snmp_mib_agent::agent", error = %e, attempt = recv_errors, ?pause, "agent recv error");
                    }
                    tokio::select! {
                        _ = self.cancel.cancelled() => return Ok(()),
                        _ = tokio::time::sleep(pause) => {}
                    }
                    continue;
                }
            };

            let data = Bytes::copy_from_slice(&buf[..len]);
            self.serve_datagram(source, data).await;
        }
    }

    async fn serve_datagram(&mut self, source: SocketAddr, data: Bytes) {
        tracing::trace!(target: "snmp_mib_agent::agent", { snmp.source = %source, snmp.bytes = data.len() }, "received datagram");

        let message = match CommunityMessage::decode(data) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(target: "snmp_mib_agent::agent", { snmp.source = %source, error = %e }, "dropping undecodable message");
                return;
            }
        };

        let span = tracing::debug_span!(
            target: "snmp_mib_agent::agent",
            "request",
            snmp.source = %source,
            snmp.version = %message.version,
            snmp.request_id = message.pdu.request_id,
            snmp.pdu_type = %message.pdu.pdu_type,
        );

        let reply = match self.handle_message(message).instrument(span.clone()).await {
            Ok(Some(reply)) => reply,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(target: "snmp_mib_agent::agent", parent: &span, error = %e, "request not answered");
                return;
            }
        };

        let bytes = self.encode_within_limit(reply, &span);
        if let Err(e) = self.socket.send_to(&bytes, source).await {
            let e = Error::Io {
                target: Some(source),
                source: e,
            };
            tracing::warn!(target: "snmp_mib_agent::agent", parent: &span, error = %e, "failed to send response");
        }
    }

    /// Encode a reply, replacing it with a tooBig error if it exceeds the
    /// configured maximum message size.
    fn encode_within_limit(&self, mut reply: CommunityMessage, span: &tracing::Span) -> Bytes {
        let bytes = reply.encode();
        if bytes.len() <= self.max_message_size {
            return bytes;
        }
        let e = Error::MessageTooLarge {
            size: bytes.len(),
            max: self.max_message_size,
        };
        tracing::warn!(target: "snmp_mib_agent::agent", parent: span, error = %e, "answering tooBig");
        reply.pdu.varbinds.clear();
        reply.pdu.error_status = 0;
        reply.pdu.set_error(ErrorStatus::TooBig, 0);
        reply.encode()
    }
}

/// Pause before the next receive after `consecutive` failed ones: 10ms,
/// doubling up to one second.
fn recv_error_backoff(consecutive: u32) -> Duration {
    let exp = consecutive.saturating_sub(1).min(7);
    Duration::from_millis(10 << exp).min(Duration::from_secs(1))
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("local_addr", &self.local_addr)
            .field("communities", &self.communities)
            .field("max_message_size", &self.max_message_size)
            .field("top_level_arcs", &self.tree.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::{Pdu, PduType};
    use crate::value::Value;
    use crate::varbind::VarBind;
    use crate::version::Version;
    use crate::oid;

    async fn agent() -> Agent {
        Agent::builder()
            .bind("127.0.0.1:0")
            .system_group(false)
            .build()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_registration_conflicts_surface() {
        let mut agent = agent().await;
        agent.add_value(oid!(1, 3, 6, 1, 4, 1, 1), 7).unwrap();

        let err = agent
            .add_plugin(oid!(1, 3, 6, 1, 4, 1, 1, 2), || Ok(1))
            .unwrap_err();
        assert!(matches!(err, Error::RegistrationConflict { .. }));

        let err = agent.add_value(oid!(1, 3, 6, 1, 4, 1, 1), 8).unwrap_err();
        assert!(matches!(err, Error::RegistrationConflict { .. }));
    }

    #[tokio::test]
    async fn test_oversized_reply_becomes_too_big() {
        let mut agent = Agent::builder()
            .bind("127.0.0.1:0")
            .max_message_size(484)
            .system_group(false)
            .build()
            .await
            .unwrap();
        agent
            .add_value(oid!(1, 3, 6, 1, 4, 1, 1), "x".repeat(600))
            .unwrap();

        let oids = [oid!(1, 3, 6, 1, 4, 1, 1)];
        let request = CommunityMessage::new(Version::V2c, &b"public"[..], Pdu::get_request(9, &oids));
        let reply = agent.handle_message(request).await.unwrap().unwrap();
        assert!(reply.encode().len() > 484);

        let span = tracing::Span::none();
        let bytes = agent.encode_within_limit(reply, &span);
        let decoded = CommunityMessage::decode(bytes).unwrap();
        assert_eq!(decoded.pdu.pdu_type, PduType::Response);
        assert_eq!(decoded.pdu.request_id, 9);
        assert_eq!(decoded.pdu.error_status(), ErrorStatus::TooBig);
        assert!(decoded.pdu.varbinds.is_empty());
    }

    #[test]
    fn test_recv_error_backoff_grows_and_caps() {
        assert_eq!(recv_error_backoff(1), Duration::from_millis(10));
        assert_eq!(recv_error_backoff(2), Duration::from_millis(20));
        assert_eq!(recv_error_backoff(5), Duration::from_millis(160));
        assert_eq!(recv_error_backoff(8), Duration::from_secs(1));
        assert_eq!(recv_error_backoff(u32::MAX), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let mut agent = agent().await;
        let token = agent.cancel_token();
        token.cancel();
        agent.run().await.unwrap();
    }

    #[tokio::test]
    async fn test_serves_over_udp() {
        let mut agent = agent().await;
        agent.add_value(oid!(1, 3, 6, 1, 4, 1, 1), vec![10, 20]).unwrap();
        let addr = agent.local_addr();
        let token = agent.cancel_token();
        let server = tokio::spawn(async move { agent.run().await });

        let client = Client::v2c(addr.to_string())
            .timeout(Duration::from_secs(1))
            .retries(0)
            .connect()
            .await
            .unwrap();
        let vb = client.get(&oid!(1, 3, 6, 1, 4, 1, 1, 1)).await.unwrap();
        assert_eq!(vb, VarBind::new(oid!(1, 3, 6, 1, 4, 1, 1, 1), Value::Integer(20)));

        token.cancel();
        server.await.unwrap().unwrap();
    }
}
