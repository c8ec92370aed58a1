//! Agent construction.

use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{
    Agent, CommunityPolicy, DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_PORT, MIN_MAX_MESSAGE_SIZE,
    SYSTEM_OID, SystemInfo,
};
use crate::error::{Error, Result};
use crate::mib::{Entry, MibNode};
use crate::oid::Oid;
use crate::util::bind_udp_socket;

/// Builder for [`Agent`].
///
/// # Example
///
/// ```rust,no_run
/// use snmp_mib_agent::{Agent, SystemInfo};
///
/// # async fn example() -> snmp_mib_agent::Result<()> {
/// let agent = Agent::builder()
///     .bind("[::]:161")
///     .community("public")
///     .system_info(SystemInfo {
///         contact: "noc@example.net".into(),
///         ..SystemInfo::default()
///     })
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct AgentBuilder {
    bind: String,
    port: Option<u16>,
    communities: CommunityPolicy,
    max_message_size: usize,
    recv_buffer_size: Option<usize>,
    system_info: SystemInfo,
    system_group: bool,
    plugin_failure_backoff: Option<Duration>,
    cancel: Option<CancellationToken>,
    log_dispatch: Option<tracing::Dispatch>,
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            bind: format!("0.0.0.0:{DEFAULT_PORT}"),
            port: None,
            communities: CommunityPolicy::AcceptAll,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            recv_buffer_size: None,
            system_info: SystemInfo::default(),
            system_group: true,
            plugin_failure_backoff: None,
            cancel: None,
            log_dispatch: None,
        }
    }

    /// Address to listen on (default `0.0.0.0:161`).
    ///
    /// Use `[::]:port` for a dual-stack socket.
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.bind = addr.into();
        self
    }

    /// Override the port of the bind address.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Answer only requests carrying `community`.
    ///
    /// May be called repeatedly to accept several communities. Without any
    /// call every community is accepted.
    pub fn community(mut self, community: impl AsRef<[u8]>) -> Self {
        self.communities
            .add(Bytes::copy_from_slice(community.as_ref()));
        self
    }

    pub fn communities(mut self, policy: CommunityPolicy) -> Self {
        self.communities = policy;
        self
    }

    /// Largest datagram received or sent (default 8000).
    ///
    /// Values below 484 are raised to 484. Replies that would exceed the
    /// limit are answered with a tooBig error.
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size.max(MIN_MAX_MESSAGE_SIZE);
        self
    }

    /// Socket receive buffer size. The kernel may cap this at `rmem_max`.
    pub fn recv_buffer_size(mut self, size: usize) -> Self {
        self.recv_buffer_size = Some(size);
        self
    }

    /// Strings served under the MIB-2 system group.
    pub fn system_info(mut self, info: SystemInfo) -> Self {
        self.system_info = info;
        self
    }

    /// Whether to register the MIB-2 system group at 1.3.6.1.2.1.1
    /// (default true).
    pub fn system_group(mut self, enabled: bool) -> Self {
        self.system_group = enabled;
        self
    }

    /// Hold off re-running failed plugin producers for `backoff`.
    ///
    /// Applies to plugins registered through [`Agent::add_plugin`] and
    /// [`Agent::add_value`].
    pub fn plugin_failure_backoff(mut self, backoff: Duration) -> Self {
        self.plugin_failure_backoff = Some(backoff);
        self
    }

    /// Use an externally owned cancellation token.
    pub fn cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Send the agent's logs to `dispatch` instead of the global subscriber.
    pub fn log_dispatch(mut self, dispatch: tracing::Dispatch) -> Self {
        self.log_dispatch = Some(dispatch);
        self
    }

    fn resolve_bind(&self) -> Result<SocketAddr> {
        let unresolved = || Error::Io {
            target: None,
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("could not resolve bind address '{}'", self.bind),
            ),
        };
        let mut addr = self
            .bind
            .to_socket_addrs()
            .map_err(|source| Error::Io {
                target: None,
                source,
            })?
            .next()
            .ok_or_else(unresolved)?;
        if let Some(port) = self.port {
            addr.set_port(port);
        }
        Ok(addr)
    }

    /// Bind the socket and build the agent.
    pub async fn build(self) -> Result<Agent> {
        let addr = self.resolve_bind()?;
        let socket = bind_udp_socket(addr, self.recv_buffer_size)
            .await
            .map_err(|source| Error::Io {
                target: Some(addr),
                source,
            })?;
        let local_addr = socket.local_addr().map_err(|source| Error::Io {
            target: Some(addr),
            source,
        })?;

        let mut tree = MibNode::new();
        if self.system_group {
            let plugin = self.system_info.into_plugin(Instant::now());
            tree.register(&Oid::from_slice(&SYSTEM_OID), Entry::Plugin(plugin))?;
        }

        tracing::debug!(
            target: "snmp_mib_agent::agent",
            {
                snmp.local_addr = %local_addr,
                max_message_size = self.max_message_size,
                system_group = self.system_group
            },
            "agent bound"
        );

        Ok(Agent {
            socket,
            local_addr,
            tree,
            communities: self.communities,
            max_message_size: self.max_message_size,
            plugin_failure_backoff: self.plugin_failure_backoff,
            cancel: self.cancel.unwrap_or_default(),
            log_dispatch: self.log_dispatch,
        })
    }
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}
