//! Common test fixtures: well-known OIDs and helpers to run agents locally.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::ops::Bound;
use std::time::Duration;

use bytes::Bytes;
use snmp_mib_agent::mib::{BoxFuture, RemoteAgent};
use snmp_mib_agent::{
    Agent, AgentBuilder, Client, CommunityMessage, Error, ErrorStatus, Oid, Value, VarBind, oid,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

// =============================================================================
// Standard system MIB OIDs (1.3.6.1.2.1.1.*)
// =============================================================================

pub fn sys_descr() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)
}
pub fn sys_uptime() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 3, 0)
}
pub fn sys_contact() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 4, 0)
}
pub fn sys_name() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 5, 0)
}
pub fn sys_location() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 6, 0)
}

/// System subtree root: 1.3.6.1.2.1.1
pub fn system_subtree() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1)
}

// =============================================================================
// Test mount points
// =============================================================================

/// Private enterprise subtree used by the tests: 1.3.6.1.4.1.99999
pub fn test_enterprise() -> Oid {
    oid!(1, 3, 6, 1, 4, 1, 99999)
}

/// 1.3.6.1.4.1.99999.<arc>
pub fn mount(arc: u32) -> Oid {
    test_enterprise().child(arc)
}

/// Nonexistent OID for testing NoSuchObject
pub fn nonexistent_oid() -> Oid {
    oid!(1, 3, 6, 1, 99, 99, 99, 0)
}

// =============================================================================
// Running agents
// =============================================================================

/// A loopback agent builder without the system group.
pub fn loopback() -> AgentBuilder {
    Agent::builder().bind("127.0.0.1:0").system_group(false)
}

/// An agent serving on a background task.
pub struct RunningAgent {
    pub addr: SocketAddr,
    token: CancellationToken,
    handle: JoinHandle<snmp_mib_agent::Result<()>>,
}

impl RunningAgent {
    pub fn spawn(mut agent: Agent) -> Self {
        let addr = agent.local_addr();
        let token = agent.cancel_token();
        let handle = tokio::spawn(async move { agent.run().await });
        Self {
            addr,
            token,
            handle,
        }
    }

    /// Cancel the agent and wait for its loop to end.
    pub async fn stop(self) {
        self.token.cancel();
        self.handle
            .await
            .expect("agent task panicked")
            .expect("agent loop failed");
    }
}

/// A v2c client for `addr` with short timeouts.
pub async fn client(addr: SocketAddr, community: &[u8]) -> Client {
    Client::v2c(addr.to_string())
        .community(community)
        .timeout(Duration::from_millis(500))
        .retries(1)
        .connect()
        .await
        .expect("failed to connect client")
}

/// GetNext from `root` until the walk leaves it or the agent runs out.
pub async fn walk(client: &Client, root: &Oid) -> Vec<VarBind> {
    let mut out = Vec::new();
    let mut cursor = root.clone();
    loop {
        match client.get_next(&cursor).await {
            Ok(vb) if vb.oid.starts_with(root) => {
                assert!(vb.oid > cursor, "walk went backwards: {} after {}", vb.oid, cursor);
                cursor = vb.oid.clone();
                out.push(vb);
            }
            Ok(_) => break,
            Err(Error::Snmp {
                status: ErrorStatus::NoSuchName,
                ..
            }) => break,
            Err(e) => panic!("walk of {root} failed: {e}"),
        }
    }
    out
}

// =============================================================================
// In-memory remote agent
// =============================================================================

/// A remote agent answering Get and GetNext from a sorted map, without a
/// network round trip.
#[derive(Debug, Clone, Default)]
pub struct MemoryAgent(pub BTreeMap<Oid, Value>);

impl RemoteAgent for MemoryAgent {
    fn get<'a>(&'a self, oid: &'a Oid) -> BoxFuture<'a, snmp_mib_agent::Result<VarBind>> {
        let value = self.0.get(oid).cloned().unwrap_or(Value::NoSuchObject);
        Box::pin(async move { Ok(VarBind::new(oid.clone(), value)) })
    }

    fn get_next<'a>(&'a self, oid: &'a Oid) -> BoxFuture<'a, snmp_mib_agent::Result<VarBind>> {
        let next = self
            .0
            .range((Bound::Excluded(oid.clone()), Bound::Unbounded))
            .next()
            .map(|(k, v)| VarBind::new(k.clone(), v.clone()))
            .unwrap_or_else(|| VarBind::new(oid.clone(), Value::EndOfMibView));
        Box::pin(async move { Ok(next) })
    }
}

/// Send one raw request and wait briefly for the reply, decoded.
///
/// `None` when the agent stays silent.
pub async fn exchange(addr: SocketAddr, request: &CommunityMessage) -> Option<CommunityMessage> {
    let socket = tokio::net::UdpSocket::bind("127.0.0.1:0")
        .await
        .expect("failed to bind socket");
    socket
        .send_to(&request.encode(), addr)
        .await
        .expect("failed to send request");
    let mut buf = vec![0u8; 65535];
    let (len, _) = tokio::time::timeout(Duration::from_millis(300), socket.recv_from(&mut buf))
        .await
        .ok()?
        .expect("recv failed");
    Some(CommunityMessage::decode(Bytes::copy_from_slice(&buf[..len])).expect("undecodable reply"))
}
