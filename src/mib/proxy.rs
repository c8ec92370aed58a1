//! Subtrees served by another SNMP agent.

use tracing::Instrument;

use super::BoxFuture;
use super::node::Lookup;
use crate::error::{Error, ErrorStatus, Result};
use crate::oid::Oid;
use crate::value::Value;
use crate::varbind::VarBind;

/// The remote end of a [`Proxy`].
///
/// [`Client`](crate::client::Client) implements this; tests and embedders can
/// substitute anything that answers Get and GetNext for a single OID.
pub trait RemoteAgent: Send + Sync {
    fn get<'a>(&'a self, oid: &'a Oid) -> BoxFuture<'a, Result<VarBind>>;

    fn get_next<'a>(&'a self, oid: &'a Oid) -> BoxFuture<'a, Result<VarBind>>;
}

/// A mount point forwarding everything below `base` to a remote agent.
///
/// The proxy is always a leaf of the local tree. Remote failures never
/// escape: they are logged and the OID reads as absent.
pub struct Proxy {
    base: Oid,
    target: Box<str>,
    remote: Box<dyn RemoteAgent>,
}

impl Proxy {
    /// Mount `remote` at `base`. `target` names the remote in logs.
    pub fn new(
        base: Oid,
        target: impl Into<Box<str>>,
        remote: impl RemoteAgent + 'static,
    ) -> Self {
        Self::from_boxed(base, target.into(), Box::new(remote))
    }

    pub fn from_boxed(base: Oid, target: Box<str>, remote: Box<dyn RemoteAgent>) -> Self {
        Self {
            base,
            target,
            remote,
        }
    }

    pub fn base(&self) -> &Oid {
        &self.base
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Opened while the request is polled, under whichever dispatcher is
    /// serving it.
    fn span(&self) -> tracing::Span {
        tracing::debug_span!(
            target: "snmp_mib_agent::proxy",
            "proxy",
            snmp.oid = %self.base,
            snmp.target = %self.target,
        )
    }

    fn report(&self, oid: &Oid, err: Error) {
        // v1 agents signal absence with a noSuchName error status
        if let Error::Snmp {
            status: ErrorStatus::NoSuchName,
            ..
        } = err
        {
            tracing::debug!(target: "snmp_mib_agent::proxy", { snmp.oid = %oid }, "remote reports noSuchName");
            return;
        }
        let err = Error::RemoteProxy {
            oid: oid.clone(),
            target: self.target.clone(),
            source: Box::new(err),
        };
        tracing::warn!(target: "snmp_mib_agent::proxy", { snmp.oid = %oid, error = %err }, "proxy request failed");
    }

    /// Remote Get of `base + rest`.
    pub fn lookup<'a>(&'a self, rest: &'a [u32]) -> BoxFuture<'a, Lookup> {
        let fut = async move {
            let oid = self.base.concat(rest);
            match self.remote.get(&oid).await {
                Ok(vb) if vb.value.is_exception() => Lookup::NoEntry,
                Ok(vb) => Lookup::Value(vb.value),
                Err(err) => {
                    self.report(&oid, err);
                    Lookup::NoEntry
                }
            }
        };
        Box::pin(async move { fut.instrument(self.span()).await })
    }

    /// Remote GetNext of `base + rest`, relative to `base`.
    ///
    /// Answers that leave the mounted subtree end the local walk here; the
    /// remote's other subtrees are not this proxy's to serve.
    pub fn next_oid<'a>(&'a self, rest: &'a [u32]) -> BoxFuture<'a, Option<Vec<u32>>> {
        let fut = async move {
            let oid = self.base.concat(rest);
            match self.remote.get_next(&oid).await {
                Ok(VarBind {
                    value: Value::EndOfMibView,
                    ..
                }) => None,
                Ok(vb) if vb.oid.starts_with(&self.base) && vb.oid > oid => {
                    Some(vb.oid.arcs()[self.base.len()..].to_vec())
                }
                Ok(vb) => {
                    tracing::debug!(target: "snmp_mib_agent::proxy", { snmp.oid = %oid, next = %vb.oid }, "remote walk left the mount");
                    None
                }
                Err(err) => {
                    self.report(&oid, err);
                    None
                }
            }
        };
        Box::pin(async move { fut.instrument(self.span()).await })
    }

    /// First remote OID under the mount.
    pub fn left_path(&self) -> BoxFuture<'_, Option<Vec<u32>>> {
        self.next_oid(&[])
    }
}

impl std::fmt::Debug for Proxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proxy")
            .field("base", &self.base)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}
