//! Computed, cached subtrees.
//!
//! A [`Plugin`] wraps a producer closure. The closure runs lazily when the
//! plugin is walked and its previous result has expired; the result is turned
//! into a [`MibNode`] (or a single value) and kept until the next expiry.
//!
//! ```rust
//! use std::time::Duration;
//! use snmp_mib_agent::mib::{Plugin, PluginOutput};
//! use snmp_mib_agent::oid;
//!
//! // .0 = 3, .1 = 1, .2 = 4; recomputed at most every 30 seconds
//! let plugin = Plugin::new(oid!(1, 3, 6, 1, 4, 1, 99999), || {
//!     Ok(PluginOutput::new(vec![3, 1, 4]).cache_for(Duration::from_secs(30)))
//! });
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::time::Instant;

use super::BoxFuture;
use super::node::{Entry, Lookup, MibNode};
use crate::error::Error;
use crate::oid::Oid;
use crate::value::Value;

/// Error a producer may return.
pub type PluginError = Box<dyn std::error::Error + Send + Sync>;

/// Cache window used for results that never change (about 30 years).
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

type Producer = Box<dyn FnMut() -> Result<PluginOutput, PluginError> + Send>;

/// Shape of a producer's result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginData {
    /// A single value; the plugin's own OID names it.
    Value(Value),
    /// Elements indexed from 0.
    List(Vec<PluginData>),
    /// Elements at explicit arcs.
    Map(BTreeMap<u32, PluginData>),
    /// Nothing. Inside a list or map this leaves a gap.
    Absent,
}

/// A producer's result together with how long it stays valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginOutput {
    pub data: PluginData,
    /// Keep the result this long; `None` recomputes on every access.
    pub cache_for: Option<Duration>,
}

impl PluginOutput {
    pub fn new(data: impl Into<PluginData>) -> Self {
        Self {
            data: data.into(),
            cache_for: None,
        }
    }

    pub fn cache_for(mut self, duration: Duration) -> Self {
        self.cache_for = Some(duration);
        self
    }
}

impl From<Value> for PluginData {
    fn from(value: Value) -> Self {
        PluginData::Value(value)
    }
}

impl From<i32> for PluginData {
    fn from(v: i32) -> Self {
        PluginData::Value(Value::Integer(v))
    }
}

impl From<&str> for PluginData {
    fn from(s: &str) -> Self {
        PluginData::Value(Value::from(s))
    }
}

impl From<String> for PluginData {
    fn from(s: String) -> Self {
        PluginData::Value(Value::from(s))
    }
}

impl<T: Into<PluginData>> From<Vec<T>> for PluginData {
    fn from(items: Vec<T>) -> Self {
        PluginData::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<PluginData>> From<BTreeMap<u32, T>> for PluginData {
    fn from(items: BTreeMap<u32, T>) -> Self {
        PluginData::Map(items.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T: Into<PluginData>> From<Option<T>> for PluginData {
    fn from(item: Option<T>) -> Self {
        item.map_or(PluginData::Absent, Into::into)
    }
}

macro_rules! output_from {
    ($($ty:ty),*) => {$(
        impl From<$ty> for PluginOutput {
            fn from(data: $ty) -> Self {
                PluginOutput::new(data)
            }
        }
    )*};
}

output_from!(PluginData, Value, i32, &str, String);

impl<T: Into<PluginData>> From<Vec<T>> for PluginOutput {
    fn from(items: Vec<T>) -> Self {
        PluginOutput::new(items)
    }
}

impl<T: Into<PluginData>> From<BTreeMap<u32, T>> for PluginOutput {
    fn from(items: BTreeMap<u32, T>) -> Self {
        PluginOutput::new(items)
    }
}

impl<T: Into<PluginData>> From<Option<T>> for PluginOutput {
    fn from(item: Option<T>) -> Self {
        PluginOutput::new(item)
    }
}

/// What the last producer call turned into.
enum Materialized {
    Absent,
    Scalar(Value),
    Node(MibNode),
}

impl Materialized {
    fn from_data(data: PluginData) -> Self {
        match data {
            PluginData::Absent => Materialized::Absent,
            PluginData::Value(v) => Materialized::Scalar(v),
            PluginData::List(items) => Materialized::Node(build_node((0..).zip(items))),
            PluginData::Map(items) => Materialized::Node(build_node(items)),
        }
    }
}

/// Build a node from indexed elements, dropping gaps and empty collections.
fn build_node(items: impl IntoIterator<Item = (u32, PluginData)>) -> MibNode {
    let mut node = MibNode::new();
    for (arc, data) in items {
        let entry = match data {
            PluginData::Absent => continue,
            PluginData::Value(v) => Entry::Scalar(v),
            PluginData::List(children) => Entry::SubTree(build_node((0..).zip(children))),
            PluginData::Map(children) => Entry::SubTree(build_node(children)),
        };
        if matches!(&entry, Entry::SubTree(child) if child.is_empty()) {
            continue;
        }
        node.insert(arc, entry);
    }
    node
}

/// A cached, producer-backed leaf of the MIB tree.
pub struct Plugin {
    oid: Oid,
    producer: Producer,
    current: Materialized,
    /// `None` means expired.
    cache_until: Option<Instant>,
    failure_backoff: Option<Duration>,
}

impl Plugin {
    /// Create a plugin mounted at `oid`.
    ///
    /// `oid` is only used to label logs; where the plugin actually lives is
    /// decided by the tree it is registered in.
    pub fn new<F, O>(oid: Oid, mut producer: F) -> Self
    where
        F: FnMut() -> Result<O, PluginError> + Send + 'static,
        O: Into<PluginOutput>,
    {
        Self {
            oid,
            producer: Box::new(move || producer().map(Into::into)),
            current: Materialized::Absent,
            cache_until: None,
            failure_backoff: None,
        }
    }

    /// A plugin that always produces `data`.
    pub fn constant(oid: Oid, data: impl Into<PluginData>) -> Self {
        let data = data.into();
        Self::new(oid, move || {
            Ok(PluginOutput::new(data.clone()).cache_for(FAR_FUTURE))
        })
    }

    /// Hold off re-running a failed producer for `backoff`.
    ///
    /// Without this a failing producer is retried on every access.
    pub fn with_failure_backoff(mut self, backoff: Duration) -> Self {
        self.failure_backoff = Some(backoff);
        self
    }

    pub fn oid(&self) -> &Oid {
        &self.oid
    }

    /// The current result, re-running the producer if the cache expired.
    fn value(&mut self) -> &mut Materialized {
        let now = Instant::now();
        if self.cache_until.is_some_and(|until| now <= until) {
            return &mut self.current;
        }

        let span = tracing::debug_span!(target: "snmp_mib_agent::plugin", "plugin", snmp.oid = %self.oid);
        let _enter = span.enter();
        match (self.producer)() {
            Ok(output) => {
                tracing::trace!(target: "snmp_mib_agent::plugin", cache_for = ?output.cache_for, "plugin refreshed");
                self.cache_until = output.cache_for.map(|d| expiry(now, d));
                self.current = Materialized::from_data(output.data);
            }
            Err(source) => {
                let err = Error::PluginExecution {
                    oid: self.oid.clone(),
                    source,
                };
                tracing::warn!(target: "snmp_mib_agent::plugin", { snmp.oid = %self.oid, error = %err }, "plugin producer failed");
                self.cache_until = self.failure_backoff.map(|d| expiry(now, d));
                self.current = Materialized::Absent;
            }
        }
        &mut self.current
    }

    pub fn lookup<'a>(&'a mut self, rest: &'a [u32]) -> BoxFuture<'a, Lookup> {
        Box::pin(async move {
            match self.value() {
                Materialized::Node(node) => node.lookup(rest).await,
                Materialized::Scalar(v) if rest.is_empty() => Lookup::Value(v.clone()),
                Materialized::Scalar(_) | Materialized::Absent => Lookup::NoEntry,
            }
        })
    }

    pub fn left_path(&mut self) -> BoxFuture<'_, Option<Vec<u32>>> {
        Box::pin(async move {
            match self.value() {
                Materialized::Node(node) => node.left_path().await,
                Materialized::Scalar(_) => Some(Vec::new()),
                Materialized::Absent => None,
            }
        })
    }

    pub fn next_oid<'a>(&'a mut self, rest: &'a [u32]) -> BoxFuture<'a, Option<Vec<u32>>> {
        Box::pin(async move {
            match self.value() {
                Materialized::Node(node) => node.next_oid(rest).await,
                Materialized::Scalar(_) | Materialized::Absent => None,
            }
        })
    }
}

fn expiry(now: Instant, window: Duration) -> Instant {
    now.checked_add(window).unwrap_or_else(|| now + FAR_FUTURE)
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("oid", &self.oid)
            .field("cache_until", &self.cache_until)
            .finish_non_exhaustive()
    }
}
