//! The MIB tree.
//!
//! A [`MibNode`] maps arcs to [`Entry`] values: plain scalars, nested nodes,
//! [`Plugin`]s that compute their contents on demand, and [`Proxy`] mounts that
//! forward to another agent. Lookup and GetNext walk all four uniformly, so a
//! walk crosses plugin and proxy boundaries without the caller noticing.
//!
//! # Example
//!
//! ```rust
//! use snmp_mib_agent::mib::{Entry, Lookup, MibNode, Plugin};
//! use snmp_mib_agent::{Value, oid};
//!
//! # async fn example() -> snmp_mib_agent::Result<()> {
//! let mut tree = MibNode::new();
//! let fib = oid!(1, 2, 3);
//! tree.register(&fib, Entry::Plugin(Plugin::new(fib.clone(), || Ok(vec![1, 1, 2, 3, 5, 8, 13]))))?;
//!
//! assert_eq!(tree.lookup(&[1, 2, 3, 4]).await, Lookup::Value(Value::Integer(5)));
//! assert_eq!(tree.next_oid(&[1, 2, 3, 4]).await, Some(vec![1, 2, 3, 5]));
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::pin::Pin;

mod node;
mod plugin;
mod proxy;

pub use node::{Entry, Lookup, MibNode};
pub use plugin::{Plugin, PluginData, PluginError, PluginOutput};
pub use proxy::{Proxy, RemoteAgent};

/// Boxed future returned by tree operations and [`RemoteAgent`] methods.
///
/// Tree walks recurse through nodes and may wait on a remote agent, so the
/// futures are boxed to give them a nameable, object-safe type.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
