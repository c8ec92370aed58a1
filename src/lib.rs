#![allow(clippy::result_large_err)]

//! # snmp-mib-agent
//!
//! An async SNMP v1/v2c agent that serves a MIB tree assembled from plugins
//! and proxies.
//!
//! - A **plugin** is a producer function mounted at an OID. Whatever it
//!   returns (a value, a list, a sparse map, nested combinations) becomes the
//!   subtree under that OID, and may be cached for a duration the producer
//!   chooses.
//! - A **proxy** forwards a subtree to another SNMP agent, so a walk passes
//!   through the remote agent's objects as if they were local.
//!
//! The agent answers Get and GetNext requests, which is enough for `snmpget`
//! and `snmpwalk`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::collections::BTreeMap;
//! use std::time::Duration;
//!
//! use snmp_mib_agent::mib::PluginOutput;
//! use snmp_mib_agent::{Agent, oid};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), snmp_mib_agent::Error> {
//!     let mut agent = Agent::builder().bind("0.0.0.0:1161").build().await?;
//!
//!     // 1.3.6.1.4.1.99999.1.<n> = n-th Fibonacci number
//!     agent.add_plugin(oid!(1, 3, 6, 1, 4, 1, 99999, 1), || {
//!         Ok(vec![1, 1, 2, 3, 5, 8, 13, 21])
//!     })?;
//!
//!     // A sparse table, recomputed at most every 10 seconds
//!     agent.add_plugin(oid!(1, 3, 6, 1, 4, 1, 99999, 2), || {
//!         let mut table = BTreeMap::new();
//!         table.insert(1u32, vec!["eth0", "up"]);
//!         table.insert(7u32, vec!["eth1", "down"]);
//!         Ok(PluginOutput::from(table).cache_for(Duration::from_secs(10)))
//!     })?;
//!
//!     agent.run().await
//! }
//! ```
//!
//! ## Logging
//!
//! The crate logs through [`tracing`] under `snmp_mib_agent::*` targets
//! (`agent`, `plugin`, `proxy`, `client`, `transport`, `ber`). Install any
//! subscriber to see them, or give the agent its own with
//! [`AgentBuilder::log_dispatch`].

pub mod agent;
pub mod ber;
pub mod client;
pub mod error;
pub mod message;
pub mod mib;
pub mod oid;
pub mod pdu;
pub mod prelude;
pub mod transport;
pub mod value;
pub mod varbind;
pub mod version;

pub(crate) mod util;

#[cfg(feature = "cli")]
pub mod cli;

pub use agent::{Agent, AgentBuilder, CommunityPolicy, SystemInfo};
pub use client::{Client, ClientBuilder, ClientConfig};
pub use error::{DecodeErrorKind, Error, ErrorStatus, OidErrorKind, Result};
pub use message::CommunityMessage;
pub use mib::{
    BoxFuture, Entry, Lookup, MibNode, Plugin, PluginData, PluginError, PluginOutput, Proxy,
    RemoteAgent,
};
pub use oid::Oid;
pub use pdu::{Pdu, PduType};
pub use transport::{Transport, UdpTransport};
pub use value::Value;
pub use varbind::VarBind;
pub use version::Version;
