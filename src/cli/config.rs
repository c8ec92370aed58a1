//! JSON configuration file.
//!
//! ```json
//! {
//!   "bind": "0.0.0.0:161",
//!   "max_packet": 8000,
//!   "communities": ["public"],
//!   "sys_contact": "noc@example.net",
//!   "sys_location": "rack 4",
//!   "values": {
//!     "enterprises.99999.1": [1, 1, 2, 3, 5, 8, 13],
//!     "enterprises.99999.2": {"1": ["eth0", "up"], "7": ["eth1", "down"]}
//!   },
//!   "proxies": [
//!     {"oid": "enterprises.99999.3", "host": "10.0.0.2", "port": 161}
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use super::names;
use crate::agent::{Agent, AgentBuilder, SystemInfo};
use crate::client::Client;
use crate::mib::PluginData;
use crate::util::host_port;
use crate::value::Value;

/// Errors loading or applying a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {oid}: {reason}")]
    Value { oid: String, reason: String },

    #[error(transparent)]
    Agent(#[from] crate::Error),
}

/// Agent settings as read from a file and the command line.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub max_packet: Option<usize>,
    pub communities: Vec<String>,
    pub sys_contact: Option<String>,
    pub sys_name: Option<String>,
    pub sys_location: Option<String>,
    pub system_group: Option<bool>,
    /// Seconds to hold off re-running a failed plugin.
    pub plugin_failure_backoff: Option<u64>,
    /// Constant subtrees keyed by mount OID.
    pub values: BTreeMap<String, serde_json::Value>,
    pub proxies: Vec<ProxyConfig>,
}

/// A subtree forwarded to another agent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProxyConfig {
    pub oid: String,
    pub host: String,
    #[serde(default = "default_proxy_port")]
    pub port: u16,
    /// Community used toward the remote agent (default `public`).
    #[serde(default)]
    pub community: Option<String>,
}

fn default_proxy_port() -> u16 {
    crate::agent::DEFAULT_PORT
}

impl AgentConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// An [`AgentBuilder`] carrying the listening and system settings.
    pub fn builder(&self) -> AgentBuilder {
        let mut builder = Agent::builder();
        if let Some(bind) = &self.bind {
            builder = builder.bind(bind.clone());
        }
        if let Some(port) = self.port {
            builder = builder.port(port);
        }
        if let Some(max_packet) = self.max_packet {
            builder = builder.max_message_size(max_packet);
        }
        for community in &self.communities {
            builder = builder.community(community);
        }
        if let Some(enabled) = self.system_group {
            builder = builder.system_group(enabled);
        }
        if let Some(secs) = self.plugin_failure_backoff {
            builder = builder.plugin_failure_backoff(Duration::from_secs(secs));
        }

        let mut info = SystemInfo::default();
        if let Some(contact) = &self.sys_contact {
            info.contact = contact.clone();
        }
        if let Some(name) = &self.sys_name {
            info.name = name.clone();
        }
        if let Some(location) = &self.sys_location {
            info.location = location.clone();
        }
        builder.system_info(info)
    }

    /// Register the configured values and proxies on `agent`.
    pub async fn register(&self, agent: &mut Agent) -> Result<(), ConfigError> {
        for (key, json) in &self.values {
            let oid = names::resolve(key)?;
            let data = json_to_data(json).map_err(|reason| ConfigError::Value {
                oid: key.clone(),
                reason,
            })?;
            let name = names::describe(&oid);
            tracing::debug!(
                target: "snmp_mib_agent::cli",
                {
                    snmp.oid = %oid,
                    name = name.as_deref().unwrap_or("-")
                },
                "configured value"
            );
            agent.add_value(oid, data)?;
        }

        for proxy in &self.proxies {
            let oid = names::resolve(&proxy.oid)?;
            let name = names::describe(&oid);
            tracing::debug!(
                target: "snmp_mib_agent::cli",
                {
                    snmp.oid = %oid,
                    name = name.as_deref().unwrap_or("-")
                },
                "configured proxy"
            );
            match &proxy.community {
                None => agent.add_proxy(oid, &proxy.host, proxy.port).await?,
                Some(community) => {
                    let target = host_port(&proxy.host, proxy.port);
                    let client = Client::v2c(target.as_str())
                        .community(community.as_bytes())
                        .connect()
                        .await?;
                    agent.add_proxy_client(oid, target, client)?;
                }
            }
        }
        Ok(())
    }
}

/// Map a JSON value onto plugin data.
///
/// Integers that fit in 32 bits become `Integer`; other numbers, strings and
/// booleans become `OctetString`. Objects must be keyed by arcs.
pub fn json_to_data(json: &serde_json::Value) -> Result<PluginData, String> {
    use serde_json::Value as Json;

    Ok(match json {
        Json::Null => PluginData::Absent,
        Json::Bool(b) => PluginData::Value(Value::from(b.to_string())),
        Json::Number(n) => match n.as_i64().and_then(|n| i32::try_from(n).ok()) {
            Some(n) => PluginData::Value(Value::Integer(n)),
            None => PluginData::Value(Value::from(n.to_string())),
        },
        Json::String(s) => PluginData::Value(Value::from(s.as_str())),
        Json::Array(items) => {
            PluginData::List(items.iter().map(json_to_data).collect::<Result<_, _>>()?)
        }
        Json::Object(fields) => {
            let mut map = BTreeMap::new();
            for (key, value) in fields {
                let arc: u32 = key
                    .parse()
                    .map_err(|_| format!("object key {key:?} is not an arc"))?;
                map.insert(arc, json_to_data(value)?);
            }
            PluginData::Map(map)
        }
    })
}
