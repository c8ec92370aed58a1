//! The MIB-2 system group (RFC 1213), served as a plugin.

use std::collections::BTreeMap;

use tokio::time::Instant;

use crate::mib::{Plugin, PluginData};
use crate::oid::Oid;
use crate::value::Value;

/// `system` in MIB-2: 1.3.6.1.2.1.1.
pub const SYSTEM_OID: [u32; 7] = [1, 3, 6, 1, 2, 1, 1];

/// Strings served under the system group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInfo {
    /// sysDescr.0
    pub descr: String,
    /// sysContact.0
    pub contact: String,
    /// sysName.0
    pub name: String,
    /// sysLocation.0
    pub location: String,
}

impl Default for SystemInfo {
    fn default() -> Self {
        Self {
            descr: format!(
                "{} {} ({} {})",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION"),
                std::env::consts::OS,
                std::env::consts::ARCH
            ),
            contact: "Someone".into(),
            name: env!("CARGO_PKG_NAME").into(),
            location: "Unknown".into(),
        }
    }
}

impl SystemInfo {
    /// A plugin serving sysDescr, sysUpTime, sysContact, sysName and
    /// sysLocation, with uptime counted from `started`.
    pub fn into_plugin(self, started: Instant) -> Plugin {
        Plugin::new(Oid::from_slice(&SYSTEM_OID), move || {
            let mut group: BTreeMap<u32, PluginData> = BTreeMap::new();
            group.insert(1, vec![self.descr.clone()].into());
            group.insert(3, vec![Value::TimeTicks(uptime_ticks(started))].into());
            group.insert(4, vec![self.contact.clone()].into());
            group.insert(5, vec![self.name.clone()].into());
            group.insert(6, vec![self.location.clone()].into());
            Ok(group)
        })
    }
}

/// Hundredths of a second since `started`, wrapping like any TimeTicks.
fn uptime_ticks(started: Instant) -> u32 {
    (started.elapsed().as_millis() / 10) as u32
}
