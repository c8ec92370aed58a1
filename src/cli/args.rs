//! Command-line arguments for `snmp-mib-agent`.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser};
use tracing_subscriber::EnvFilter;

use super::config::AgentConfig;

/// Serve a MIB tree of constant values and proxied subtrees over SNMP.
#[derive(Debug, Parser)]
#[command(name = "snmp-mib-agent", version, about)]
pub struct AgentArgs {
    /// JSON configuration file. Flags given on the command line win.
    #[arg(short = 'f', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:161 or [::]:161.
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,

    /// UDP port, overriding the port of --bind.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Largest datagram received or sent, in bytes.
    #[arg(long, value_name = "BYTES")]
    pub max_packet: Option<usize>,

    /// Community to accept. Repeat to accept several; none accepts all.
    #[arg(short, long = "community", value_name = "COMMUNITY")]
    pub communities: Vec<String>,

    /// sysContact.0
    #[arg(long, value_name = "TEXT")]
    pub sys_contact: Option<String>,

    /// sysName.0
    #[arg(long, value_name = "TEXT")]
    pub sys_name: Option<String>,

    /// sysLocation.0
    #[arg(long, value_name = "TEXT")]
    pub sys_location: Option<String>,

    /// Do not serve the MIB-2 system group.
    #[arg(long)]
    pub no_system_group: bool,

    #[command(flatten)]
    pub log: LogArgs,
}

impl AgentArgs {
    /// Overlay the flags that were given onto `config`.
    pub fn merge_into(&self, mut config: AgentConfig) -> AgentConfig {
        if let Some(bind) = &self.bind {
            config.bind = Some(bind.clone());
        }
        if let Some(port) = self.port {
            config.port = Some(port);
        }
        if let Some(max_packet) = self.max_packet {
            config.max_packet = Some(max_packet);
        }
        if !self.communities.is_empty() {
            config.communities = self.communities.clone();
        }
        if let Some(contact) = &self.sys_contact {
            config.sys_contact = Some(contact.clone());
        }
        if let Some(name) = &self.sys_name {
            config.sys_name = Some(name.clone());
        }
        if let Some(location) = &self.sys_location {
            config.sys_location = Some(location.clone());
        }
        if self.no_system_group {
            config.system_group = Some(false);
        }
        config
    }
}

/// Logging flags.
#[derive(Debug, Args)]
pub struct LogArgs {
    /// More logging: -v for debug, -vv for trace. Without it RUST_LOG applies.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl LogArgs {
    /// Install a stderr `tracing` subscriber.
    pub fn init_tracing(&self) {
        let filter = match self.verbose {
            0 => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("snmp_mib_agent=info")),
            1 => EnvFilter::new("snmp_mib_agent=debug"),
            _ => EnvFilter::new("snmp_mib_agent=trace"),
        };

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
