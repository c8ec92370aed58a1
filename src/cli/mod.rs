//! Command-line support for the `snmp-mib-agent` binary.
//!
//! Argument parsing, the JSON configuration file, and symbolic names for
//! common mount points.
//!
//! This module is only available with the `cli` feature.

pub mod args;
pub mod config;
pub mod names;
