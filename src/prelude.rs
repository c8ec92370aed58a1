//! Prelude module for convenient imports.
//!
//! # Usage
//!
//! ```rust,no_run
//! use snmp_mib_agent::prelude::*;
//! ```
//!
//! This imports:
//! - Agent types: [`Agent`], [`Plugin`], [`PluginData`], [`PluginOutput`]
//! - Core types: [`Client`], [`Oid`], [`Value`], [`VarBind`], [`Version`]
//! - Error handling: [`Error`], [`Result`]
//! - The [`oid!`] macro

pub use crate::agent::Agent;
pub use crate::client::Client;
pub use crate::error::{Error, Result};
pub use crate::mib::{Plugin, PluginData, PluginOutput};
pub use crate::oid::Oid;
pub use crate::value::Value;
pub use crate::varbind::VarBind;
pub use crate::version::Version;

#[doc(no_inline)]
pub use crate::oid;
