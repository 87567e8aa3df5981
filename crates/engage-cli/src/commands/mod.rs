//! Command handler modules for engage-cli.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod db;
pub mod queue;
pub mod run;
pub mod throttle;

use anyhow::{anyhow, Result};
use engage_schemas::Channel;

/// Parse a CLI `--channel` string into a [`Channel`].
pub fn parse_channel(s: &str) -> Result<Channel> {
    Channel::parse(s).ok_or_else(|| anyhow!("invalid --channel '{s}'. expected one of: email | call | linkedin"))
}
