//! Guild availability and shard readiness tracking for a sharded chat bot, with a pipeline that
//! keeps consuming lifecycle events no matter what fails, and the plugin and guild configuration
//! extension points built on top of it.

use git_version::git_version;

pub mod core;
pub mod database;
pub mod error;
pub mod gateway;
pub mod plugins;
pub mod utils;

#[cfg(test)]
mod testing;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_VERSION: &str = git_version!(fallback = "unknown");
