//! Plugins extend the bot with commands, guild settings and a hook that runs once the bot is ready.

use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub use command::{CommandDescriptor, CommandKernel, CommandProvider};
pub use config_entry::{ConfigEntry, ConfigEntryRegistry, GuildSettingsEntry, InputFunction, OutputFunction};
pub use core_plugin::CorePlugin;
pub use lifecycle::{PluginLifecycleCoordinator, ReadyReport};
pub use properties::PropertyParser;
pub use registry::{InstalledPlugins, PluginRegistry};

use crate::core::Bot;
use crate::error::PluginError;

pub mod command;
pub mod config_entry;
mod core_plugin;
mod lifecycle;
mod properties;
mod registry;

pub type PluginFuture<'a> = Pin<Box<dyn Future<Output = Result<(), PluginError>> + Send + 'a>>;

pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// Runs once at startup, before any events are processed. An error aborts the startup.
    fn setup<'a>(&'a mut self, bot: &'a Arc<Bot>, properties: &'a PropertyParser) -> PluginFuture<'a>;

    /// Runs once every shard finished its initial sync. Failures are logged and otherwise ignored.
    fn on_bot_ready<'a>(&'a self, bot: &'a Arc<Bot>) -> PluginFuture<'a>;

    fn database_mapping_resources(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }

    fn guild_configuration_entries(&self) -> Vec<(String, ConfigEntry)> {
        Vec::new()
    }

    fn command_provider(&self) -> &CommandProvider;
}
