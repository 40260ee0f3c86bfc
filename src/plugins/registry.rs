use std::collections::BTreeSet;
use std::sync::Arc;

use log::info;

use super::{ConfigEntryRegistry, Plugin, PropertyParser};
use crate::core::Bot;
use crate::error::StartupError;

/// Plugins in registration order, waiting to be set up.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn Plugin>>,
}

/// Everything the plugins contributed during setup.
pub struct InstalledPlugins {
    pub plugins: Vec<Arc<dyn Plugin>>,
    pub config_entries: ConfigEntryRegistry,
    pub resources: BTreeSet<String>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        PluginRegistry::default()
    }

    pub fn register<P: Plugin + 'static>(&mut self, plugin: P) -> Result<(), StartupError> {
        if self.plugins.iter().any(|existing| existing.name() == plugin.name()) {
            return Err(StartupError::DuplicatePlugin(plugin.name().to_string()));
        }
        self.plugins.push(Box::new(plugin));
        Ok(())
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|plugin| plugin.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Sets up every plugin in order and collects their commands, config entries and storage
    /// resources. The first failure aborts the whole startup.
    pub async fn setup(self, bot: &Arc<Bot>) -> Result<InstalledPlugins, StartupError> {
        let mut config_entries = ConfigEntryRegistry::new(bot.settings.clone());
        let mut resources = BTreeSet::new();
        let mut plugins = Vec::with_capacity(self.plugins.len());

        for mut plugin in self.plugins {
            let name = plugin.name().to_string();
            let properties = PropertyParser::new(&name, bot.config.plugin_properties(&name));
            plugin
                .setup(bot, &properties)
                .await
                .map_err(|error| StartupError::PluginSetup {
                    plugin: name.clone(),
                    error,
                })?;

            for (key, entry) in plugin.guild_configuration_entries() {
                config_entries.register(&key, entry)?;
            }
            bot.kernel.register_provider(&name, plugin.command_provider())?;
            resources.extend(plugin.database_mapping_resources());

            info!("Plugin {} loaded", name);
            plugins.push(Arc::from(plugin));
        }

        Ok(InstalledPlugins {
            plugins,
            config_entries,
            resources,
        })
    }
}
