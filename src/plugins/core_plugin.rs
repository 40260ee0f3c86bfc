use std::collections::BTreeSet;
use std::fs;
use std::sync::Arc;

use log::{debug, info};

use super::config_entry::{from_role_id, string_value, to_role_id};
use super::{
    CommandDescriptor, CommandProvider, ConfigEntry, GuildSettingsEntry, InputFunction, Plugin, PluginFuture,
    PropertyParser,
};
use crate::core::Bot;

const COMMANDS: &[(&str, &str)] = &[
    ("help", "Lists the available commands or explains one of them"),
    ("ping", "Checks the latency of the bot"),
    ("setup", "Views or changes the configuration of this server"),
    ("system", "Bot administration tools"),
    ("about", "Shows information about the bot"),
    ("botadmins", "Manages the bot administrators"),
    ("blacklist", "Prevents a user, channel or server from using commands"),
    ("cacheinfo", "Shows how much is cached"),
];

const RESOURCES: &[&str] = &["native_guild_settings", "bot_admins", "blacklisted_ids"];

/// Built in commands and settings every deployment has.
#[derive(Default)]
pub struct CorePlugin {
    about_text: Option<String>,
    commands: CommandProvider,
    config_entries: Vec<(String, ConfigEntry)>,
}

impl CorePlugin {
    pub fn new() -> Self {
        CorePlugin::default()
    }

    /// Text for the about command, read from the `about_file` property during setup.
    pub fn about_text(&self) -> Option<&str> {
        self.about_text.as_deref()
    }

    fn build_config_entries(bot: &Arc<Bot>) -> Vec<(String, ConfigEntry)> {
        let kernel = bot.kernel.clone();
        let prefix = GuildSettingsEntry::new(
            |settings| settings.prefix.clone(),
            |settings, prefix| settings.prefix = prefix,
            InputFunction::as_is().with_input_check(|prefix: &String| !prefix.trim().is_empty(), "Cannot be blank"),
            string_value(),
        )
        .after_commit(move |guild| {
            kernel.invalidate_cached_prefix_for_guild(guild);
        });

        let server_mod_role = GuildSettingsEntry::new(
            |settings| settings.server_mod_role,
            |settings, role| settings.server_mod_role = role,
            to_role_id(bot.roles.clone()),
            from_role_id(bot.roles.clone()),
        );

        vec![
            (String::from("prefix"), prefix.into_entry()),
            (String::from("server_mod_role"), server_mod_role.into_entry()),
        ]
    }
}

impl Plugin for CorePlugin {
    fn name(&self) -> &str {
        "Core"
    }

    fn setup<'a>(&'a mut self, bot: &'a Arc<Bot>, properties: &'a PropertyParser) -> PluginFuture<'a> {
        Box::pin(async move {
            if let Some(path) = properties.get("about_file") {
                let about = fs::read_to_string(path)?;
                self.about_text = Some(about.trim_end().to_string());
                debug!("Loaded the about text from {}", path);
            }

            let mut commands = CommandProvider::new();
            for (name, description) in COMMANDS {
                commands.add(CommandDescriptor::new(name, description));
            }
            self.commands = commands;
            self.config_entries = Self::build_config_entries(bot);
            Ok(())
        })
    }

    fn on_bot_ready<'a>(&'a self, bot: &'a Arc<Bot>) -> PluginFuture<'a> {
        Box::pin(async move {
            let ids = bot.blacklist.blacklisted_ids().await?;
            for id in &ids {
                bot.kernel.blacklist(*id);
            }
            info!("Loaded {} blacklisted ids", ids.len());
            Ok(())
        })
    }

    fn database_mapping_resources(&self) -> BTreeSet<String> {
        RESOURCES.iter().map(|resource| resource.to_string()).collect()
    }

    fn guild_configuration_entries(&self) -> Vec<(String, ConfigEntry)> {
        self.config_entries.clone()
    }

    fn command_provider(&self) -> &CommandProvider {
        &self.commands
    }
}
