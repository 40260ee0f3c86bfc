use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use log::debug;
use twilight_model::id::GuildId;

use crate::error::StartupError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandDescriptor {
    pub name: String,
    pub description: String,
}

impl CommandDescriptor {
    pub fn new(name: &str, description: &str) -> Self {
        CommandDescriptor {
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

/// The commands a plugin contributes.
#[derive(Clone, Debug, Default)]
pub struct CommandProvider {
    commands: Vec<CommandDescriptor>,
}

impl CommandProvider {
    pub fn new() -> Self {
        CommandProvider::default()
    }

    pub fn add(&mut self, command: CommandDescriptor) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[CommandDescriptor] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Command bookkeeping shared with the command layer: which plugin owns a command, the
/// per guild prefix cache and the blacklist of ids that may not use commands.
#[derive(Default)]
pub struct CommandKernel {
    commands: DashMap<String, String>,
    prefixes: DashMap<GuildId, String>,
    blacklist: DashSet<u64>,
}

impl CommandKernel {
    pub fn new() -> Self {
        CommandKernel::default()
    }

    pub fn register_provider(&self, plugin: &str, provider: &CommandProvider) -> Result<(), StartupError> {
        for command in provider.commands() {
            match self.commands.entry(command.name.to_lowercase()) {
                Entry::Occupied(existing) => {
                    return Err(StartupError::DuplicateCommand {
                        name: command.name.clone(),
                        plugin: existing.get().clone(),
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(plugin.to_string());
                }
            }
        }
        debug!("Registered {} commands for plugin {}", provider.commands().len(), plugin);
        Ok(())
    }

    pub fn owner(&self, command: &str) -> Option<String> {
        self.commands
            .get(&command.to_lowercase())
            .map(|plugin| plugin.value().clone())
    }

    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    pub fn cached_prefix(&self, guild: GuildId) -> Option<String> {
        self.prefixes.get(&guild).map(|prefix| prefix.value().clone())
    }

    pub fn cache_prefix(&self, guild: GuildId, prefix: &str) {
        self.prefixes.insert(guild, prefix.to_string());
    }

    /// Drops the cached prefix so the next lookup reads the stored settings again.
    pub fn invalidate_cached_prefix_for_guild(&self, guild: GuildId) -> bool {
        self.prefixes.remove(&guild).is_some()
    }

    pub fn blacklist(&self, id: u64) -> bool {
        self.blacklist.insert(id)
    }

    pub fn unblacklist(&self, id: u64) -> bool {
        self.blacklist.remove(&id).is_some()
    }

    pub fn is_blacklisted(&self, id: u64) -> bool {
        self.blacklist.contains(&id)
    }
}
