use dashmap::DashMap;
use twilight_model::id::{GuildId, RoleId};

use crate::utils::matchers;

/// Turns user input into a role of a guild.
pub trait RoleResolver: Send + Sync {
    fn resolve(&self, guild: GuildId, input: &str) -> Option<RoleId>;

    fn role_name(&self, guild: GuildId, role: RoleId) -> Option<String>;
}

/// Known roles per guild, filled from whatever feeds the bot its guild data.
#[derive(Default)]
pub struct RoleDirectory {
    roles: DashMap<GuildId, DashMap<RoleId, String>>,
}

impl RoleDirectory {
    pub fn new() -> Self {
        RoleDirectory::default()
    }

    pub fn insert_role(&self, guild: GuildId, role: RoleId, name: &str) {
        self.roles.entry(guild).or_default().insert(role, name.to_string());
    }

    pub fn remove_guild(&self, guild: GuildId) {
        self.roles.remove(&guild);
    }
}

impl RoleResolver for RoleDirectory {
    /// Accepts an id, a role mention or the exact (case insensitive) role name.
    fn resolve(&self, guild: GuildId, input: &str) -> Option<RoleId> {
        let roles = self.roles.get(&guild)?;
        if let Some(id) = matchers::get_role_id(input) {
            let role = RoleId(id);
            return if roles.contains_key(&role) { Some(role) } else { None };
        }

        let wanted = input.trim();
        let found = roles
            .iter()
            .find(|entry| entry.value().eq_ignore_ascii_case(wanted))
            .map(|entry| *entry.key());
        found
    }

    fn role_name(&self, guild: GuildId, role: RoleId) -> Option<String> {
        self.roles
            .get(&guild)
            .and_then(|roles| roles.get(&role).map(|name| name.value().clone()))
    }
}
