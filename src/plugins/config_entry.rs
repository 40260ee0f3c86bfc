//! Guild configuration entries: typed bindings onto [`GuildSettings`], looked up by key.
//!
//! A change goes through three separate steps. The raw input is validated and converted without
//! touching any settings. The converted value is written into the stored settings and saved.
//! Only after the save succeeded does the entry's commit hook run.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;

use log::debug;
use twilight_model::id::{GuildId, RoleId};

use crate::core::roles::RoleResolver;
use crate::core::GuildSettings;
use crate::database::SettingsStore;
use crate::error::{ConfigError, StartupError, ValidationError};

type InputFn<T> = dyn Fn(&str, GuildId) -> Result<T, ValidationError> + Send + Sync;
type OutputFn<T> = dyn Fn(&T, GuildId) -> String + Send + Sync;
type CommitHook = Box<dyn Fn(GuildId) + Send + Sync>;
type StagedChange = Box<dyn FnOnce(&mut GuildSettings) + Send>;

/// Validates and converts raw user input for a guild.
pub struct InputFunction<T> {
    convert: Arc<InputFn<T>>,
}

impl<T> Clone for InputFunction<T> {
    fn clone(&self) -> Self {
        InputFunction {
            convert: self.convert.clone(),
        }
    }
}

impl<T: 'static> InputFunction<T> {
    pub fn new<F>(convert: F) -> Self
    where
        F: Fn(&str, GuildId) -> Result<T, ValidationError> + Send + Sync + 'static,
    {
        InputFunction {
            convert: Arc::new(convert),
        }
    }

    pub fn apply(&self, raw: &str, guild: GuildId) -> Result<T, ValidationError> {
        (self.convert)(raw, guild)
    }

    /// Rejects converted values failing `check`, with `reason` as the message.
    pub fn with_input_check<P>(self, check: P, reason: &str) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let reason = reason.to_string();
        let convert = self.convert;
        InputFunction::new(move |raw, guild| {
            let value = convert(raw, guild)?;
            if check(&value) {
                Ok(value)
            } else {
                Err(ValidationError::new(reason.clone()))
            }
        })
    }
}

impl InputFunction<String> {
    pub fn as_is() -> Self {
        InputFunction::new(|raw, _| Ok(raw.to_string()))
    }
}

/// Resolves input to a role of the guild. `none` clears the value.
pub fn to_role_id(roles: Arc<dyn RoleResolver>) -> InputFunction<Option<RoleId>> {
    InputFunction::new(move |raw, guild| {
        if raw.trim().eq_ignore_ascii_case("none") {
            return Ok(None);
        }
        roles
            .resolve(guild, raw)
            .map(Some)
            .ok_or_else(|| ValidationError::new(format!("Unable to find a role matching ``{}``", raw.trim())))
    })
}

/// Formats a stored value for display.
pub struct OutputFunction<T> {
    format: Arc<OutputFn<T>>,
}

impl<T> Clone for OutputFunction<T> {
    fn clone(&self) -> Self {
        OutputFunction {
            format: self.format.clone(),
        }
    }
}

impl<T: 'static> OutputFunction<T> {
    pub fn new<F>(format: F) -> Self
    where
        F: Fn(&T, GuildId) -> String + Send + Sync + 'static,
    {
        OutputFunction {
            format: Arc::new(format),
        }
    }

    pub fn apply(&self, value: &T, guild: GuildId) -> String {
        (self.format)(value, guild)
    }
}

pub fn string_value<T: Display + 'static>() -> OutputFunction<T> {
    OutputFunction::new(|value: &T, _| value.to_string())
}

pub fn from_role_id(roles: Arc<dyn RoleResolver>) -> OutputFunction<Option<RoleId>> {
    OutputFunction::new(move |value: &Option<RoleId>, guild| match value {
        Some(role) => match roles.role_name(guild, *role) {
            Some(name) => format!("{} ({})", name, role),
            None => format!("{} (deleted role)", role),
        },
        None => String::from("none"),
    })
}

/// One typed setting: how to read it, write it, parse input for it and show it.
pub struct GuildSettingsEntry<T> {
    getter: fn(&GuildSettings) -> T,
    setter: fn(&mut GuildSettings, T),
    input: InputFunction<T>,
    output: OutputFunction<T>,
    on_commit: Option<CommitHook>,
}

impl<T: Send + 'static> GuildSettingsEntry<T> {
    pub fn new(
        getter: fn(&GuildSettings) -> T,
        setter: fn(&mut GuildSettings, T),
        input: InputFunction<T>,
        output: OutputFunction<T>,
    ) -> Self {
        GuildSettingsEntry {
            getter,
            setter,
            input,
            output,
            on_commit: None,
        }
    }

    /// Runs after every successfully saved change.
    pub fn after_commit<F>(mut self, hook: F) -> Self
    where
        F: Fn(GuildId) + Send + Sync + 'static,
    {
        self.on_commit = Some(Box::new(hook));
        self
    }

    pub fn into_entry(self) -> ConfigEntry {
        ConfigEntry {
            binding: Arc::new(self),
        }
    }
}

trait SettingsBinding: Send + Sync {
    fn display(&self, settings: &GuildSettings, guild: GuildId) -> String;

    fn stage(&self, raw: &str, guild: GuildId) -> Result<StagedChange, ValidationError>;

    fn committed(&self, guild: GuildId);
}

impl<T: Send + 'static> SettingsBinding for GuildSettingsEntry<T> {
    fn display(&self, settings: &GuildSettings, guild: GuildId) -> String {
        self.output.apply(&(self.getter)(settings), guild)
    }

    fn stage(&self, raw: &str, guild: GuildId) -> Result<StagedChange, ValidationError> {
        let value = self.input.apply(raw, guild)?;
        let setter = self.setter;
        Ok(Box::new(move |settings| setter(settings, value)))
    }

    fn committed(&self, guild: GuildId) {
        if let Some(hook) = &self.on_commit {
            hook(guild);
        }
    }
}

/// A type erased [`GuildSettingsEntry`].
#[derive(Clone)]
pub struct ConfigEntry {
    binding: Arc<dyn SettingsBinding>,
}

impl ConfigEntry {
    pub fn display(&self, settings: &GuildSettings, guild: GuildId) -> String {
        self.binding.display(settings, guild)
    }
}

pub struct ConfigEntryRegistry {
    entries: BTreeMap<String, ConfigEntry>,
    store: Arc<dyn SettingsStore>,
}

impl ConfigEntryRegistry {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        ConfigEntryRegistry {
            entries: BTreeMap::new(),
            store,
        }
    }

    pub fn register(&mut self, key: &str, entry: ConfigEntry) -> Result<(), StartupError> {
        if self.entries.contains_key(key) {
            return Err(StartupError::DuplicateConfigKey(key.to_string()));
        }
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&ConfigEntry> {
        self.entries.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validates `raw`, saves it into the guild's settings and then runs the entry's commit hook
    /// once. Rejected input leaves the stored settings untouched.
    pub async fn apply(&self, key: &str, guild: GuildId, raw: &str) -> Result<(), ConfigError> {
        let entry = self.entry(key)?;
        let change = entry.binding.stage(raw, guild)?;

        let mut settings = self.store.load(guild).await?.unwrap_or_default();
        change(&mut settings);
        self.store.save(guild, &settings).await?;

        entry.binding.committed(guild);
        debug!("Updated {} for guild {}", key, guild);
        Ok(())
    }

    pub async fn display(&self, key: &str, guild: GuildId) -> Result<String, ConfigError> {
        let entry = self.entry(key)?;
        let settings = self.store.load(guild).await?.unwrap_or_default();
        Ok(entry.display(&settings, guild))
    }

    fn entry(&self, key: &str) -> Result<&ConfigEntry, ConfigError> {
        self.entries
            .get(key)
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::core::roles::RoleDirectory;
    use crate::database::MemoryStore;

    fn prefix_entry(commits: Arc<AtomicUsize>) -> ConfigEntry {
        GuildSettingsEntry::new(
            |settings| settings.prefix.clone(),
            |settings, value| settings.prefix = value,
            InputFunction::as_is().with_input_check(|value: &String| !value.trim().is_empty(), "Cannot be blank"),
            string_value(),
        )
        .after_commit(move |_| {
            commits.fetch_add(1, Ordering::SeqCst);
        })
        .into_entry()
    }

    fn registry(store: Arc<MemoryStore>, commits: Arc<AtomicUsize>) -> ConfigEntryRegistry {
        let mut registry = ConfigEntryRegistry::new(store);
        registry.register("prefix", prefix_entry(commits)).unwrap();
        registry
    }

    #[tokio::test]
    async fn blank_input_is_rejected_without_side_effects() {
        let store = Arc::new(MemoryStore::new());
        let commits = Arc::new(AtomicUsize::new(0));
        let registry = registry(store.clone(), commits.clone());

        match registry.apply("prefix", GuildId(1), "   ").await {
            Err(ConfigError::Validation(e)) => assert_eq!(e.reason, "Cannot be blank"),
            other => panic!("expected a validation error, got {:?}", other),
        }
        assert_eq!(store.stored_guilds(), 0);
        assert_eq!(commits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn accepted_input_is_saved_then_committed_once() {
        let store = Arc::new(MemoryStore::new());
        let commits = Arc::new(AtomicUsize::new(0));
        let registry = registry(store.clone(), commits.clone());

        registry.apply("prefix", GuildId(1), "?").await.unwrap();

        assert_eq!(store.load(GuildId(1)).await.unwrap().unwrap().prefix, "?");
        assert_eq!(commits.load(Ordering::SeqCst), 1);
        assert_eq!(registry.display("prefix", GuildId(1)).await.unwrap(), "?");
        assert_eq!(registry.display("prefix", GuildId(2)).await.unwrap(), "!");
    }

    #[tokio::test]
    async fn failed_save_skips_the_commit_hook() {
        let store = Arc::new(MemoryStore::new());
        let commits = Arc::new(AtomicUsize::new(0));
        let registry = registry(store.clone(), commits.clone());
        store.set_read_only(true);

        match registry.apply("prefix", GuildId(1), "?").await {
            Err(ConfigError::Database(_)) => {}
            other => panic!("expected a database error, got {:?}", other),
        }
        assert_eq!(commits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_and_duplicate_keys() {
        let store = Arc::new(MemoryStore::new());
        let commits = Arc::new(AtomicUsize::new(0));
        let mut registry = registry(store, commits.clone());

        match registry.apply("nope", GuildId(1), "x").await {
            Err(ConfigError::UnknownKey(key)) => assert_eq!(key, "nope"),
            other => panic!("expected an unknown key, got {:?}", other),
        }
        match registry.register("prefix", prefix_entry(commits)) {
            Err(StartupError::DuplicateConfigKey(key)) => assert_eq!(key, "prefix"),
            other => panic!("expected a duplicate key, got {:?}", other.map(|_| ())),
        }
        assert_eq!(registry.keys().collect::<Vec<_>>(), vec!["prefix"]);
    }

    #[tokio::test]
    async fn role_entries_resolve_through_the_directory() {
        let roles = Arc::new(RoleDirectory::new());
        roles.insert_role(GuildId(1), RoleId(50), "Mods");
        let store = Arc::new(MemoryStore::new());
        let mut registry = ConfigEntryRegistry::new(store.clone());
        registry
            .register(
                "server_mod_role",
                GuildSettingsEntry::new(
                    |settings| settings.server_mod_role,
                    |settings, value| settings.server_mod_role = value,
                    to_role_id(roles.clone()),
                    from_role_id(roles.clone()),
                )
                .into_entry(),
            )
            .unwrap();

        match registry.apply("server_mod_role", GuildId(1), "Admins").await {
            Err(ConfigError::Validation(_)) => {}
            other => panic!("expected a validation error, got {:?}", other),
        }

        registry.apply("server_mod_role", GuildId(1), "<@&50>").await.unwrap();
        assert_eq!(
            registry.display("server_mod_role", GuildId(1)).await.unwrap(),
            "Mods (50)"
        );

        registry.apply("server_mod_role", GuildId(1), "None").await.unwrap();
        assert_eq!(store.load(GuildId(1)).await.unwrap().unwrap().server_mod_role, None);
        assert_eq!(registry.display("server_mod_role", GuildId(1)).await.unwrap(), "none");
    }
}
