//! Persistence seams for guild settings and the command blacklist.

use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::{DashMap, DashSet};
use futures_util::future;
use log::{debug, info};
use twilight_model::id::GuildId;

use crate::core::GuildSettings;
use crate::error::DatabaseError;

pub type DbFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, DatabaseError>> + Send + 'a>>;

pub trait SettingsStore: Send + Sync {
    /// `None` when the guild never saved any settings.
    fn load(&self, guild: GuildId) -> DbFuture<'_, Option<GuildSettings>>;

    fn save<'a>(&'a self, guild: GuildId, settings: &'a GuildSettings) -> DbFuture<'a, ()>;

    /// Storage resources the installed plugins rely on, announced once at startup.
    fn register_resources(&self, _resources: &BTreeSet<String>) {}
}

pub trait BlacklistStore: Send + Sync {
    fn blacklisted_ids(&self) -> DbFuture<'_, Vec<u64>>;
}

/// Keeps everything in memory, with settings serialized to JSON the same way a database
/// column would hold them.
#[derive(Default)]
pub struct MemoryStore {
    settings: DashMap<GuildId, serde_json::Value>,
    blacklist: DashSet<u64>,
    resources: DashSet<String>,
    read_only: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn blacklist_add(&self, id: u64) -> bool {
        self.blacklist.insert(id)
    }

    /// Rejects every write while set.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    pub fn has_resource(&self, name: &str) -> bool {
        self.resources.contains(name)
    }

    pub fn stored_guilds(&self) -> usize {
        self.settings.len()
    }

    fn load_now(&self, guild: GuildId) -> Result<Option<GuildSettings>, DatabaseError> {
        match self.settings.get(&guild) {
            Some(raw) => serde_json::from_value(raw.value().clone())
                .map(Some)
                .map_err(DatabaseError::Deserializing),
            None => Ok(None),
        }
    }

    fn save_now(&self, guild: GuildId, settings: &GuildSettings) -> Result<(), DatabaseError> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(DatabaseError::Unavailable(String::from("the store is read only")));
        }
        let raw = serde_json::to_value(settings).map_err(DatabaseError::Serializing)?;
        if self.settings.insert(guild, raw).is_none() {
            info!("No settings found for {}, stored new ones", guild);
        }
        Ok(())
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self, guild: GuildId) -> DbFuture<'_, Option<GuildSettings>> {
        Box::pin(future::ready(self.load_now(guild)))
    }

    fn save<'a>(&'a self, guild: GuildId, settings: &'a GuildSettings) -> DbFuture<'a, ()> {
        Box::pin(future::ready(self.save_now(guild, settings)))
    }

    fn register_resources(&self, resources: &BTreeSet<String>) {
        for resource in resources {
            debug!("Registering storage resource {}", resource);
            self.resources.insert(resource.clone());
        }
    }
}

impl BlacklistStore for MemoryStore {
    fn blacklisted_ids(&self) -> DbFuture<'_, Vec<u64>> {
        let mut ids: Vec<u64> = self.blacklist.iter().map(|id| *id).collect();
        ids.sort_unstable();
        Box::pin(future::ready(Ok(ids)))
    }
}
