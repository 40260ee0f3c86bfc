use std::sync::Arc;

use log::{debug, info};
use once_cell::sync::OnceCell;
use tokio::task::JoinHandle;

use crate::core::lifecycle::LifecycleState;
use crate::core::log_sink::LogSink;
use crate::core::pipeline::{ResilientEventPipeline, ShardPipeline};
use crate::core::roles::{RoleDirectory, RoleResolver};
use crate::core::stats::LifecycleStats;
use crate::core::BotConfig;
use crate::database::{BlacklistStore, MemoryStore, SettingsStore};
use crate::error::{LogError, StartupError};
use crate::gateway::ShardEventSource;
use crate::keeper_info;
use crate::plugins::{CommandKernel, ConfigEntryRegistry, Plugin, PluginLifecycleCoordinator, PluginRegistry, ReadyReport};

/// The collaborators the bot talks to but does not own.
pub struct BotServices {
    pub sink: Arc<dyn LogSink>,
    pub settings: Arc<dyn SettingsStore>,
    pub blacklist: Arc<dyn BlacklistStore>,
    pub roles: Arc<dyn RoleResolver>,
}

impl BotServices {
    pub fn in_memory(sink: Arc<dyn LogSink>) -> Self {
        let store = Arc::new(MemoryStore::new());
        BotServices {
            sink,
            settings: store.clone(),
            blacklist: store,
            roles: Arc::new(RoleDirectory::new()),
        }
    }
}

/// Handle shared with the plugins.
pub struct Bot {
    pub config: BotConfig,
    pub state: Arc<LifecycleState>,
    pub stats: Arc<LifecycleStats>,
    pub kernel: Arc<CommandKernel>,
    pub settings: Arc<dyn SettingsStore>,
    pub blacklist: Arc<dyn BlacklistStore>,
    pub roles: Arc<dyn RoleResolver>,
    sink: Arc<dyn LogSink>,
    config_entries: OnceCell<ConfigEntryRegistry>,
    plugins: OnceCell<Vec<Arc<dyn Plugin>>>,
}

/// The tasks of a started bot.
pub struct Running {
    pub shards: Vec<ShardPipeline>,
    pub ready: JoinHandle<ReadyReport>,
}

impl Running {
    pub fn shutdown(&self) {
        self.ready.abort();
        for shard in &self.shards {
            shard.abort();
        }
    }
}

impl Bot {
    pub fn new(config: BotConfig, services: BotServices) -> Result<Arc<Self>, StartupError> {
        let state = Arc::new(LifecycleState::new(
            &config.lifecycle.shards,
            config.lifecycle.sync_deadline(),
        ));
        let stats = Arc::new(LifecycleStats::new(config.lifecycle.cluster)?);

        Ok(Arc::new(Bot {
            config,
            state,
            stats,
            kernel: Arc::new(CommandKernel::new()),
            settings: services.settings,
            blacklist: services.blacklist,
            roles: services.roles,
            sink: services.sink,
            config_entries: OnceCell::new(),
            plugins: OnceCell::new(),
        }))
    }

    /// Sends a status line to the operator log.
    pub async fn log(&self, message: impl Into<String>) -> Result<(), LogError> {
        self.sink.log(message.into()).await
    }

    /// Installed plugins, empty until the bot is started.
    pub fn plugins(&self) -> &[Arc<dyn Plugin>] {
        self.plugins.get().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn config_entries(&self) -> Option<&ConfigEntryRegistry> {
        self.config_entries.get()
    }

    /// Sets up the plugins, starts consuming every shard's events and schedules the ready
    /// sequence. Returns once everything is running, not once the bot is ready.
    pub async fn start(
        self: &Arc<Self>,
        registry: PluginRegistry,
        sources: Vec<Arc<dyn ShardEventSource>>,
    ) -> Result<Running, StartupError> {
        if self.plugins.get().is_some() {
            return Err(StartupError::AlreadyStarted);
        }

        let installed = registry.setup(self).await?;
        self.settings.register_resources(&installed.resources);
        debug!(
            "{} guild configuration entries available: {:?}",
            installed.config_entries.len(),
            installed.config_entries.keys().collect::<Vec<_>>()
        );
        let plugins = installed.plugins;
        if self.plugins.set(plugins.clone()).is_err() || self.config_entries.set(installed.config_entries).is_err() {
            return Err(StartupError::AlreadyStarted);
        }
        keeper_info!("{} plugins loaded", plugins.len());

        let pipeline = ResilientEventPipeline::new(
            self.state.clone(),
            self.sink.clone(),
            self.stats.clone(),
            self.config.lifecycle.retry_policy(),
        );
        let shards: Vec<ShardPipeline> = sources.into_iter().map(|source| pipeline.attach(source)).collect();
        info!("Listening to {} shards", shards.len());

        let coordinator = PluginLifecycleCoordinator::new(plugins, self.config.lifecycle.ready_timeout());
        let bot = self.clone();
        let ready = tokio::spawn(async move { coordinator.run(&bot).await });

        Ok(Running { shards, ready })
    }
}
