use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info};
use tokio::runtime::Runtime;

use shardkeeper::core::log_sink::OperatorLog;
use shardkeeper::core::{logging, Bot, BotConfig, BotServices};
use shardkeeper::error::StartupError;
use shardkeeper::gateway::{BroadcastSource, ReplayScript, ShardEventSource, ShardId};
use shardkeeper::plugins::{CorePlugin, PluginRegistry};
use shardkeeper::utils::emoji;
use shardkeeper::{keeper_error, keeper_important, GIT_VERSION, VERSION};

fn main() -> Result<(), StartupError> {
    let runtime = Runtime::new()?;

    runtime.block_on(async move { real_main().await })?;

    runtime.shutdown_timeout(Duration::from_secs(10));
    Ok(())
}

async fn real_main() -> Result<(), StartupError> {
    let config_file = env::args().nth(1).unwrap_or_else(|| String::from("config.toml"));
    let config = BotConfig::new(&config_file)?;

    if let Err(e) = logging::initialize(&config.logging) {
        eprintln!("{}", e);
        return Err(e);
    }
    info!("Shardkeeper v{} ({}) starting!", VERSION, GIT_VERSION);
    debug!("Loaded config file {}", config_file);

    if !config.emoji.is_empty() {
        emoji::set_overrides(config.emoji.clone());
    }

    let replay = match &config.gateway.replay {
        Some(path) => Some(ReplayScript::load(path)?),
        None => None,
    };

    let sources: HashMap<ShardId, Arc<BroadcastSource>> = config
        .lifecycle
        .shards
        .iter()
        .map(|shard| (*shard, Arc::new(BroadcastSource::new(*shard, config.gateway.event_buffer))))
        .collect();
    let subscriptions = sources
        .values()
        .map(|source| source.clone() as Arc<dyn ShardEventSource>)
        .collect();

    let (sink, pump) = OperatorLog::start();
    let bot = Bot::new(config, BotServices::in_memory(sink))?;

    let mut registry = PluginRegistry::new();
    registry.register(CorePlugin::new())?;

    let running = match bot.start(registry, subscriptions).await {
        Ok(running) => running,
        Err(e) => {
            keeper_error!("Failed to start the bot: {}", e);
            return Err(e);
        }
    };
    keeper_important!("Shardkeeper v{} is up, waiting for {} shards", VERSION, sources.len());

    if let Some(replay) = replay {
        info!("Replaying {} scripted events", replay.steps().len());
        tokio::spawn(replay.play(sources.clone()));
    }

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::unbounded_channel();
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(());
    })
    .map_err(StartupError::Signal)?;

    shutdown_rx.recv().await;
    keeper_important!("Shutdown requested, stopping");
    running.shutdown();

    match bot.stats.encode() {
        Ok(metrics) => info!("Final lifecycle metrics:\n{}", metrics),
        Err(e) => error!("Failed to encode the metrics: {}", e),
    }

    drop(sources);
    drop(bot);
    let _ = tokio::time::timeout(Duration::from_secs(5), pump).await;
    Ok(())
}
