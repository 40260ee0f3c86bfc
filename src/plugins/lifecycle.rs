use std::sync::Arc;
use std::time::Duration;

use log::{error, info};

use super::Plugin;
use crate::core::Bot;
use crate::keeper_warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyReport {
    /// Whether every shard finished its initial sync before the ready timeout.
    pub settled_in_time: bool,
    /// Plugins whose ready hook failed.
    pub failed: Vec<String>,
}

/// Runs the plugins' ready hooks once the process finished its initial sync, then announces the
/// bot as ready and turns on join/leave logging.
pub struct PluginLifecycleCoordinator {
    plugins: Vec<Arc<dyn Plugin>>,
    ready_timeout: Duration,
}

impl PluginLifecycleCoordinator {
    pub fn new(plugins: Vec<Arc<dyn Plugin>>, ready_timeout: Duration) -> Self {
        PluginLifecycleCoordinator { plugins, ready_timeout }
    }

    pub async fn run(&self, bot: &Arc<Bot>) -> ReadyReport {
        let settled_in_time = bot.state.shards.wait_until_ready(self.ready_timeout).await;
        if !settled_in_time {
            keeper_warn!(
                "Not every shard finished its initial sync within {}s, running ready hooks anyway",
                self.ready_timeout.as_secs()
            );
        }

        // every hook gets its own task so a slow or failing one can't hold up the others
        let hooks: Vec<_> = self
            .plugins
            .iter()
            .map(|plugin| {
                let plugin = plugin.clone();
                let bot = bot.clone();
                let name = plugin.name().to_string();
                (name, tokio::spawn(async move { plugin.on_bot_ready(&bot).await }))
            })
            .collect();

        let mut failed = Vec::new();
        for (name, hook) in hooks {
            let failure = match hook.await {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e.to_string(),
                Err(e) if e.is_panic() => String::from("the hook panicked"),
                Err(e) => e.to_string(),
            };
            keeper_warn!("Ready hook failed for plugin {}: {}", name, failure);
            bot.stats.plugin_failures.inc();
            failed.push(name);
        }

        if let Err(e) = bot.log("Bot ready!").await {
            error!("Failed to announce that the bot is ready: {}", e);
        }
        bot.state.arm_membership_logging();
        info!("{} plugins ready, {} failed", self.plugins.len() - failed.len(), failed.len());

        ReadyReport {
            settled_in_time,
            failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use twilight_model::id::GuildId;

    use super::*;
    use crate::core::{BotConfig, BotServices};
    use crate::testing::{ReadyBehaviour, RecordingSink, ScriptedPlugin};

    fn bot(sink: Arc<RecordingSink>, shards: Vec<u64>) -> Arc<Bot> {
        let mut config = BotConfig::default();
        config.lifecycle.shards = shards;
        Bot::new(config, BotServices::in_memory(sink)).unwrap()
    }

    fn coordinator(plugins: Vec<ScriptedPlugin>) -> (PluginLifecycleCoordinator, Vec<Arc<ScriptedPlugin>>) {
        let plugins: Vec<Arc<ScriptedPlugin>> = plugins.into_iter().map(Arc::new).collect();
        let erased = plugins.iter().map(|plugin| plugin.clone() as Arc<dyn Plugin>).collect();
        (PluginLifecycleCoordinator::new(erased, Duration::from_secs(300)), plugins)
    }

    #[tokio::test]
    async fn failing_hooks_do_not_stop_the_ready_sequence() {
        let sink = Arc::new(RecordingSink::default());
        let bot = bot(sink.clone(), vec![]);
        let (coordinator, plugins) = coordinator(vec![
            ScriptedPlugin::new("Alpha"),
            ScriptedPlugin::new("Broken").on_ready(ReadyBehaviour::Fail),
            ScriptedPlugin::new("Panicky").on_ready(ReadyBehaviour::Panic),
            ScriptedPlugin::new("Omega"),
        ]);

        let report = coordinator.run(&bot).await;

        assert!(report.settled_in_time);
        assert_eq!(report.failed, vec!["Broken", "Panicky"]);
        assert!(plugins.iter().all(|plugin| plugin.ready_calls.load(Ordering::SeqCst) == 1));
        assert_eq!(sink.lines(), vec!["Bot ready!"]);
        assert_eq!(bot.stats.plugin_failures.get(), 2);
        assert!(bot.state.should_forward_membership());
    }

    #[tokio::test]
    async fn hooks_wait_for_the_initial_sync() {
        let sink = Arc::new(RecordingSink::default());
        let bot = bot(sink.clone(), vec![0]);
        let (coordinator, plugins) = coordinator(vec![ScriptedPlugin::new("Alpha")]);

        let running = {
            let bot = bot.clone();
            tokio::spawn(async move { coordinator.run(&bot).await })
        };
        tokio::task::yield_now().await;
        assert_eq!(plugins[0].ready_calls.load(Ordering::SeqCst), 0);

        let ticket = bot.state.shards.begin_sync(0, &[GuildId(1)]);
        bot.state.shards.record_arrival(0, GuildId(1));
        bot.state.shards.await_sync(&ticket).await;

        let report = running.await.unwrap();
        assert!(report.settled_in_time);
        assert_eq!(plugins[0].ready_calls.load(Ordering::SeqCst), 1);
        assert_eq!(sink.wait_for(1).await, vec!["Bot ready!"]);
    }

    #[tokio::test]
    async fn ready_timeout_still_runs_the_hooks() {
        tokio::time::pause();
        let sink = Arc::new(RecordingSink::default());
        let bot = bot(sink.clone(), vec![0, 1]);
        let (coordinator, plugins) = coordinator(vec![ScriptedPlugin::new("Alpha")]);

        let report = coordinator.run(&bot).await;

        assert!(!report.settled_in_time);
        assert_eq!(plugins[0].ready_calls.load(Ordering::SeqCst), 1);
        assert_eq!(sink.lines(), vec!["Bot ready!"]);
    }
}
