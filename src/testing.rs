use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future;
use tokio::sync::Notify;

use crate::core::log_sink::{LogFuture, LogSink};
use crate::core::Bot;
use crate::error::{LogError, PluginError};
use crate::plugins::config_entry::{string_value, GuildSettingsEntry, InputFunction};
use crate::plugins::{CommandDescriptor, CommandProvider, ConfigEntry, Plugin, PluginFuture, PropertyParser};

/// Keeps every line it is given. The first `failures` lines are rejected instead.
#[derive(Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<String>>,
    failures: AtomicUsize,
    notify: Notify,
}

impl RecordingSink {
    pub fn failing(failures: usize) -> Self {
        RecordingSink {
            failures: AtomicUsize::new(failures),
            ..RecordingSink::default()
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    /// Waits until at least `count` lines were recorded. The limit is generous so tests with
    /// paused time can still run past a sync deadline.
    pub async fn wait_for(&self, count: usize) -> Vec<String> {
        let waiting = async {
            loop {
                let notified = self.notify.notified();
                let lines = self.lines();
                if lines.len() >= count {
                    return lines;
                }
                notified.await;
            }
        };
        tokio::time::timeout(Duration::from_secs(600), waiting)
            .await
            .unwrap_or_else(|_| panic!("expected {} lines, got {:?}", count, self.lines()))
    }
}

impl LogSink for RecordingSink {
    fn log(&self, message: String) -> LogFuture<'_> {
        let rejected = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        let result = if rejected {
            Err(LogError::Other(format!("rejected: {}", message)))
        } else {
            self.lines.lock().unwrap().push(message);
            self.notify.notify_waiters();
            Ok(())
        };
        Box::pin(future::ready(result))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadyBehaviour {
    Succeed,
    Fail,
    Panic,
}

/// A plugin whose hooks do what the test tells them to.
pub struct ScriptedPlugin {
    name: String,
    ready: ReadyBehaviour,
    fail_setup: bool,
    commands: CommandProvider,
    config_keys: Vec<String>,
    resources: BTreeSet<String>,
    pub setup_calls: AtomicUsize,
    pub ready_calls: AtomicUsize,
}

impl ScriptedPlugin {
    pub fn new(name: &str) -> Self {
        ScriptedPlugin {
            name: name.to_string(),
            ready: ReadyBehaviour::Succeed,
            fail_setup: false,
            commands: CommandProvider::new(),
            config_keys: Vec::new(),
            resources: BTreeSet::new(),
            setup_calls: AtomicUsize::new(0),
            ready_calls: AtomicUsize::new(0),
        }
    }

    pub fn on_ready(mut self, ready: ReadyBehaviour) -> Self {
        self.ready = ready;
        self
    }

    pub fn failing_setup(mut self) -> Self {
        self.fail_setup = true;
        self
    }

    pub fn with_command(mut self, name: &str) -> Self {
        self.commands.add(CommandDescriptor::new(name, "scripted"));
        self
    }

    /// Adds an entry bound to the prefix, under `key`.
    pub fn with_config_key(mut self, key: &str) -> Self {
        self.config_keys.push(key.to_string());
        self
    }

    pub fn with_resource(mut self, resource: &str) -> Self {
        self.resources.insert(resource.to_string());
        self
    }
}

impl Plugin for ScriptedPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup<'a>(&'a mut self, _bot: &'a Arc<Bot>, _properties: &'a PropertyParser) -> PluginFuture<'a> {
        self.setup_calls.fetch_add(1, Ordering::SeqCst);
        let result = if self.fail_setup {
            Err(PluginError::Other(String::from("scripted setup failure")))
        } else {
            Ok(())
        };
        Box::pin(future::ready(result))
    }

    fn on_bot_ready<'a>(&'a self, _bot: &'a Arc<Bot>) -> PluginFuture<'a> {
        self.ready_calls.fetch_add(1, Ordering::SeqCst);
        let ready = self.ready;
        Box::pin(async move {
            match ready {
                ReadyBehaviour::Succeed => Ok(()),
                ReadyBehaviour::Fail => Err(PluginError::Other(String::from("scripted ready failure"))),
                ReadyBehaviour::Panic => panic!("scripted ready panic"),
            }
        })
    }

    fn database_mapping_resources(&self) -> BTreeSet<String> {
        self.resources.clone()
    }

    fn guild_configuration_entries(&self) -> Vec<(String, ConfigEntry)> {
        self.config_keys
            .iter()
            .map(|key| {
                let entry = GuildSettingsEntry::new(
                    |settings| settings.prefix.clone(),
                    |settings, value| settings.prefix = value,
                    InputFunction::as_is(),
                    string_value(),
                );
                (key.clone(), entry.into_entry())
            })
            .collect()
    }

    fn command_provider(&self) -> &CommandProvider {
        &self.commands
    }
}
