use std::collections::HashMap;

use chrono::{DateTime, Utc};
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::core::lifecycle::LifecycleState;
use crate::gateway::EventCategory;

pub struct EventCounters {
    pub full_sync: IntCounter,
    pub resumed: IntCounter,
    pub guild_available: IntCounter,
    pub guild_gone: IntCounter,
}

pub struct GuildCounters {
    pub available: IntGauge,
    pub outage: IntGauge,
}

pub struct LifecycleStats {
    pub registry: Registry,
    pub start_time: DateTime<Utc>,
    pub event_counts: EventCounters,
    pub handler_errors: IntCounterVec,
    pub guild_counts: GuildCounters,
    pub shards_not_ready: IntGauge,
    pub plugin_failures: IntCounter,
}

impl LifecycleStats {
    #[rustfmt::skip]
    pub fn new(cluster_id: u64) -> Result<Self, prometheus::Error> {
        let event_counter = IntCounterVec::new(Opts::new("lifecycle_events", "Lifecycle events received from the gateway"), &["category"])?;
        let handler_errors = IntCounterVec::new(Opts::new("lifecycle_errors", "Errors while processing lifecycle events"), &["category"])?;
        let guild_counter = IntGaugeVec::new(Opts::new("guild_counts", "State of the guilds"), &["state"])?;
        let shards_not_ready = IntGauge::with_opts(Opts::new("shards_not_ready", "Shards currently receiving their guilds"))?;
        let plugin_failures = IntCounter::with_opts(Opts::new("plugin_ready_failures", "Plugin ready hooks that failed"))?;

        // so every category shows up in the output, even before its first error
        for category in EventCategory::ALL.iter() {
            handler_errors.get_metric_with_label_values(&[category.as_str()])?;
        }

        let mut static_labels = HashMap::new();
        static_labels.insert(String::from("cluster"), cluster_id.to_string());
        let registry = Registry::new_custom(Some(String::from("shardkeeper")), Some(static_labels))?;
        registry.register(Box::new(event_counter.clone()))?;
        registry.register(Box::new(handler_errors.clone()))?;
        registry.register(Box::new(guild_counter.clone()))?;
        registry.register(Box::new(shards_not_ready.clone()))?;
        registry.register(Box::new(plugin_failures.clone()))?;

        Ok(LifecycleStats {
            registry,
            start_time: Utc::now(),
            event_counts: EventCounters {
                full_sync: event_counter.get_metric_with_label_values(&[EventCategory::FullSync.as_str()])?,
                resumed: event_counter.get_metric_with_label_values(&[EventCategory::Resume.as_str()])?,
                guild_available: event_counter.get_metric_with_label_values(&[EventCategory::GuildAvailable.as_str()])?,
                guild_gone: event_counter.get_metric_with_label_values(&[EventCategory::GuildGone.as_str()])?,
            },
            handler_errors,
            guild_counts: GuildCounters {
                available: guild_counter.get_metric_with_label_values(&["available"])?,
                outage: guild_counter.get_metric_with_label_values(&["outage"])?,
            },
            shards_not_ready,
            plugin_failures,
        })
    }

    pub fn event_received(&self, category: EventCategory) {
        match category {
            EventCategory::FullSync => self.event_counts.full_sync.inc(),
            EventCategory::Resume => self.event_counts.resumed.inc(),
            EventCategory::GuildAvailable => self.event_counts.guild_available.inc(),
            EventCategory::GuildGone => self.event_counts.guild_gone.inc(),
        }
    }

    pub fn handler_failed(&self, label: &str) {
        if let Ok(counter) = self.handler_errors.get_metric_with_label_values(&[label]) {
            counter.inc();
        }
    }

    /// Copies the current guild and shard counts into the gauges.
    pub fn refresh(&self, state: &LifecycleState) {
        self.guild_counts.available.set(state.guilds.available_count() as i64);
        self.guild_counts.outage.set(state.guilds.unavailable_count() as i64);
        self.shards_not_ready.set(state.shards.shards_not_ready() as i64);
    }

    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = vec![];
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use twilight_model::id::GuildId;

    use super::*;

    #[test]
    fn gauges_follow_state() {
        let stats = LifecycleStats::new(0).unwrap();
        let state = LifecycleState::new(&[0], Duration::from_secs(120));
        state.guilds.register_pending(&[GuildId(1), GuildId(2)]);
        state.guilds.mark_available(GuildId(1), "one");

        stats.refresh(&state);
        assert_eq!(stats.guild_counts.available.get(), 1);
        assert_eq!(stats.guild_counts.outage.get(), 1);
    }

    #[test]
    fn encodes_registered_metrics() {
        let stats = LifecycleStats::new(3).unwrap();
        stats.event_received(EventCategory::Resume);
        stats.handler_failed("GuildGone");

        let text = stats.encode().unwrap();
        assert!(text.contains("shardkeeper_lifecycle_events"));
        assert!(text.contains("cluster=\"3\""));
        assert_eq!(stats.event_counts.resumed.get(), 1);
    }
}
