//! Consumes lifecycle events from every shard without ever letting one bad event end a
//! subscription.
//!
//! Each shard gets a dispatcher that applies state transitions in delivery order, then hands
//! the slower follow-up work (waiting out a sync, writing log lines) to one worker per event
//! category. A sync waiting for its guilds therefore never holds up the availability events it
//! is waiting on.

use std::sync::Arc;

use futures_util::future;
use futures_util::stream::StreamExt;
use log::{debug, warn};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use twilight_model::id::GuildId;

pub use retry::{RetryPolicy, SubscriptionEnd, Supervisor};

use crate::core::lifecycle::{LifecycleState, SyncTicket, Transition};
use crate::core::log_sink::LogSink;
use crate::core::stats::LifecycleStats;
use crate::error::EventHandlerError;
use crate::gateway::{EventCategory, LifecycleEvent, ShardEventSource, ShardId};

mod retry;
mod workers;

const DISPATCH_LABEL: &str = "Dispatch";

#[derive(Clone)]
pub struct ResilientEventPipeline {
    state: Arc<LifecycleState>,
    sink: Arc<dyn LogSink>,
    stats: Arc<LifecycleStats>,
    policy: RetryPolicy,
}

/// The tasks serving one shard.
pub struct ShardPipeline {
    pub shard: ShardId,
    tasks: Vec<JoinHandle<SubscriptionEnd>>,
}

impl ShardPipeline {
    pub fn abort(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }

    /// Waits for every task to end, which only happens once the event source is closed.
    pub async fn join(self) -> Vec<SubscriptionEnd> {
        let mut ends = Vec::with_capacity(self.tasks.len());
        for task in self.tasks {
            if let Ok(end) = task.await {
                ends.push(end);
            }
        }
        ends
    }
}

pub(crate) struct SyncJob {
    ticket: SyncTicket,
    guilds: Vec<GuildId>,
}

pub(crate) struct MembershipChange {
    guild: GuildId,
    transition: Transition,
    name: Option<String>,
    /// Decided when the event was applied, not when the line gets written.
    forward: bool,
}

struct Routes {
    full_sync: UnboundedSender<SyncJob>,
    resume: UnboundedSender<ShardId>,
    guild_available: UnboundedSender<MembershipChange>,
    guild_gone: UnboundedSender<MembershipChange>,
}

impl ResilientEventPipeline {
    pub fn new(
        state: Arc<LifecycleState>,
        sink: Arc<dyn LogSink>,
        stats: Arc<LifecycleStats>,
        policy: RetryPolicy,
    ) -> Self {
        ResilientEventPipeline {
            state,
            sink,
            stats,
            policy,
        }
    }

    pub fn state(&self) -> &Arc<LifecycleState> {
        &self.state
    }

    /// Subscribes to the source right away and spawns the tasks serving it.
    pub fn attach(&self, source: Arc<dyn ShardEventSource>) -> ShardPipeline {
        let shard = source.shard_id();
        let events = source.subscribe();

        let (full_sync, full_sync_jobs) = mpsc::unbounded_channel();
        let (resume, resumes) = mpsc::unbounded_channel();
        let (guild_available, arrivals) = mpsc::unbounded_channel();
        let (guild_gone, departures) = mpsc::unbounded_channel();

        let mut tasks = vec![
            tokio::spawn(workers::full_sync(self.clone(), shard, full_sync_jobs)),
            tokio::spawn(workers::resume(self.clone(), shard, resumes)),
            tokio::spawn(workers::guild_available(self.clone(), shard, arrivals)),
            tokio::spawn(workers::guild_gone(self.clone(), shard, departures)),
        ];

        let dispatcher = Dispatcher {
            pipeline: self.clone(),
            shard,
            routes: Routes {
                full_sync,
                resume,
                guild_available,
                guild_gone,
            },
        };
        tasks.push(tokio::spawn(async move {
            let supervisor = dispatcher.pipeline.supervisor(DISPATCH_LABEL, shard);
            let events = events.map(|event| event.map_err(EventHandlerError::from));
            supervisor
                .run(events, |event| future::ready(dispatcher.apply(event)))
                .await
        }));

        debug!("Attached the lifecycle pipeline to shard {}", shard);
        ShardPipeline { shard, tasks }
    }

    fn supervisor(&self, label: &'static str, shard: ShardId) -> Supervisor {
        Supervisor::new(label, shard, self.policy.clone(), self.stats.clone())
    }
}

struct Dispatcher {
    pipeline: ResilientEventPipeline,
    shard: ShardId,
    routes: Routes,
}

impl Dispatcher {
    fn apply(&self, event: LifecycleEvent) -> Result<(), EventHandlerError> {
        let state = &self.pipeline.state;
        self.pipeline.stats.event_received(event.category());

        let routed = match event {
            LifecycleEvent::FullSync { shard, mut guilds } => {
                if shard != self.shard {
                    warn!("Shard {} delivered a full sync labelled for shard {}", self.shard, shard);
                }
                guilds.sort_unstable();
                guilds.dedup();
                state.guilds.register_pending(&guilds);
                let ticket = state.shards.begin_sync(self.shard, &guilds);
                self.routes
                    .full_sync
                    .send(SyncJob { ticket, guilds })
                    .map_err(|_| EventHandlerError::WorkerGone(EventCategory::FullSync))
            }
            LifecycleEvent::Resumed { .. } => self
                .routes
                .resume
                .send(self.shard)
                .map_err(|_| EventHandlerError::WorkerGone(EventCategory::Resume)),
            LifecycleEvent::GuildAvailable { guild, name } => {
                let transition = state.guilds.mark_available(guild, &name);
                state.shards.record_arrival(self.shard, guild);
                let change = MembershipChange {
                    guild,
                    transition,
                    name: Some(name),
                    forward: state.should_forward_membership(),
                };
                self.routes
                    .guild_available
                    .send(change)
                    .map_err(|_| EventHandlerError::WorkerGone(EventCategory::GuildAvailable))
            }
            LifecycleEvent::GuildGone { guild, outage, name } => {
                let transition = if outage {
                    state.guilds.mark_unavailable(guild)
                } else {
                    state.guilds.mark_removed(guild, name)
                };
                let change = MembershipChange {
                    guild,
                    transition,
                    name: None,
                    forward: state.should_forward_membership(),
                };
                self.routes
                    .guild_gone
                    .send(change)
                    .map_err(|_| EventHandlerError::WorkerGone(EventCategory::GuildGone))
            }
        };

        self.pipeline.stats.refresh(state);
        routed
    }
}
