use std::pin::Pin;

use futures_util::stream::{self, Stream};
use log::{debug, trace};
use tokio::sync::mpsc::UnboundedReceiver;

use super::{MembershipChange, ResilientEventPipeline, SubscriptionEnd, SyncJob};
use crate::core::lifecycle::{SyncOutcome, Transition};
use crate::error::{EventHandlerError, ReadinessTimeout};
use crate::gateway::{EventCategory, ShardId};
use crate::keeper_warn;
use crate::utils::{escape_markdown, Emoji};

type Jobs<T> = Pin<Box<dyn Stream<Item = Result<T, EventHandlerError>> + Send>>;

fn jobs<T: Send + 'static>(receiver: UnboundedReceiver<T>) -> Jobs<T> {
    Box::pin(stream::unfold(receiver, |mut receiver| async move {
        receiver.recv().await.map(|job| (Ok(job), receiver))
    }))
}

pub(super) async fn full_sync(
    pipeline: ResilientEventPipeline,
    shard: ShardId,
    receiver: UnboundedReceiver<SyncJob>,
) -> SubscriptionEnd {
    let supervisor = pipeline.supervisor(EventCategory::FullSync.as_str(), shard);
    supervisor
        .run(jobs(receiver), |job| {
            let pipeline = pipeline.clone();
            async move { pipeline.settle_sync(job).await }
        })
        .await
}

pub(super) async fn resume(
    pipeline: ResilientEventPipeline,
    shard: ShardId,
    receiver: UnboundedReceiver<ShardId>,
) -> SubscriptionEnd {
    let supervisor = pipeline.supervisor(EventCategory::Resume.as_str(), shard);
    supervisor
        .run(jobs(receiver), |shard| {
            let pipeline = pipeline.clone();
            async move {
                pipeline
                    .sink
                    .log(format!("Shard {}: session resumed after websocket disconnection.", shard))
                    .await?;
                Ok(())
            }
        })
        .await
}

pub(super) async fn guild_available(
    pipeline: ResilientEventPipeline,
    shard: ShardId,
    receiver: UnboundedReceiver<MembershipChange>,
) -> SubscriptionEnd {
    let supervisor = pipeline.supervisor(EventCategory::GuildAvailable.as_str(), shard);
    supervisor
        .run(jobs(receiver), |change| {
            let pipeline = pipeline.clone();
            async move { pipeline.announce(change).await }
        })
        .await
}

pub(super) async fn guild_gone(
    pipeline: ResilientEventPipeline,
    shard: ShardId,
    receiver: UnboundedReceiver<MembershipChange>,
) -> SubscriptionEnd {
    let supervisor = pipeline.supervisor(EventCategory::GuildGone.as_str(), shard);
    supervisor
        .run(jobs(receiver), |change| {
            let pipeline = pipeline.clone();
            async move { pipeline.announce(change).await }
        })
        .await
}

impl ResilientEventPipeline {
    async fn settle_sync(&self, job: SyncJob) -> Result<(), EventHandlerError> {
        let SyncJob { ticket, guilds } = job;
        let report = match self.state.shards.await_sync(&ticket).await {
            SyncOutcome::Completed(report) => report,
            SyncOutcome::Superseded => {
                debug!("Guild sync for shard {} was superseded by a newer one", ticket.shard);
                return Ok(());
            }
        };
        self.stats.refresh(&self.state);

        if report.timed_out {
            let timeout = ReadinessTimeout {
                shard: report.shard,
                expected: report.expected,
                arrived: report.arrived,
            };
            // a reconnecting shard is already counted as ready, so this only needs to be loud
            if report.resync {
                return Err(timeout.into());
            }
            keeper_warn!("{}, continuing with the guilds that did arrive", timeout);
        }

        let serving = self.state.guilds.count_available(&guilds);
        let message = if report.resync {
            format!("Shard {} reconnected! Serving {} guilds.", report.shard, serving)
        } else {
            format!("Shard {} connected! Serving {} guilds.", report.shard, serving)
        };
        self.sink.log(message).await?;
        Ok(())
    }

    async fn announce(&self, change: MembershipChange) -> Result<(), EventHandlerError> {
        if !change.forward {
            trace!("Not announcing {:?} for guild {} while shards are syncing", change.transition, change.guild);
            return Ok(());
        }

        let message = match change.transition {
            Transition::Joined => {
                let name = change.name.unwrap_or_default();
                format!(
                    "{} New guild joined: {} ({})",
                    Emoji::InboxTray.for_chat(),
                    escape_markdown(&name),
                    change.guild
                )
            }
            Transition::Left { name: Some(name) } => format!(
                "{} Guild left: {} ({})",
                Emoji::OutboxTray.for_chat(),
                escape_markdown(&name),
                change.guild
            ),
            Transition::Left { name: None } => {
                format!("{} Guild left: {} (no data)", Emoji::OutboxTray.for_chat(), change.guild)
            }
            Transition::Recovered | Transition::Unchanged | Transition::Outage => return Ok(()),
        };
        self.sink.log(message).await?;
        Ok(())
    }
}
