//! The gateway as seen by the lifecycle core: a typed stream of lifecycle events per shard.
//!
//! The real transport lives outside this crate. [`BroadcastSource`] is the in-process
//! implementation used by the binary (fed by [`ReplayScript`]) and by the tests.

use std::fmt;
use std::pin::Pin;

use futures_util::stream::Stream;
use serde::{Deserialize, Serialize};
use twilight_model::id::GuildId;

use crate::error::GatewayError;

mod broadcast;
mod replay;

pub use broadcast::BroadcastSource;
pub use replay::{ReplayScript, ReplayStep};

pub type ShardId = u64;

pub type EventStream = Pin<Box<dyn Stream<Item = Result<LifecycleEvent, GatewayError>> + Send>>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// Initial (or post-reconnect) list of every guild the shard owns.
    FullSync { shard: ShardId, guilds: Vec<GuildId> },
    /// Session resumed after a websocket disconnection, no guild data.
    Resumed { shard: ShardId },
    GuildAvailable { guild: GuildId, name: String },
    /// `outage` is true when the guild is only temporarily unreachable,
    /// false when we were removed from it or it was deleted.
    GuildGone {
        guild: GuildId,
        outage: bool,
        #[serde(default)]
        name: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventCategory {
    FullSync,
    Resume,
    GuildAvailable,
    GuildGone,
}

impl EventCategory {
    pub const ALL: [EventCategory; 4] = [
        EventCategory::FullSync,
        EventCategory::Resume,
        EventCategory::GuildAvailable,
        EventCategory::GuildGone,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::FullSync => "FullSync",
            EventCategory::Resume => "Resume",
            EventCategory::GuildAvailable => "GuildAvailable",
            EventCategory::GuildGone => "GuildGone",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LifecycleEvent {
    pub fn category(&self) -> EventCategory {
        match self {
            LifecycleEvent::FullSync { .. } => EventCategory::FullSync,
            LifecycleEvent::Resumed { .. } => EventCategory::Resume,
            LifecycleEvent::GuildAvailable { .. } => EventCategory::GuildAvailable,
            LifecycleEvent::GuildGone { .. } => EventCategory::GuildGone,
        }
    }
}

/// One shard's connection to the gateway.
///
/// Every call to `subscribe` yields a new stream that receives the events delivered after the
/// call, in delivery order. A subscription error does not end the stream.
pub trait ShardEventSource: Send + Sync {
    fn shard_id(&self) -> ShardId;

    fn subscribe(&self) -> EventStream;
}
