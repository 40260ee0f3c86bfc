use futures_util::stream;
use tokio::sync::broadcast::{self, error::RecvError};

use super::{EventStream, LifecycleEvent, ShardEventSource, ShardId};
use crate::error::GatewayError;

/// Fan-out source backed by a tokio broadcast channel, each subscription gets its own receiver.
pub struct BroadcastSource {
    shard: ShardId,
    sender: broadcast::Sender<LifecycleEvent>,
}

impl BroadcastSource {
    pub fn new(shard: ShardId, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        BroadcastSource { shard, sender }
    }

    /// Delivers an event to every current subscriber, returns how many received it.
    pub fn publish(&self, event: LifecycleEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}

impl ShardEventSource for BroadcastSource {
    fn shard_id(&self) -> ShardId {
        self.shard
    }

    fn subscribe(&self) -> EventStream {
        let shard = self.shard;
        let receiver = self.sender.subscribe();
        Box::pin(stream::unfold(receiver, move |mut receiver| async move {
            match receiver.recv().await {
                Ok(event) => Some((Ok(event), receiver)),
                Err(RecvError::Lagged(skipped)) => Some((Err(GatewayError::Lagged { shard, skipped }), receiver)),
                Err(RecvError::Closed) => None,
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;
    use twilight_model::id::GuildId;

    use super::*;

    #[tokio::test]
    async fn subscribers_see_events_after_subscribing() {
        let source = BroadcastSource::new(3, 8);
        assert_eq!(source.publish(LifecycleEvent::Resumed { shard: 3 }), 0);

        let mut events = source.subscribe();
        let event = LifecycleEvent::GuildAvailable {
            guild: GuildId(9),
            name: String::from("nine"),
        };
        assert_eq!(source.publish(event.clone()), 1);

        assert_eq!(events.next().await.unwrap().unwrap(), event);
    }

    #[tokio::test]
    async fn lagging_is_reported_and_stream_continues() {
        let source = BroadcastSource::new(0, 1);
        let mut events = source.subscribe();
        source.publish(LifecycleEvent::Resumed { shard: 0 });
        source.publish(LifecycleEvent::Resumed { shard: 0 });

        match events.next().await {
            Some(Err(GatewayError::Lagged { shard: 0, skipped: 1 })) => {}
            other => panic!("expected a lag error, got {:?}", other),
        }
        assert_eq!(events.next().await.unwrap().unwrap(), LifecycleEvent::Resumed { shard: 0 });
    }

    #[tokio::test]
    async fn stream_ends_when_source_is_dropped() {
        let source = BroadcastSource::new(0, 4);
        let mut events = source.subscribe();
        drop(source);
        assert!(events.next().await.is_none());
    }
}
