use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{Stream, StreamExt};
use log::debug;

use crate::core::stats::LifecycleStats;
use crate::error::EventHandlerError;
use crate::gateway::ShardId;
use crate::keeper_error;

/// How a subscription reacts to a failed event. The default retries forever without delay.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: Option<u64>,
    backoff: Option<Duration>,
}

impl RetryPolicy {
    pub fn unbounded() -> Self {
        RetryPolicy::default()
    }

    pub fn with_max_retries(mut self, max_retries: u64) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = Some(backoff);
        self
    }

    /// Whether the subscription may carry on after `failures` failed events.
    pub fn allows(&self, failures: u64) -> bool {
        match self.max_retries {
            Some(max) => failures <= max,
            None => true,
        }
    }

    pub fn backoff(&self) -> Option<Duration> {
        self.backoff
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionEnd {
    /// The source stopped producing events.
    Exhausted,
    GaveUp { failures: u64 },
}

/// Keeps one subscription alive: every failed event is logged and counted, then the loop moves
/// on to the next event. The failed event is not delivered again.
pub struct Supervisor {
    label: &'static str,
    shard: ShardId,
    policy: RetryPolicy,
    stats: Arc<LifecycleStats>,
}

impl Supervisor {
    pub fn new(label: &'static str, shard: ShardId, policy: RetryPolicy, stats: Arc<LifecycleStats>) -> Self {
        Supervisor {
            label,
            shard,
            policy,
            stats,
        }
    }

    pub async fn run<S, T, F, Fut>(&self, mut events: S, mut handler: F) -> SubscriptionEnd
    where
        S: Stream<Item = Result<T, EventHandlerError>> + Unpin,
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<(), EventHandlerError>>,
    {
        let mut failures = 0;
        while let Some(item) = events.next().await {
            let outcome = match item {
                Ok(event) => handler(event).await,
                Err(e) => Err(e),
            };

            if let Err(e) = outcome {
                failures += 1;
                self.stats.handler_failed(self.label);
                keeper_error!("Error while processing {} on shard {}: {}", self.label, self.shard, e);

                if !self.policy.allows(failures) {
                    keeper_error!(
                        "Giving up on {} for shard {} after {} failures",
                        self.label,
                        self.shard,
                        failures
                    );
                    return SubscriptionEnd::GaveUp { failures };
                }
                if let Some(backoff) = self.policy.backoff() {
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        debug!("{} subscription for shard {} ended", self.label, self.shard);
        SubscriptionEnd::Exhausted
    }
}
