use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use serde::Deserialize;

use super::{BroadcastSource, LifecycleEvent, ShardId};
use crate::error::StartupError;

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ReplayStep {
    pub shard: ShardId,
    /// Pause before delivering this step.
    #[serde(default)]
    pub delay_ms: u64,
    pub event: LifecycleEvent,
}

/// A scripted list of gateway events, stands in for the live gateway when running locally.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayScript {
    steps: Vec<ReplayStep>,
}

impl ReplayScript {
    pub fn load(path: &str) -> Result<Self, StartupError> {
        let raw = fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, StartupError> {
        let steps = serde_json::from_str(raw).map_err(StartupError::Replay)?;
        Ok(ReplayScript { steps })
    }

    pub fn steps(&self) -> &[ReplayStep] {
        &self.steps
    }

    pub async fn play(self, sources: HashMap<ShardId, Arc<BroadcastSource>>) {
        debug!("Replaying {} gateway events", self.steps.len());
        for step in self.steps {
            if step.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(step.delay_ms)).await;
            }
            match sources.get(&step.shard) {
                Some(source) => {
                    source.publish(step.event);
                }
                None => warn!("Replay step targets shard {} which is not part of this cluster", step.shard),
            }
        }
        debug!("Replay finished");
    }
}
