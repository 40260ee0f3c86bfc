use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub use guilds::{Availability, GuildAvailabilityTracker, Transition};
pub use shards::{ShardPhase, ShardReadinessCoordinator, SyncOutcome, SyncReport, SyncTicket};

use crate::gateway::ShardId;

mod guilds;
mod shards;

/// Guild and shard state shared by every shard's event tasks.
pub struct LifecycleState {
    pub guilds: GuildAvailabilityTracker,
    pub shards: ShardReadinessCoordinator,
    membership_logging: AtomicBool,
}

impl LifecycleState {
    pub fn new(shards: &[ShardId], sync_deadline: Duration) -> Self {
        LifecycleState {
            guilds: GuildAvailabilityTracker::new(),
            shards: ShardReadinessCoordinator::new(shards, sync_deadline),
            membership_logging: AtomicBool::new(false),
        }
    }

    /// Turns on join/leave log lines. Called once the bot announced it is ready.
    pub fn arm_membership_logging(&self) {
        self.membership_logging.store(true, Ordering::SeqCst);
    }

    /// Join/leave lines only go out in steady state: armed, and no shard mid-sync.
    pub fn should_forward_membership(&self) -> bool {
        self.membership_logging.load(Ordering::SeqCst) && self.shards.shards_not_ready() == 0
    }
}

#[cfg(test)]
mod tests {
    use twilight_model::id::GuildId;

    use super::*;

    #[tokio::test]
    async fn membership_is_forwarded_only_when_armed_and_quiet() {
        let state = LifecycleState::new(&[0], Duration::from_secs(120));
        assert!(!state.should_forward_membership());

        state.arm_membership_logging();
        assert!(state.should_forward_membership());

        let ticket = state.shards.begin_sync(0, &[GuildId(1)]);
        assert!(!state.should_forward_membership());

        state.shards.record_arrival(0, GuildId(1));
        state.shards.await_sync(&ticket).await;
        assert!(state.should_forward_membership());
    }
}
