use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use log::{debug, warn};
use tokio::sync::{watch, Notify};
use tokio::time::timeout;
use twilight_model::id::GuildId;

use crate::gateway::ShardId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShardPhase {
    Starting,
    AwaitingGuilds,
    Ready,
    Resyncing,
}

struct InFlightSync {
    generation: u64,
    expected: HashSet<GuildId>,
    arrived: HashSet<GuildId>,
    notify: Arc<Notify>,
}

struct ShardEntry {
    phase: ShardPhase,
    synced_once: bool,
    /// Part of the configured shard set, and so of process readiness.
    initial: bool,
    sync: Option<InFlightSync>,
}

impl ShardEntry {
    fn new(initial: bool) -> Self {
        ShardEntry {
            phase: ShardPhase::Starting,
            synced_once: false,
            initial,
            sync: None,
        }
    }
}

/// Handed out when a shard starts a full sync, redeemed with [`ShardReadinessCoordinator::await_sync`].
#[derive(Debug)]
pub struct SyncTicket {
    pub shard: ShardId,
    pub expected: usize,
    pub resync: bool,
    generation: u64,
    notify: Arc<Notify>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub shard: ShardId,
    pub expected: usize,
    pub arrived: usize,
    pub timed_out: bool,
    pub resync: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed(SyncReport),
    /// A newer full sync for the same shard replaced this one.
    Superseded,
}

enum Progress {
    Pending,
    Complete,
    Superseded,
}

/// Tracks which shards are still receiving their guild set.
///
/// `shards_not_ready` counts syncs in flight. It goes up once per shard sync and back down once
/// when that sync settles, whether all guilds arrived or the deadline fired.
pub struct ShardReadinessCoordinator {
    shards: DashMap<ShardId, ShardEntry>,
    not_ready: AtomicUsize,
    initial_pending: AtomicUsize,
    generation: AtomicU64,
    deadline: Duration,
    ready_tx: watch::Sender<bool>,
    ready_rx: watch::Receiver<bool>,
}

impl ShardReadinessCoordinator {
    pub fn new(shards: &[ShardId], deadline: Duration) -> Self {
        let entries = DashMap::new();
        for shard in shards {
            entries.insert(*shard, ShardEntry::new(true));
        }
        let initial = entries.len();
        let (ready_tx, ready_rx) = watch::channel(initial == 0);

        ShardReadinessCoordinator {
            shards: entries,
            not_ready: AtomicUsize::new(0),
            initial_pending: AtomicUsize::new(initial),
            generation: AtomicU64::new(0),
            deadline,
            ready_tx,
            ready_rx,
        }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn begin_sync(&self, shard: ShardId, guilds: &[GuildId]) -> SyncTicket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let notify = Arc::new(Notify::new());
        let expected: HashSet<GuildId> = guilds.iter().copied().collect();
        let expected_count = expected.len();

        let mut entry = self.shards.entry(shard).or_insert_with(|| ShardEntry::new(false));
        let resync = entry.synced_once;
        match entry.sync.take() {
            Some(previous) => {
                debug!("Shard {} restarted its sync before the previous one settled", shard);
                previous.notify.notify_one();
            }
            None => {
                self.not_ready.fetch_add(1, Ordering::SeqCst);
            }
        }

        entry.phase = if resync {
            ShardPhase::Resyncing
        } else {
            ShardPhase::AwaitingGuilds
        };
        if expected.is_empty() {
            notify.notify_one();
        }
        entry.sync = Some(InFlightSync {
            generation,
            expected,
            arrived: HashSet::new(),
            notify: notify.clone(),
        });

        SyncTicket {
            shard,
            expected: expected_count,
            resync,
            generation,
            notify,
        }
    }

    /// Counts a guild arrival towards the shard's in-flight sync. Returns whether it counted.
    pub fn record_arrival(&self, shard: ShardId, guild: GuildId) -> bool {
        let mut entry = match self.shards.get_mut(&shard) {
            Some(entry) => entry,
            None => return false,
        };
        let sync = match entry.sync.as_mut() {
            Some(sync) => sync,
            None => return false,
        };
        if !sync.expected.contains(&guild) || !sync.arrived.insert(guild) {
            return false;
        }
        if sync.arrived.len() == sync.expected.len() {
            sync.notify.notify_one();
        }
        true
    }

    /// Waits until every expected guild arrived or the deadline expires, then promotes the shard
    /// to ready. Expiry resolves with whatever arrived.
    pub async fn await_sync(&self, ticket: &SyncTicket) -> SyncOutcome {
        let wait = async {
            loop {
                match self.progress(ticket) {
                    Progress::Pending => ticket.notify.notified().await,
                    _ => break,
                }
            }
        };
        let expired = timeout(self.deadline, wait).await.is_err();
        self.finish(ticket, expired)
    }

    fn progress(&self, ticket: &SyncTicket) -> Progress {
        match self.shards.get(&ticket.shard) {
            Some(entry) => match &entry.sync {
                Some(sync) if sync.generation == ticket.generation => {
                    if sync.arrived.len() >= sync.expected.len() {
                        Progress::Complete
                    } else {
                        Progress::Pending
                    }
                }
                _ => Progress::Superseded,
            },
            None => Progress::Superseded,
        }
    }

    fn finish(&self, ticket: &SyncTicket, expired: bool) -> SyncOutcome {
        let mut entry = match self.shards.get_mut(&ticket.shard) {
            Some(entry) => entry,
            None => return SyncOutcome::Superseded,
        };
        let sync = match entry.sync.take() {
            Some(sync) if sync.generation == ticket.generation => sync,
            other => {
                entry.sync = other;
                return SyncOutcome::Superseded;
            }
        };

        let first_sync = !entry.synced_once;
        let counts_for_process = entry.initial;
        entry.phase = ShardPhase::Ready;
        entry.synced_once = true;
        drop(entry);

        self.release_not_ready();
        if first_sync && counts_for_process && self.initial_pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            debug!("Every shard finished its initial sync");
            let _ = self.ready_tx.send(true);
        }

        let arrived = sync.arrived.len();
        SyncOutcome::Completed(SyncReport {
            shard: ticket.shard,
            expected: sync.expected.len(),
            arrived,
            timed_out: expired && arrived < sync.expected.len(),
            resync: ticket.resync,
        })
    }

    fn release_not_ready(&self) {
        let released = self
            .not_ready
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| count.checked_sub(1));
        if released.is_err() {
            warn!("Shard sync settled while no shard was marked as not ready");
        }
    }

    pub fn shards_not_ready(&self) -> usize {
        self.not_ready.load(Ordering::SeqCst)
    }

    pub fn phase(&self, shard: ShardId) -> ShardPhase {
        self.shards
            .get(&shard)
            .map(|entry| entry.phase)
            .unwrap_or(ShardPhase::Starting)
    }

    pub fn is_process_ready(&self) -> bool {
        *self.ready_rx.borrow()
    }

    /// Resolves with `true` once every configured shard finished its first sync, or `false` when
    /// `limit` runs out first.
    pub async fn wait_until_ready(&self, limit: Duration) -> bool {
        let mut ready = self.ready_rx.clone();
        let wait = async move {
            loop {
                let done = *ready.borrow();
                if done {
                    return true;
                }
                if ready.changed().await.is_err() {
                    return false;
                }
            }
        };
        timeout(limit, wait).await.unwrap_or(false)
    }
}
