use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::trace;
use twilight_model::id::GuildId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Availability {
    /// Never observed, or removed since.
    Unknown,
    Unavailable,
    Available,
}

/// What a single event did to a guild.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Unknown -> Available, a guild we were not tracking showed up.
    Joined,
    /// Unavailable -> Available, pending or outage guild came (back) online.
    Recovered,
    Unchanged,
    /// -> Unavailable because of an outage.
    Outage,
    /// The guild is gone for good, with the best name we have for it.
    Left { name: Option<String> },
}

struct TrackedGuild {
    availability: Availability,
    name: Option<String>,
}

/// Authoritative availability of every guild this process has seen.
///
/// Each transition happens under the map's per-key lock, so concurrent shard tasks can update
/// different (or the same) guilds without any outer lock.
pub struct GuildAvailabilityTracker {
    guilds: DashMap<GuildId, TrackedGuild>,
    available: AtomicUsize,
    unavailable: AtomicUsize,
}

impl Default for GuildAvailabilityTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl GuildAvailabilityTracker {
    pub fn new() -> Self {
        GuildAvailabilityTracker {
            guilds: DashMap::new(),
            available: AtomicUsize::new(0),
            unavailable: AtomicUsize::new(0),
        }
    }

    /// Marks every guild from a full sync as pending, unless it is already available.
    /// Returns how many guilds became pending.
    pub fn register_pending(&self, ids: &[GuildId]) -> usize {
        let mut pending = 0;
        for id in ids {
            match self.guilds.entry(*id) {
                // already pending, or available and only confirmed by the sync
                Entry::Occupied(_) => {}
                Entry::Vacant(entry) => {
                    entry.insert(TrackedGuild {
                        availability: Availability::Unavailable,
                        name: None,
                    });
                    self.unavailable.fetch_add(1, Ordering::SeqCst);
                    pending += 1;
                }
            }
        }
        trace!("{} of {} synced guilds are pending", pending, ids.len());
        pending
    }

    pub fn mark_available(&self, id: GuildId, name: &str) -> Transition {
        match self.guilds.entry(id) {
            Entry::Occupied(mut entry) => {
                let guild = entry.get_mut();
                guild.name = Some(name.to_string());
                match guild.availability {
                    Availability::Available => Transition::Unchanged,
                    _ => {
                        guild.availability = Availability::Available;
                        self.unavailable.fetch_sub(1, Ordering::SeqCst);
                        self.available.fetch_add(1, Ordering::SeqCst);
                        Transition::Recovered
                    }
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(TrackedGuild {
                    availability: Availability::Available,
                    name: Some(name.to_string()),
                });
                self.available.fetch_add(1, Ordering::SeqCst);
                Transition::Joined
            }
        }
    }

    /// Outage: the guild is still ours, just unreachable for now.
    pub fn mark_unavailable(&self, id: GuildId) -> Transition {
        match self.guilds.entry(id) {
            Entry::Occupied(mut entry) => {
                let guild = entry.get_mut();
                match guild.availability {
                    Availability::Available => {
                        guild.availability = Availability::Unavailable;
                        self.available.fetch_sub(1, Ordering::SeqCst);
                        self.unavailable.fetch_add(1, Ordering::SeqCst);
                        Transition::Outage
                    }
                    _ => Transition::Unchanged,
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(TrackedGuild {
                    availability: Availability::Unavailable,
                    name: None,
                });
                self.unavailable.fetch_add(1, Ordering::SeqCst);
                Transition::Outage
            }
        }
    }

    /// The bot was removed from the guild or it was deleted. Unknown guilds are tolerated.
    pub fn mark_removed(&self, id: GuildId, name: Option<String>) -> Transition {
        let cached = match self.guilds.remove(&id) {
            Some((_, guild)) => {
                match guild.availability {
                    Availability::Available => self.available.fetch_sub(1, Ordering::SeqCst),
                    _ => self.unavailable.fetch_sub(1, Ordering::SeqCst),
                };
                guild.name
            }
            None => None,
        };
        Transition::Left { name: name.or(cached) }
    }

    pub fn availability(&self, id: GuildId) -> Availability {
        self.guilds
            .get(&id)
            .map(|guild| guild.availability)
            .unwrap_or(Availability::Unknown)
    }

    pub fn is_available(&self, id: GuildId) -> bool {
        self.availability(id) == Availability::Available
    }

    pub fn is_unavailable(&self, id: GuildId) -> bool {
        self.availability(id) == Availability::Unavailable
    }

    pub fn name(&self, id: GuildId) -> Option<String> {
        self.guilds.get(&id).and_then(|guild| guild.name.clone())
    }

    pub fn count_available(&self, ids: &[GuildId]) -> usize {
        ids.iter().filter(|id| self.is_available(**id)).count()
    }

    pub fn available_count(&self) -> usize {
        self.available.load(Ordering::SeqCst)
    }

    pub fn unavailable_count(&self) -> usize {
        self.unavailable.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_sync_marks_unknown_guilds_pending() {
        let tracker = GuildAvailabilityTracker::new();
        tracker.mark_available(GuildId(1), "one");

        assert_eq!(tracker.register_pending(&[GuildId(1), GuildId(2), GuildId(3)]), 2);
        assert!(tracker.is_available(GuildId(1)));
        assert!(tracker.is_unavailable(GuildId(2)));
        assert_eq!(tracker.unavailable_count(), 2);
        assert_eq!(tracker.available_count(), 1);
    }

    #[test]
    fn pending_guilds_recover_instead_of_joining() {
        let tracker = GuildAvailabilityTracker::new();
        tracker.register_pending(&[GuildId(1)]);

        assert_eq!(tracker.mark_available(GuildId(1), "one"), Transition::Recovered);
        assert_eq!(tracker.mark_available(GuildId(2), "two"), Transition::Joined);
        assert_eq!(tracker.unavailable_count(), 0);
        assert_eq!(tracker.available_count(), 2);
    }

    #[test]
    fn repeated_availability_is_idempotent() {
        let tracker = GuildAvailabilityTracker::new();
        tracker.mark_available(GuildId(5), "five");

        assert_eq!(tracker.mark_available(GuildId(5), "five"), Transition::Unchanged);
        assert_eq!(tracker.availability(GuildId(5)), Availability::Available);
        assert_eq!(tracker.available_count(), 1);
        assert_eq!(tracker.unavailable_count(), 0);
    }

    #[test]
    fn outage_then_removal_forgets_the_guild() {
        let tracker = GuildAvailabilityTracker::new();
        tracker.mark_available(GuildId(4), "Dee");

        assert_eq!(tracker.mark_unavailable(GuildId(4)), Transition::Outage);
        assert!(!tracker.is_available(GuildId(4)));
        assert_eq!(tracker.mark_unavailable(GuildId(4)), Transition::Unchanged);

        assert_eq!(
            tracker.mark_removed(GuildId(4), None),
            Transition::Left {
                name: Some(String::from("Dee"))
            }
        );
        assert_eq!(tracker.availability(GuildId(4)), Availability::Unknown);
        assert_eq!(tracker.unavailable_count(), 0);
        assert_eq!(tracker.available_count(), 0);
    }

    #[test]
    fn removing_an_unknown_guild_is_tolerated() {
        let tracker = GuildAvailabilityTracker::new();
        assert_eq!(tracker.mark_removed(GuildId(77), None), Transition::Left { name: None });
        assert_eq!(tracker.availability(GuildId(77)), Availability::Unknown);
    }

    #[test]
    fn event_name_wins_over_cached_name() {
        let tracker = GuildAvailabilityTracker::new();
        tracker.mark_available(GuildId(8), "old");
        assert_eq!(
            tracker.mark_removed(GuildId(8), Some(String::from("new"))),
            Transition::Left {
                name: Some(String::from("new"))
            }
        );
    }

    #[test]
    fn state_follows_last_transition() {
        let tracker = GuildAvailabilityTracker::new();
        let id = GuildId(10);
        let steps: Vec<(&str, Availability)> = vec![
            ("sync", Availability::Unavailable),
            ("available", Availability::Available),
            ("outage", Availability::Unavailable),
            ("available", Availability::Available),
            ("available", Availability::Available),
            ("removed", Availability::Unknown),
            ("outage", Availability::Unavailable),
            ("sync", Availability::Unavailable),
            ("available", Availability::Available),
        ];

        for (step, expected) in steps {
            match step {
                "sync" => {
                    tracker.register_pending(&[id]);
                }
                "available" => {
                    tracker.mark_available(id, "ten");
                }
                "outage" => {
                    tracker.mark_unavailable(id);
                }
                _ => {
                    tracker.mark_removed(id, None);
                }
            }
            assert_eq!(tracker.availability(id), expected, "after {}", step);
        }
        assert_eq!(tracker.available_count(), 1);
        assert_eq!(tracker.unavailable_count(), 0);
    }
}
