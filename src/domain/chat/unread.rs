//! Per-room unread message counters.

use std::collections::{BTreeMap, HashMap};

use super::room::RoomId;

/// Non-negative unread count per room.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnreadCounters {
    counts: BTreeMap<RoomId, u32>,
}

impl UnreadCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores counters read from persistence.
    pub fn from_map(counts: HashMap<RoomId, u32>) -> Self {
        Self {
            counts: counts.into_iter().collect(),
        }
    }

    /// Snapshot suitable for writing back to persistence.
    pub fn to_map(&self) -> HashMap<RoomId, u32> {
        self.counts
            .iter()
            .map(|(room, count)| (room.clone(), *count))
            .collect()
    }

    pub fn get(&self, room: &RoomId) -> u32 {
        self.counts.get(room).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.counts.values().fold(0u32, |acc, c| acc.saturating_add(*c))
    }

    /// Adds one unread message and returns the new count.
    pub fn increment(&mut self, room: &RoomId) -> u32 {
        let count = self.counts.entry(room.clone()).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    /// Zeroes the counter. Returns true if it was not already zero.
    ///
    /// The zero entry is kept so the reset is persisted explicitly.
    pub fn reset(&mut self, room: &RoomId) -> bool {
        let previous = self.counts.insert(room.clone(), 0);
        previous.map_or(true, |c| c != 0)
    }

    /// Deletes the counter entry. Returns true if an entry existed.
    pub fn remove(&mut self, room: &RoomId) -> bool {
        self.counts.remove(room).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(name: &str) -> RoomId {
        RoomId::new(name).unwrap()
    }

    #[test]
    fn increment_counts_per_room() {
        let mut counters = UnreadCounters::new();
        assert_eq!(counters.increment(&room("chat_a")), 1);
        assert_eq!(counters.increment(&room("chat_a")), 2);
        assert_eq!(counters.increment(&room("chat_b")), 1);

        assert_eq!(counters.get(&room("chat_a")), 2);
        assert_eq!(counters.total(), 3);
    }

    #[test]
    fn reset_keeps_a_zero_entry() {
        let mut counters = UnreadCounters::new();
        counters.increment(&room("chat_a"));

        assert!(counters.reset(&room("chat_a")));
        assert_eq!(counters.get(&room("chat_a")), 0);
        assert_eq!(counters.to_map().get(&room("chat_a")), Some(&0));

        assert!(!counters.reset(&room("chat_a")));
    }

    #[test]
    fn remove_deletes_entry() {
        let mut counters = UnreadCounters::new();
        counters.increment(&room("chat_a"));

        assert!(counters.remove(&room("chat_a")));
        assert!(counters.to_map().is_empty());
        assert!(!counters.remove(&room("chat_a")));
    }

    #[test]
    fn round_trips_through_map() {
        let mut counters = UnreadCounters::new();
        counters.increment(&room("chat_a"));
        counters.increment(&room("chat_b"));
        counters.increment(&room("chat_b"));

        let restored = UnreadCounters::from_map(counters.to_map());
        assert_eq!(restored, counters);
    }
}
