//! Fixed-size circular statistics ring for the token bucket.
//!
//! Records `(normalized_empty_factor, tokens_left, timestamp_us)` samples whenever a consume
//! operation finds the bucket short. Collection is lossy by design (§9): the ring overwrites its
//! oldest slot once full.

use crate::options::OBJECT_STATISTICS_ENTRIES_SIZE;
use crate::wire::{ObjectStatisticsRaw, TbStatsRaw};

#[derive(Debug, Clone, Copy)]
struct Entry {
    normalized_empty_factor: f32,
    tokens_left: f64,
    timestamp_us: u64,
}

/// Token-bucket statistics ring ("TBStats" in the reference implementation).
#[derive(Debug)]
pub struct TokenBucketStatistics {
    entries: Vec<Option<Entry>>,
    position: usize,
    total_stats: u64,
}

impl TokenBucketStatistics {
    pub fn new() -> Self {
        TokenBucketStatistics {
            entries: vec![None; OBJECT_STATISTICS_ENTRIES_SIZE],
            position: 0,
            total_stats: 0,
        }
    }

    /// Overwrites the slot at `total_stats % capacity`, as the source's ring does.
    pub fn store_stats_entry(&mut self, normalized_empty_factor: f32, tokens_left: f64, timestamp_us: u64) {
        let capacity = self.entries.len();
        let position = (self.total_stats % capacity as u64) as usize;
        self.entries[position] = Some(Entry {
            normalized_empty_factor,
            tokens_left,
            timestamp_us,
        });
        self.position = position;
        self.total_stats += 1;
    }

    /// Drops entries older than `now - sliding_window`. If the newest entry is itself stale, the
    /// whole ring is discarded (there is nothing worth keeping).
    pub fn garbage_collect(&mut self, now_us: u64, sliding_window_us: u64) {
        let newest = self.entries[self.position];
        let newest_is_stale = match newest {
            Some(entry) => now_us.saturating_sub(entry.timestamp_us) > sliding_window_us,
            None => return,
        };

        if newest_is_stale {
            for slot in self.entries.iter_mut() {
                *slot = None;
            }
            self.total_stats = 0;
            self.position = 0;
            return;
        }

        for slot in self.entries.iter_mut() {
            if let Some(entry) = slot {
                if now_us.saturating_sub(entry.timestamp_us) > sliding_window_us {
                    *slot = None;
                }
            }
        }
    }

    /// Drains all still-valid entries into `raw`, then fully resets the ring (lossy collection).
    pub fn collect_stats(&mut self, raw: &mut ObjectStatisticsRaw) -> usize {
        let mut count = 0;
        for slot in self.entries.iter() {
            if count >= OBJECT_STATISTICS_ENTRIES_SIZE {
                break;
            }
            if let Some(entry) = slot {
                raw.entries[count] = TbStatsRaw {
                    normalized_empty: entry.normalized_empty_factor,
                    tokens_left: entry.tokens_left,
                };
                count += 1;
            }
        }
        raw.total = count as i32;

        for slot in self.entries.iter_mut() {
            *slot = None;
        }
        self.total_stats = 0;
        self.position = 0;

        count
    }
}

impl Default for TokenBucketStatistics {
    fn default() -> Self {
        TokenBucketStatistics::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_drains_and_resets() {
        let mut ring = TokenBucketStatistics::new();
        ring.store_stats_entry(0.5, 10.0, 1_000);
        ring.store_stats_entry(0.75, 5.0, 2_000);

        let mut raw = ObjectStatisticsRaw::default();
        let collected = ring.collect_stats(&mut raw);
        assert_eq!(collected, 2);
        assert_eq!(raw.total, 2);

        let mut raw2 = ObjectStatisticsRaw::default();
        let collected_again = ring.collect_stats(&mut raw2);
        assert_eq!(collected_again, 0);
    }

    #[test]
    fn overwrites_oldest_slot_once_full() {
        let mut ring = TokenBucketStatistics::new();
        for i in 0..(OBJECT_STATISTICS_ENTRIES_SIZE + 10) {
            ring.store_stats_entry(0.1, i as f64, i as u64);
        }
        let mut raw = ObjectStatisticsRaw::default();
        let collected = ring.collect_stats(&mut raw);
        assert_eq!(collected, OBJECT_STATISTICS_ENTRIES_SIZE);
    }

    #[test]
    fn garbage_collection_discards_stale_entries() {
        let mut ring = TokenBucketStatistics::new();
        ring.store_stats_entry(0.2, 1.0, 0);
        ring.garbage_collect(10_000_000, 5_000_000);

        let mut raw = ObjectStatisticsRaw::default();
        let collected = ring.collect_stats(&mut raw);
        assert_eq!(collected, 0);
    }
}
