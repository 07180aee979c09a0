// SPDX-License-Identifier: Apache-2.0 OR MIT

//! MPL (Multicast Protocol for Low-Power and Lossy Networks) duplicate
//! detection for realm-local multicast (spec §4.5; supplemented feature,
//! see SPEC_FULL.md §F).
//!
//! Grounded on `examples/original_source`'s `src/core/net/ip6_mpl.hpp`
//! (a fixed ring of recently seen `(seed, sequence)` pairs with an
//! age-out) — not translated line for line, reimplemented as a small
//! fixed-capacity ring matching this crate's arena/no-raw-pointers style
//! (see `buf/buffer.rs`'s DESIGN.md entry) rather than OpenThread's
//! linked-list `Message`-based cache.

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MplSeed {
    pub seed_id: u16,
    pub sequence: u8,
}

struct Entry {
    seed: MplSeed,
    /// Ticks remaining before this entry ages out and its slot can be
    /// reused (spec §9(d): "MPL cache-entry lifetime... compile-time
    /// config, exposed as implementation parameters").
    ttl: u8,
}

/// Fixed-capacity ring of recently observed `(seed, sequence)` pairs.
/// `is_duplicate` both answers the query and inserts the entry (matching
/// the original's "seen-set" semantics: observing an MPL data message
/// always records it, whether or not it turned out to be a duplicate).
pub struct MplDedupWindow<const N: usize> {
    entries: [Option<Entry>; N],
    entry_lifetime_ticks: u8,
    next_slot: usize,
}

impl<const N: usize> MplDedupWindow<N> {
    pub fn new(entry_lifetime_ticks: u8) -> Self {
        MplDedupWindow {
            entries: core::array::from_fn(|_| None),
            entry_lifetime_ticks,
            next_slot: 0,
        }
    }

    /// Returns `true` if `seed` was already in the window (a duplicate,
    /// to be dropped per spec §4.5); otherwise records it and returns
    /// `false`.
    pub fn is_duplicate(&mut self, seed: MplSeed) -> bool {
        for entry in self.entries.iter_mut().flatten() {
            if entry.seed == seed {
                entry.ttl = self.entry_lifetime_ticks;
                return true;
            }
        }
        self.insert(seed);
        false
    }

    fn insert(&mut self, seed: MplSeed) {
        if let Some(slot) = self.entries.iter_mut().find(|e| e.is_none()) {
            *slot = Some(Entry {
                seed,
                ttl: self.entry_lifetime_ticks,
            });
            return;
        }
        // Window full: evict round-robin rather than by age, since every
        // live entry's TTL is still running (spec doesn't require LRU,
        // only a bounded window).
        self.entries[self.next_slot] = Some(Entry {
            seed,
            ttl: self.entry_lifetime_ticks,
        });
        self.next_slot = (self.next_slot + 1) % N;
    }

    /// Called once per 1-Hz tick (spec §5: "timeouts... decremented by a
    /// 1-Hz tick, not timer objects").
    pub fn tick(&mut self) {
        for slot in self.entries.iter_mut() {
            if let Some(entry) = slot {
                entry.ttl = entry.ttl.saturating_sub(1);
                if entry.ttl == 0 {
                    *slot = None;
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_observation_of_same_seed_is_duplicate() {
        let mut window: MplDedupWindow<4> = MplDedupWindow::new(5);
        let seed = MplSeed {
            seed_id: 42,
            sequence: 1,
        };
        assert!(!window.is_duplicate(seed));
        assert!(window.is_duplicate(seed));
    }

    #[test]
    fn entries_age_out_after_ttl_ticks() {
        let mut window: MplDedupWindow<4> = MplDedupWindow::new(2);
        let seed = MplSeed {
            seed_id: 1,
            sequence: 1,
        };
        window.is_duplicate(seed);
        window.tick();
        window.tick();
        assert!(window.is_empty());
        assert!(!window.is_duplicate(seed));
    }

    #[test]
    fn window_evicts_when_full() {
        let mut window: MplDedupWindow<2> = MplDedupWindow::new(100);
        window.is_duplicate(MplSeed {
            seed_id: 1,
            sequence: 1,
        });
        window.is_duplicate(MplSeed {
            seed_id: 2,
            sequence: 1,
        });
        window.is_duplicate(MplSeed {
            seed_id: 3,
            sequence: 1,
        });
        assert_eq!(window.len(), 2);
    }
}
