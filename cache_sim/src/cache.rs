//! Set-associative cache model.
//!
//! Only metadata is modeled: tags, validity, dirty state and a bounded LRU
//! rank per block. No payload bytes move. Every access mutates at most one
//! set and returns the latency it cost: 0 on a hit, the miss latency on a
//! plain miss, twice that when a dirty victim had to be written back.

use crate::geometry::{AddressFields, CacheGeometry};

#[cfg(feature = "stat")]
use crate::stat::{AddStats, Stats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Read,
    Write,
}

/// One cache line's worth of bookkeeping. `lru` counts up to the
/// associativity: the rank-0 block of a full set is the eviction victim.
#[derive(Debug, Clone, Copy, Default)]
struct Block {
    tag: u32,
    valid: bool,
    dirty: bool,
    lru: u32,
}

struct Set {
    blocks: Vec<Block>,
}

pub struct Cache {
    geometry: CacheGeometry,
    sets: Vec<Set>,
    #[cfg(feature = "stat")]
    stat: stat::CacheStat,
}

impl Cache {
    /// Builds a cache with every block invalid, clean and rank zero.
    /// `geometry` has already been validated by [`CacheGeometry::new`].
    pub fn new(geometry: CacheGeometry) -> Self {
        let ways = geometry.associativity() as usize;
        let sets = (0..geometry.num_sets())
            .map(|_| Set::new(ways))
            .collect();
        Self {
            geometry,
            sets,
            #[cfg(feature = "stat")]
            stat: Default::default(),
        }
    }

    pub fn geometry(&self) -> &CacheGeometry {
        &self.geometry
    }

    /// Performs one simulated memory reference and returns its latency in
    /// cycles. A write that hits marks the block dirty; installs on the miss
    /// paths always load clean (write-allocate, with the write itself
    /// accounted on a later hit). Recency is deliberately not promoted on
    /// hits: ranks move only when a line is installed or evicted.
    pub fn access(&mut self, address: u32, kind: AccessKind) -> u32 {
        let AddressFields { tag, index, .. } = self.geometry.decompose(address);
        let set = &mut self.sets[index as usize];
        let latency = set.access(
            tag,
            kind,
            self.geometry.associativity(),
            self.geometry.miss_latency(),
        );
        log::trace!(
            "{kind:?} {address:#010x} (tag {tag:#x}, set {index}): {latency} cycles"
        );
        #[cfg(feature = "stat")]
        self.stat.record(latency, self.geometry.miss_latency());
        latency
    }
}

impl Set {
    fn new(ways: usize) -> Self {
        Self {
            blocks: vec![Block::default(); ways],
        }
    }

    fn access(&mut self, tag: u32, kind: AccessKind, associativity: u32, miss_latency: u32) -> u32 {
        debug_assert!(self.valid_tags_distinct());

        if let Some(block) = self.blocks.iter_mut().find(|b| b.valid && b.tag == tag) {
            if kind == AccessKind::Write {
                block.dirty = true;
            }
            return 0;
        }

        if let Some(block) = self.blocks.iter_mut().find(|b| !b.valid) {
            block.valid = true;
            block.tag = tag;
            block.dirty = false;
            block.lru = associativity;
            self.shift_lru();
            return miss_latency;
        }

        // Full set: exactly one block holds rank 0. The replacement
        // bookkeeping guarantees this; a set without a victim is a bug, not
        // a recoverable condition.
        let mut write_back = false;
        let mut victim_found = false;
        for block in &mut self.blocks {
            if block.lru == 0 {
                assert!(!victim_found, "two rank-0 blocks in one set");
                victim_found = true;
                write_back = block.dirty;
                block.valid = true;
                block.dirty = false;
                block.tag = tag;
                block.lru = associativity - 1;
            } else {
                block.lru -= 1;
            }
        }
        assert!(victim_found, "full set with no rank-0 block");

        if write_back {
            2 * miss_latency
        } else {
            miss_latency
        }
    }

    /// Ages every resident block by one rank. A freshly installed block
    /// enters at rank `associativity` so the shift leaves it most recently
    /// used at `associativity - 1`; this uniform shift is also what keeps a
    /// rank-0 victim available once the set fills up.
    fn shift_lru(&mut self) {
        for block in &mut self.blocks {
            if block.valid && block.lru != 0 {
                block.lru -= 1;
            }
        }
    }

    fn valid_tags_distinct(&self) -> bool {
        let mut tags: Vec<u32> = self
            .blocks
            .iter()
            .filter(|b| b.valid)
            .map(|b| b.tag)
            .collect();
        tags.sort_unstable();
        tags.windows(2).all(|w| w[0] != w[1])
    }
}

#[cfg(feature = "stat")]
impl AddStats for Cache {
    fn add_stats(&self, buf: &mut Stats) {
        buf.push(Box::new(self.stat));
    }
}

#[cfg(feature = "stat")]
mod stat {
    use std::fmt;

    use crate::stat::*;

    #[derive(Clone, Copy, Default)]
    pub struct CacheStat {
        hits: usize,
        misses: usize,
        write_backs: usize,
        cycles: u64,
    }

    impl CacheStat {
        pub fn record(&mut self, latency: u32, miss_latency: u32) {
            if latency == 0 {
                self.hits += 1;
            } else {
                self.misses += 1;
                if latency == 2 * miss_latency {
                    self.write_backs += 1;
                }
            }
            self.cycles += u64::from(latency);
        }
    }

    impl Stat for CacheStat {
        fn view(&self, _: usize) -> Box<dyn StatView + '_> {
            Box::new(CacheStatView { stat: self })
        }
    }

    pub struct CacheStatView<'a> {
        stat: &'a CacheStat,
    }

    impl StatView for CacheStatView<'_> {
        fn header(&self) -> &'static str {
            "cache accesses"
        }
        fn width(&self) -> usize {
            36
        }
    }

    impl fmt::Display for CacheStatView<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let total = self.stat.hits + self.stat.misses;
            let rate = if total == 0 {
                0.0
            } else {
                self.stat.hits as f64 / total as f64 * 100.0
            };
            writeln!(f, "  {:>12}:{:>12}", "hits", self.stat.hits)?;
            writeln!(f, "  {:>12}:{:>12}", "misses", self.stat.misses)?;
            writeln!(f, "  {:>12}:{:>12}", "write-backs", self.stat.write_backs)?;
            writeln!(f, "  {:>12}:{:>12}", "cycles", self.stat.cycles)?;
            write!(f, "  {:>12}:{:>11.2}%", "hit rate", rate)
        }
    }
}
