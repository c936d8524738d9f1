//! Trace driver: feeds a parsed trace through one cache and tallies the
//! results the way the surrounding tooling consumes them (hit when the
//! returned latency is zero, write-back when it is doubled).

use crate::{
    cache::Cache,
    trace::{Trace, TraceRecord},
};

#[cfg(feature = "stat")]
use crate::stat::{AddStats, Stats};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimResult {
    pub accesses: usize,
    pub hits: usize,
    pub misses: usize,
    pub write_backs: usize,
    pub total_latency: u64,
}

pub struct Simulator {
    cache: Cache,
    result: SimResult,
    #[cfg(feature = "stat")]
    stat_builder: stat::SimStatBuilder,
}

impl Simulator {
    pub fn new(cache: Cache) -> Self {
        Self {
            cache,
            result: SimResult::default(),
            #[cfg(feature = "stat")]
            stat_builder: stat::SimStatBuilder::new(),
        }
    }

    /// Simulates one memory reference, returning its latency.
    pub fn step(&mut self, record: TraceRecord) -> u32 {
        let latency = self.cache.access(record.address, record.kind);
        self.result.accesses += 1;
        self.result.total_latency += u64::from(latency);
        if latency == 0 {
            self.result.hits += 1;
        } else {
            self.result.misses += 1;
            if latency == 2 * self.cache.geometry().miss_latency() {
                self.result.write_backs += 1;
            }
        }
        log::debug!(
            "{:?} {:#010x}: {}",
            record.kind,
            record.address,
            if latency == 0 { "hit" } else { "miss" }
        );
        latency
    }

    pub fn run(&mut self, trace: &Trace) -> SimResult {
        for &record in trace.records() {
            self.step(record);
        }
        #[cfg(feature = "stat")]
        self.stat_builder.stop_timer();
        self.result
    }

    pub fn result(&self) -> SimResult {
        self.result
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    #[cfg(feature = "stat")]
    pub fn collect_stat(&self) -> Stats {
        let mut ss = Stats::default();
        self.add_stats(&mut ss);
        ss
    }
}

#[cfg(feature = "stat")]
impl AddStats for Simulator {
    fn add_stats(&self, buf: &mut Stats) {
        buf.push(Box::new(self.stat_builder.finish(self.result)));
        self.cache.add_stats(buf);
    }
}

#[cfg(feature = "stat")]
mod stat {
    use std::{fmt, time};

    use crate::stat::*;

    use super::SimResult;

    pub struct SimStatBuilder {
        begin: time::Instant,
        elapsed: Option<time::Duration>,
    }

    impl SimStatBuilder {
        pub fn new() -> Self {
            Self {
                begin: time::Instant::now(),
                elapsed: None,
            }
        }
        pub fn stop_timer(&mut self) {
            self.elapsed = Some(time::Instant::now() - self.begin)
        }
        pub fn finish(&self, result: SimResult) -> SimStat {
            SimStat {
                result,
                elapsed: self.elapsed.unwrap_or_default(),
            }
        }
    }

    pub struct SimStat {
        result: SimResult,
        elapsed: time::Duration,
    }

    impl Stat for SimStat {
        fn view(&self, _: usize) -> Box<dyn StatView + '_> {
            Box::new(SimStatView { stat: self })
        }
    }

    pub struct SimStatView<'a> {
        stat: &'a SimStat,
    }

    impl StatView for SimStatView<'_> {
        fn header(&self) -> &'static str {
            "simulation"
        }
        fn width(&self) -> usize {
            36
        }
    }

    impl fmt::Display for SimStatView<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            writeln!(f, "  {:>13}:{:>12}", "accesses", self.stat.result.accesses)?;
            writeln!(
                f,
                "  {:>13}:{:>12}",
                "total cycles", self.stat.result.total_latency
            )?;
            write!(f, "  {:>13}: {:?}", "elapsed", self.stat.elapsed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::CacheConfig, trace::Trace};

    #[test]
    fn test_run_tallies_results() {
        let trace_str = "\
r 0x40
w 0x40
r 0x240
r 0x440
r 0x240
";
        let trace = Trace::parse(trace_str).unwrap();
        let cache = Cache::new(CacheConfig::default().to_geometry().unwrap());
        let mut sim = Simulator::new(cache);
        let result = sim.run(&trace);
        // miss, dirty-hit, miss, miss-with-write-back, hit
        assert_eq!(
            result,
            SimResult {
                accesses: 5,
                hits: 2,
                misses: 3,
                write_backs: 1,
                total_latency: 100 + 0 + 100 + 200 + 0,
            }
        );
    }

    #[test]
    fn test_empty_trace() {
        let trace = Trace::parse("").unwrap();
        let cache = Cache::new(CacheConfig::default().to_geometry().unwrap());
        let mut sim = Simulator::new(cache);
        assert_eq!(sim.run(&trace), SimResult::default());
    }
}
