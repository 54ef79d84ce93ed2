use std::fs;
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use super::alloc;
use super::memstats::{MemStats, SizeClassStats, PAUSE_HISTORY};
use super::RuntimeSource;

/// Fields of interest from `/proc/self/status`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcStatus {
    pub rss_bytes: Option<u64>,
    pub threads: Option<u64>,
}

impl ProcStatus {
    pub fn read() -> Option<Self> {
        fs::read_to_string("/proc/self/status")
            .ok()
            .map(|s| Self::parse(&s))
    }

    /// Parse `Key:\tvalue [kB]` lines. Unknown or malformed lines are skipped.
    pub fn parse(s: &str) -> Self {
        let mut out = Self::default();
        for line in s.lines() {
            let Some((key, rest)) = line.split_once(':') else { continue; };
            let mut parts = rest.split_whitespace();
            let Some(n) = parts.next().and_then(|v| v.parse::<u64>().ok()) else { continue; };
            match key {
                "VmRSS" => {
                    let scale = match parts.next() {
                        Some("kB") => 1024,
                        _ => 1,
                    };
                    out.rss_bytes = Some(n.saturating_mul(scale));
                }
                "Threads" => out.threads = Some(n),
                _ => {}
            }
        }
        out
    }
}

#[derive(Debug)]
struct PauseHistory {
    pause_ns: Vec<u64>,
    num_gc: u32,
    total_ns: u64,
    last_end_ns: u64,
}

impl PauseHistory {
    fn new() -> Self {
        Self {
            pause_ns: vec![0; PAUSE_HISTORY],
            num_gc: 0,
            total_ns: 0,
            last_end_ns: 0,
        }
    }

    fn record(&mut self, pause: Duration, end_ns: u64) {
        let ns = u64::try_from(pause.as_nanos()).unwrap_or(u64::MAX);
        let slot = self.num_gc as usize % PAUSE_HISTORY;
        self.pause_ns[slot] = ns;
        self.num_gc = self.num_gc.wrapping_add(1);
        self.total_ns = self.total_ns.saturating_add(ns);
        self.last_end_ns = end_ns;
    }
}

/// Runtime statistics of the current process.
///
/// Rust frees memory eagerly, so there is no collector to pause. A forced
/// collection records one cycle whose pause is the time spent sampling the
/// allocator; that keeps `PauseNs`/`NumGC` consumers working.
#[derive(Debug)]
pub struct ProcessRuntime {
    cmdline: Vec<String>,
    pauses: Mutex<PauseHistory>,
}

impl Default for ProcessRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRuntime {
    /// Capture the process arguments once at construction.
    pub fn new() -> Self {
        let cmdline = std::env::args_os()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        Self::with_cmdline(cmdline)
    }

    pub fn with_cmdline(cmdline: Vec<String>) -> Self {
        Self {
            cmdline,
            pauses: Mutex::new(PauseHistory::new()),
        }
    }
}

fn unix_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

impl RuntimeSource for ProcessRuntime {
    fn mem_stats(&self) -> MemStats {
        let counts = alloc::counts();
        let status = ProcStatus::read().unwrap_or_default();

        let sys = status.rss_bytes.unwrap_or(counts.in_use).max(counts.in_use);
        let mut stats = MemStats {
            alloc: counts.in_use,
            total_alloc: counts.total,
            sys,
            mallocs: counts.mallocs,
            frees: counts.frees,
            heap_alloc: counts.in_use,
            heap_sys: sys,
            heap_idle: sys.saturating_sub(counts.in_use),
            heap_inuse: counts.in_use,
            heap_objects: counts.mallocs.saturating_sub(counts.frees),
            num_threads: status.threads.unwrap_or(0),
            by_size: counts
                .classes
                .iter()
                .map(|c| SizeClassStats {
                    size: c.size,
                    mallocs: c.mallocs,
                    frees: c.frees,
                })
                .collect(),
            ..MemStats::default()
        };

        // Poisoned lock means a panic mid-record; report without pause data.
        if let Ok(p) = self.pauses.lock() {
            stats.pause_ns.clone_from(&p.pause_ns);
            stats.num_gc = p.num_gc;
            stats.pause_total_ns = p.total_ns;
            stats.last_gc = p.last_end_ns;
        }
        stats
    }

    fn cmdline(&self) -> Vec<String> {
        self.cmdline.clone()
    }

    fn force_collect(&self) {
        let start = Instant::now();
        let counts = alloc::counts();
        let pause = start.elapsed();

        if let Ok(mut p) = self.pauses.lock() {
            p.record(pause, unix_nanos());
            tracing::info!(
                num_gc = p.num_gc,
                pause_ns = p.pause_ns[(p.num_gc as usize + PAUSE_HISTORY - 1) % PAUSE_HISTORY],
                heap_alloc = counts.in_use,
                counting_alloc = alloc::installed(),
                "forced collection recorded"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;

    #[test]
    fn parse_proc_status() {
        let s = "Name:\tvarz\nVmRSS:\t    2048 kB\nThreads:\t7\nVmSwap:\tgarbage\n";
        let st = ProcStatus::parse(s);
        assert_eq!(st.rss_bytes, Some(2048 * 1024));
        assert_eq!(st.threads, Some(7));
    }

    #[test]
    fn parse_proc_status_missing_fields() {
        assert_eq!(ProcStatus::parse("Name:\tx\n"), ProcStatus::default());
    }

    #[test]
    fn pause_ring_wraps_and_keeps_latest_slot() {
        let mut h = PauseHistory::new();
        for i in 0..(PAUSE_HISTORY as u64 + 3) {
            h.record(Duration::from_nanos(i + 1), i);
        }
        let n = h.num_gc as usize;
        assert_eq!(n, PAUSE_HISTORY + 3);
        let latest = h.pause_ns[(n + PAUSE_HISTORY - 1) % PAUSE_HISTORY];
        assert_eq!(latest, PAUSE_HISTORY as u64 + 3);
        assert_eq!(h.pause_ns[0], PAUSE_HISTORY as u64 + 1);
    }

    #[test]
    fn force_collect_populates_pause_fields() {
        let rt = ProcessRuntime::with_cmdline(vec!["varz-server".into()]);
        assert_eq!(rt.mem_stats().num_gc, 0);

        rt.force_collect();
        rt.force_collect();

        let m = rt.mem_stats();
        assert_eq!(m.num_gc, 2);
        assert_eq!(m.pause_ns.len(), PAUSE_HISTORY);
        assert!(m.last_gc > 0);
        assert_eq!(rt.cmdline(), vec!["varz-server".to_string()]);
    }
}
