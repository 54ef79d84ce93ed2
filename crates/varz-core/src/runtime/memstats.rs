use serde::{Deserialize, Serialize};

/// Number of slots in the `PauseNs` circular buffer.
pub const PAUSE_HISTORY: usize = 256;

/// Memory and collection statistics, keyed the way scrapers expect
/// (`memstats/PauseNs`, `memstats/NumGC`, `memstats/BySize/1/Mallocs`).
///
/// `PauseNs[(NumGC + 255) % 256]` holds the most recent pause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MemStats {
    /// Bytes currently allocated.
    pub alloc: u64,
    /// Cumulative bytes allocated.
    pub total_alloc: u64,
    /// Bytes obtained from the OS (resident set when known).
    pub sys: u64,
    pub lookups: u64,
    pub mallocs: u64,
    pub frees: u64,
    pub heap_alloc: u64,
    pub heap_sys: u64,
    pub heap_idle: u64,
    pub heap_inuse: u64,
    pub heap_released: u64,
    /// Live allocations (`Mallocs - Frees`).
    pub heap_objects: u64,
    pub num_threads: u64,
    /// End of the last collection, nanoseconds since the Unix epoch.
    #[serde(rename = "LastGC")]
    pub last_gc: u64,
    pub pause_total_ns: u64,
    pub pause_ns: Vec<u64>,
    #[serde(rename = "NumGC")]
    pub num_gc: u32,
    pub by_size: Vec<SizeClassStats>,
}

impl Default for MemStats {
    fn default() -> Self {
        Self {
            alloc: 0,
            total_alloc: 0,
            sys: 0,
            lookups: 0,
            mallocs: 0,
            frees: 0,
            heap_alloc: 0,
            heap_sys: 0,
            heap_idle: 0,
            heap_inuse: 0,
            heap_released: 0,
            heap_objects: 0,
            num_threads: 0,
            last_gc: 0,
            pause_total_ns: 0,
            pause_ns: vec![0; PAUSE_HISTORY],
            num_gc: 0,
            by_size: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SizeClassStats {
    pub size: u32,
    pub mallocs: u64,
    pub frees: u64,
}
