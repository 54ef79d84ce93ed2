//! Runtime statistics merged into every exposition document.
//!
//! The exposition endpoint treats runtime statistics as an opaque source:
//! anything implementing `RuntimeSource` can supply the `memstats` and
//! `cmdline` keys. `ProcessRuntime` is the default, backed by the counting
//! allocator and `/proc/self/status`.

pub mod alloc;
mod memstats;
mod process;

pub use alloc::CountingAlloc;
pub use memstats::{MemStats, SizeClassStats, PAUSE_HISTORY};
pub use process::{ProcessRuntime, ProcStatus};

/// Source of the `memstats` and `cmdline` document keys.
pub trait RuntimeSource: Send + Sync {
    fn mem_stats(&self) -> MemStats;

    /// Process invocation arguments, program name first.
    fn cmdline(&self) -> Vec<String> {
        std::env::args_os()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    /// Run (or mark) a collection cycle so pause-derived fields are populated.
    /// Only invoked when bootstrap is configured to do so.
    fn force_collect(&self) {}
}
